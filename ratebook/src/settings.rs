//! Tool settings read from `ratebook.toml`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::entry::ConfigEntry;
use crate::error::{RatebookError, Result};
use crate::listing::ListingFormat;
use crate::store::{KeyMatch, ListingOptions, OrderingPolicy};

/// Default settings file name, looked up in the working directory.
pub const DEFAULT_SETTINGS_FILE: &str = "ratebook.toml";

/// Where the listing lives and how it is edited.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Path of the backing listing file.
    pub listing: PathBuf,
    pub format: ListingFormat,
    /// Name assigned to the listing, e.g. `CONFIG` in `CONFIG = [`.
    pub marker: String,
    pub ordering: OrderingPolicy,
    pub key_match: KeyMatch,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listing: PathBuf::from("config.py"),
            format: ListingFormat::Source,
            marker: "CONFIG".to_owned(),
            ordering: OrderingPolicy::Front,
            key_match: KeyMatch::CaseInsensitive,
        }
    }
}

impl Settings {
    /// Parses settings from TOML text; absent keys keep their defaults.
    pub fn from_toml(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(RatebookError::from)
    }

    /// Reads settings from `path`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path_buf = path.as_ref().to_path_buf();
        let contents = std::fs::read_to_string(&path_buf)
            .map_err(|err| RatebookError::io_error(Some(path_buf.clone()), err))?;
        Self::from_toml(&contents)
    }

    /// Reads settings from `path`, falling back to defaults when the file does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        match Self::from_file(path.as_ref()) {
            Err(RatebookError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.as_ref().display(), "settings file not found, using defaults");
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Listing options for [`ConfigEntry`] records.
    pub fn listing_options(&self) -> ListingOptions {
        ListingOptions {
            format: self.format,
            marker: self.marker.clone(),
            ordering: self.ordering,
            key_match: self.key_match,
            ..ListingOptions::for_record::<ConfigEntry>()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn empty_document_yields_defaults() -> Result<()> {
        assert_eq!(Settings::from_toml("")?, Settings::default());
        Ok(())
    }

    #[test]
    fn keys_override_defaults() -> Result<()> {
        let settings = Settings::from_toml(
            "listing = \"clients.toml\"\nformat = \"toml\"\nordering = \"sorted\"\nkey_match = \"exact\"\n",
        )?;
        assert_eq!(settings.listing, PathBuf::from("clients.toml"));
        assert_eq!(settings.format, ListingFormat::Toml);
        assert_eq!(settings.ordering, OrderingPolicy::Sorted);
        assert_eq!(settings.key_match, KeyMatch::Exact);
        assert_eq!(settings.marker, "CONFIG");

        let options = settings.listing_options();
        assert_eq!(options.constructor, "Files");
        assert_eq!(options.format, ListingFormat::Toml);
        Ok(())
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Settings::from_toml("colour = \"blue\"\n").unwrap_err();
        assert!(matches!(err, RatebookError::Toml(_)));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() -> Result<()> {
        let dir = tempfile::tempdir().expect("temp dir");
        let settings = Settings::load_or_default(dir.path().join("absent.toml"))?;
        assert_eq!(settings, Settings::default());
        Ok(())
    }

    #[test]
    fn file_is_read_when_present() -> Result<()> {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, "marker = \"CLIENTS\"").expect("write settings");
        let settings = Settings::load_or_default(file.path())?;
        assert_eq!(settings.marker, "CLIENTS");
        Ok(())
    }
}
