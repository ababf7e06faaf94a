use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tokio::fs;
use tokio::sync::RwLock;

use crate::error::{RatebookError, Result};
use crate::listing::{Listing, ListingFormat, RawRecord};
use crate::record::Record;

/// Where an upserted record lands in the listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingPolicy {
    /// Always first, whether inserted or replaced.
    #[default]
    Front,
    /// Replacements keep the old position; new records are appended.
    Preserve,
    /// The whole listing is kept sorted by key, case-insensitively.
    Sorted,
}

/// How record keys are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyMatch {
    #[default]
    CaseInsensitive,
    Exact,
}

impl KeyMatch {
    /// Compares two keys under this policy.
    pub fn matches(&self, left: &str, right: &str) -> bool {
        match self {
            KeyMatch::Exact => left == right,
            KeyMatch::CaseInsensitive => left
                .chars()
                .flat_map(char::to_lowercase)
                .eq(right.chars().flat_map(char::to_lowercase)),
        }
    }
}

/// Whether an existing record for the same key may be replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overwrite {
    Confirm,
    Decline,
}

/// Result of [`Registry::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    /// `removed` counts the records that matched the key, normally one.
    Replaced { removed: usize },
    /// A record with the key exists and overwrite was declined; nothing changed.
    Declined,
}

/// How a registry reads, writes, and matches its listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingOptions {
    pub format: ListingFormat,
    pub marker: String,
    /// Constructor assigned to records of a TOML listing.
    pub constructor: String,
    pub ordering: OrderingPolicy,
    pub key_match: KeyMatch,
}

impl ListingOptions {
    /// Default options for listings of `R` records.
    pub fn for_record<R: Record>() -> Self {
        Self {
            format: ListingFormat::Source,
            marker: "CONFIG".to_owned(),
            constructor: R::CONSTRUCTOR.to_owned(),
            ordering: OrderingPolicy::Front,
            key_match: KeyMatch::CaseInsensitive,
        }
    }
}

/// In-memory record listing guarded by an asynchronous `RwLock`.
#[derive(Debug)]
pub struct Registry {
    listing: RwLock<Listing>,
    options: ListingOptions,
}

/// Shared reference-counted handle to a [`Registry`] instance.
pub type SharedRegistry = Arc<Registry>;

impl Registry {
    /// Creates a registry holding an empty listing.
    pub fn new(options: ListingOptions) -> SharedRegistry {
        let listing = Listing::new(options.marker.clone());
        Arc::new(Self {
            listing: RwLock::new(listing),
            options,
        })
    }

    /// Builds a registry from listing text.
    pub fn from_string(source: &str, options: ListingOptions) -> Result<SharedRegistry> {
        let listing = Self::parse_listing(source, &options)?;
        Ok(Arc::new(Self {
            listing: RwLock::new(listing),
            options,
        }))
    }

    /// Synchronously reads a listing file from disk and constructs the shared registry.
    pub fn from_file(path: impl AsRef<Path>, options: ListingOptions) -> Result<SharedRegistry> {
        let path_buf = path.as_ref().to_path_buf();
        let contents = std::fs::read_to_string(&path_buf)
            .map_err(|err| RatebookError::io_error(Some(path_buf.clone()), err))?;
        Self::from_string(&contents, options)
    }

    /// Asynchronously reads a listing file from disk and constructs the shared registry.
    pub async fn from_file_async(
        path: impl AsRef<Path> + Send + Sync,
        options: ListingOptions,
    ) -> Result<SharedRegistry> {
        let path_buf = path.as_ref().to_path_buf();
        let contents = fs::read_to_string(&path_buf)
            .await
            .map_err(|err| RatebookError::io_error(Some(path_buf.clone()), err))?;
        Self::from_string(&contents, options)
    }

    /// Options the registry was created with.
    pub fn options(&self) -> &ListingOptions {
        &self.options
    }

    /// Replaces the in-memory listing with the contents of `source`.
    pub async fn load_str(&self, source: &str) -> Result<()> {
        let listing = Self::parse_listing(source, &self.options)?;
        let mut guard = self.listing.write().await;
        *guard = listing;
        Ok(())
    }

    /// Replaces the in-memory listing with the contents of the file at `path`.
    pub async fn load_file(&self, path: impl AsRef<Path> + Send + Sync) -> Result<()> {
        let path_buf = path.as_ref().to_path_buf();
        let contents = fs::read_to_string(&path_buf)
            .await
            .map_err(|err| RatebookError::io_error(Some(path_buf.clone()), err))?;
        self.load_str(&contents).await
    }

    /// Renders the current listing.
    pub async fn save_str(&self) -> Result<String> {
        let guard = self.listing.read().await;
        guard.render(self.options.format)
    }

    /// Renders the current listing and writes it atomically to the specified file.
    pub async fn save_file(&self, path: impl AsRef<Path> + Send + Sync) -> Result<()> {
        let path_buf = path.as_ref().to_path_buf();
        let rendered = self.save_str().await?;
        write_atomic(&path_buf, rendered.as_bytes()).await?;
        tracing::info!(path = %path_buf.display(), bytes = rendered.len(), "listing saved");
        Ok(())
    }

    /// Returns a snapshot of the listing.
    pub async fn listing(&self) -> Listing {
        self.listing.read().await.clone()
    }

    /// Number of records in the listing, of any constructor.
    pub async fn len(&self) -> usize {
        self.listing.read().await.len()
    }

    /// `true` when the listing holds no records.
    pub async fn is_empty(&self) -> bool {
        self.listing.read().await.is_empty()
    }

    /// Returns `true` when an `R` record with `key` exists.
    pub async fn contains<R: Record>(&self, key: &str) -> bool {
        let guard = self.listing.read().await;
        guard
            .records
            .iter()
            .any(|raw| self.matches::<R>(raw, key))
    }

    /// Lists the keys of all `R` records in listing order.
    pub async fn keys<R: Record>(&self) -> Vec<String> {
        let guard = self.listing.read().await;
        guard
            .records
            .iter()
            .filter(|raw| raw.constructor() == R::CONSTRUCTOR)
            .filter_map(|raw| raw.string_field(R::KEY_FIELD).map(str::to_owned))
            .collect()
    }

    /// Reads the first `R` record with `key`.
    pub async fn get<R: Record>(&self, key: &str) -> Result<Option<R>> {
        let guard = self.listing.read().await;
        guard
            .records
            .iter()
            .find(|raw| self.matches::<R>(raw, key))
            .map(R::from_raw)
            .transpose()
    }

    /// Reads every `R` record in listing order.
    pub async fn get_all<R: Record>(&self) -> Result<Vec<R>> {
        let guard = self.listing.read().await;
        guard
            .records
            .iter()
            .filter(|raw| raw.constructor() == R::CONSTRUCTOR)
            .map(R::from_raw)
            .collect()
    }

    /// Inserts `record`, or replaces every record with the same key when `overwrite` allows it.
    ///
    /// The new record is positioned according to the registry's [`OrderingPolicy`]; all other
    /// records keep their relative order and text. A record holding a NaN or infinite number is
    /// rejected with [`RatebookError::InvalidValue`] and the listing is left as it was.
    pub async fn upsert<R: Record>(&self, record: &R, overwrite: Overwrite) -> Result<Upsert> {
        let key = record.key();
        let raw = record.to_raw();
        if let Some(field) = raw.unwritable_field() {
            return Err(RatebookError::invalid_value(
                field,
                format!("record `{key}` holds a non-finite number"),
            ));
        }

        let mut guard = self.listing.write().await;

        let matches: Vec<usize> = guard
            .records
            .iter()
            .enumerate()
            .filter(|(_, raw)| self.matches::<R>(raw, key))
            .map(|(index, _)| index)
            .collect();

        if !matches.is_empty() && overwrite == Overwrite::Decline {
            tracing::warn!(key, "record exists and overwrite was declined");
            return Ok(Upsert::Declined);
        }

        for index in matches.iter().rev() {
            guard.records.remove(*index);
        }

        match self.options.ordering {
            OrderingPolicy::Front => guard.records.insert(0, raw),
            OrderingPolicy::Preserve => match matches.first() {
                Some(index) => guard.records.insert(*index, raw),
                None => guard.records.push(raw),
            },
            OrderingPolicy::Sorted => {
                guard.records.push(raw);
                guard.records.sort_by_cached_key(|raw| {
                    raw.string_field(R::KEY_FIELD).map(str::to_lowercase)
                });
            }
        }

        if matches.is_empty() {
            tracing::debug!(key, "record inserted");
            Ok(Upsert::Inserted)
        } else {
            tracing::debug!(key, removed = matches.len(), "record replaced");
            Ok(Upsert::Replaced {
                removed: matches.len(),
            })
        }
    }

    /// Removes every `R` record with `key`, returning how many were removed.
    pub async fn remove<R: Record>(&self, key: &str) -> usize {
        let mut guard = self.listing.write().await;
        let before = guard.records.len();
        guard.records.retain(|raw| !self.matches::<R>(raw, key));
        before - guard.records.len()
    }

    fn matches<R: Record>(&self, raw: &RawRecord, key: &str) -> bool {
        raw.constructor() == R::CONSTRUCTOR
            && raw
                .string_field(R::KEY_FIELD)
                .is_some_and(|candidate| self.options.key_match.matches(candidate, key))
    }

    fn parse_listing(source: &str, options: &ListingOptions) -> Result<Listing> {
        Listing::parse(source, options.format, &options.marker, &options.constructor)
    }
}

/// Atomically persists `contents` to `path`, ensuring the file is fully replaced on success.
async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let tmp_path = temporary_path(path);
    fs::write(&tmp_path, contents)
        .await
        .map_err(|err| RatebookError::io_error(Some(tmp_path.clone()), err))?;

    match fs::rename(&tmp_path, path).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::AlreadyExists => {
            fs::remove_file(path)
                .await
                .map_err(|remove_err| RatebookError::io_error(Some(path.to_path_buf()), remove_err))?;
            fs::rename(&tmp_path, path)
                .await
                .map_err(|err| RatebookError::io_error(Some(path.to_path_buf()), err))
        }
        Err(err) => {
            let _ = fs::remove_file(&tmp_path).await;
            Err(RatebookError::io_error(Some(path.to_path_buf()), err))
        }
    }
}

/// Computes a temporary sibling path used during atomic write operations.
fn temporary_path(path: &Path) -> PathBuf {
    let mut file_name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| "ratebook".into());
    file_name.push(".tmp");

    path.with_file_name(file_name)
}
