//! File-level upsert of [`ConfigEntry`] records.
//!
//! Every call reads the backing file, edits the parsed listing, and writes it back atomically.
//! Nothing is cached between calls, so the file stays the only source of truth.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::entry::{ConfigEntry, DerivedPaths};
use crate::error::{RatebookError, Result};
use crate::settings::Settings;
use crate::store::{ListingOptions, Overwrite, Registry, SharedRegistry, Upsert};

/// Outcome of [`UpsertEngine::upsert`] together with the entry's paths for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertReport {
    pub outcome: Upsert,
    pub paths: DerivedPaths,
}

impl UpsertReport {
    /// `true` when the backing file was rewritten.
    pub fn written(&self) -> bool {
        self.outcome != Upsert::Declined
    }
}

/// Upserts [`ConfigEntry`] records into one listing file.
#[derive(Debug, Clone)]
pub struct UpsertEngine {
    path: PathBuf,
    options: ListingOptions,
}

impl UpsertEngine {
    /// Creates an engine editing the listing at `path`.
    pub fn new(path: impl Into<PathBuf>, options: ListingOptions) -> Self {
        Self {
            path: path.into(),
            options,
        }
    }

    /// Creates an engine for the listing file and options named in `settings`.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.listing.clone(), settings.listing_options())
    }

    /// Path of the backing listing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` when a record for `client` exists.
    pub async fn exists(&self, client: &str) -> Result<bool> {
        let registry = self.open().await?;
        Ok(registry.contains::<ConfigEntry>(client).await)
    }

    /// Lists client keys in listing order.
    pub async fn clients(&self) -> Result<Vec<String>> {
        let registry = self.open().await?;
        Ok(registry.keys::<ConfigEntry>().await)
    }

    /// Reads the record for `client`, if there is one.
    pub async fn get(&self, client: &str) -> Result<Option<ConfigEntry>> {
        let registry = self.open().await?;
        registry.get::<ConfigEntry>(client).await
    }

    /// Writes `entry` into the listing, replacing any record with the same client.
    ///
    /// When the client exists and `overwrite` is [`Overwrite::Decline`] the file is left untouched
    /// and the report carries [`Upsert::Declined`]. An entry holding a non-finite rate is rejected
    /// with [`RatebookError::InvalidValue`] before anything is written.
    pub async fn upsert(&self, entry: &ConfigEntry, overwrite: Overwrite) -> Result<UpsertReport> {
        if entry.client.trim().is_empty() {
            return Err(RatebookError::Validation {
                missing: vec!["client"],
            });
        }

        let registry = self.open().await?;
        let outcome = registry.upsert(entry, overwrite).await?;
        if outcome != Upsert::Declined {
            registry.save_file(&self.path).await?;
            tracing::info!(client = %entry.client, ?outcome, path = %self.path.display(), "client upserted");
        }

        Ok(UpsertReport {
            outcome,
            paths: entry.paths(),
        })
    }

    /// Removes the records for `client`, returning whether anything was removed.
    pub async fn remove(&self, client: &str) -> Result<bool> {
        let registry = self.open().await?;
        let removed = registry.remove::<ConfigEntry>(client).await;
        if removed > 0 {
            registry.save_file(&self.path).await?;
            tracing::info!(client, removed, path = %self.path.display(), "client removed");
        }
        Ok(removed > 0)
    }

    /// Loads the backing file; a file that does not exist yet is an empty listing.
    async fn open(&self) -> Result<SharedRegistry> {
        match Registry::from_file_async(&self.path, self.options.clone()).await {
            Err(RatebookError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "listing file not found, starting empty");
                Ok(Registry::new(self.options.clone()))
            }
            other => other,
        }
    }
}
