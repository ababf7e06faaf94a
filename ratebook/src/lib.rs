//! Upsert engine for client billing records kept in a configuration listing.
//!
//! The listing is parsed into records, edited by key, and rendered back deterministically,
//! so a record never needs to be located by text matching.
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate self as ratebook;

pub mod engine;
pub mod entry;
pub mod error;
pub mod form;
pub mod listing;
pub mod literal;
pub mod record;
pub mod settings;
mod store;
mod syntax;
mod toml_format;

pub use crate::engine::{UpsertEngine, UpsertReport};
pub use crate::entry::{ConfigEntry, DerivedPaths, Number, RateType, parse_call_types};
pub use crate::error::{RatebookError, Result};
pub use crate::form::EntryForm;
pub use crate::listing::{Listing, ListingFormat, RawRecord};
pub use crate::settings::Settings;
pub use crate::store::{
    KeyMatch, ListingOptions, OrderingPolicy, Overwrite, Registry, SharedRegistry, Upsert,
};

pub use ratebook_derive::Record;
