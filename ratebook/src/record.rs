use crate::error::Result;
use crate::listing::RawRecord;

/// Trait implemented by structs annotated with `#[derive(Record)]`.
pub trait Record: Sized {
    /// Identifier written before the record's opening parenthesis.
    const CONSTRUCTOR: &'static str;
    /// Name of the string field that identifies the record within a listing.
    const KEY_FIELD: &'static str;

    /// Returns the value of the key field.
    fn key(&self) -> &str;
    /// Converts the struct into a raw record, fields in declaration order.
    fn to_raw(&self) -> RawRecord;
    /// Rebuilds the struct from a raw record, applying defaults for absent fields.
    fn from_raw(raw: &RawRecord) -> Result<Self>;
}
