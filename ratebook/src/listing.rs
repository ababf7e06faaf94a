//! Structured model of a record listing and its deterministic rendering.

use serde::Deserialize;

use crate::error::Result;
use crate::literal::Literal;
use crate::{syntax, toml_format};

/// One `Constructor(name=value, ...)` entry of a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    constructor: String,
    fields: Vec<(String, Literal)>,
    layout: Option<Layout>,
}

/// Source text of a parsed record and of the text around it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Layout {
    /// Whitespace and comments between the previous record (or the opening line) and this one.
    pub(crate) leading: String,
    /// The record itself, from constructor to closing parenthesis.
    pub(crate) source: String,
    /// Everything after the closing parenthesis up to the end of its line, comma included.
    pub(crate) separator: String,
    pub(crate) comma: bool,
}

impl RawRecord {
    /// Creates an empty record for `constructor`.
    pub fn new(constructor: impl Into<String>) -> Self {
        Self {
            constructor: constructor.into(),
            fields: Vec::new(),
            layout: None,
        }
    }

    /// Builds a record read from a file, remembering its exact text.
    pub(crate) fn parsed(
        constructor: String,
        fields: Vec<(String, Literal)>,
        layout: Option<Layout>,
    ) -> Self {
        Self {
            constructor,
            fields,
            layout,
        }
    }

    /// Appends a field, or replaces the value when the name already exists.
    ///
    /// The record is rendered in canonical layout from then on.
    pub fn push(&mut self, name: impl Into<String>, value: Literal) {
        let name = name.into();
        self.layout = None;
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Identifier before the record's parenthesis, e.g. `Files`.
    pub fn constructor(&self) -> &str {
        &self.constructor
    }

    /// Returns the literal stored under `name`, if present.
    pub fn get(&self, name: &str) -> Option<&Literal> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    /// Returns the string stored under `field`, if it is present and a string.
    pub fn string_field(&self, field: &str) -> Option<&str> {
        match self.get(field)? {
            Literal::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Iterates over fields in their stored order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Literal)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Name of the first field whose value cannot be written as a literal.
    pub(crate) fn unwritable_field(&self) -> Option<&str> {
        self.fields
            .iter()
            .find(|(_, value)| !value.is_finite())
            .map(|(name, _)| name.as_str())
    }

    /// Comment lines that preceded this record in the source file.
    pub fn comments(&self) -> impl Iterator<Item = &str> {
        self.layout
            .iter()
            .flat_map(|layout| layout.leading.lines())
            .map(str::trim)
            .filter(|line| line.starts_with('#'))
    }

    /// Comment written on the same line, after the record's closing parenthesis.
    pub fn trailing_comment(&self) -> Option<&str> {
        let separator = &self.layout.as_ref()?.separator;
        separator
            .find('#')
            .map(|start| separator[start..].trim_end())
    }

    /// Renders the record; `followed` is set when another record comes after it.
    fn render_into(&self, out: &mut String, followed: bool) {
        match &self.layout {
            Some(layout) => {
                out.push_str(&layout.leading);
                out.push_str(&layout.source);
                if !layout.comma && followed {
                    out.push(',');
                }
                out.push_str(&layout.separator);
            }
            None => {
                if !out.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str(INDENT);
                out.push_str(&self.constructor);
                out.push_str("(\n");
                for (name, value) in &self.fields {
                    out.push_str(INDENT);
                    out.push_str(INDENT);
                    out.push_str(name);
                    out.push('=');
                    out.push_str(&value.to_string());
                    out.push_str(",\n");
                }
                out.push_str(INDENT);
                out.push_str("),\n");
            }
        }
    }
}

const INDENT: &str = "    ";

/// On-disk representation of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingFormat {
    /// `MARKER = [ Ctor(...), ... ]` embedded in a source file.
    #[default]
    Source,
    /// `[[MARKER]]` array of tables.
    Toml,
}

/// An ordered sequence of records plus the text surrounding it.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub(crate) preamble: String,
    pub(crate) marker: String,
    /// The marker line, from the marker through the end of the line holding `[`.
    pub(crate) opening: String,
    pub(crate) records: Vec<RawRecord>,
    /// Whitespace and comments after the last record, before `]`.
    pub(crate) closing: String,
    pub(crate) epilogue: String,
}

impl Listing {
    /// Creates an empty listing anchored at `marker`.
    pub fn new(marker: impl Into<String>) -> Self {
        let marker = marker.into();
        Self {
            preamble: String::new(),
            opening: format!("{marker} = [\n"),
            marker,
            records: Vec::new(),
            closing: String::new(),
            epilogue: "\n".to_owned(),
        }
    }

    /// Parses `source` in the given format.
    ///
    /// `constructor` names the records of a TOML listing, which carries no constructor of its own.
    pub fn parse(
        source: &str,
        format: ListingFormat,
        marker: &str,
        constructor: &str,
    ) -> Result<Self> {
        match format {
            ListingFormat::Source => syntax::parse_listing(source, marker),
            ListingFormat::Toml => toml_format::decode(source, marker, constructor),
        }
    }

    /// Renders the listing in the given format.
    pub fn render(&self, format: ListingFormat) -> Result<String> {
        match format {
            ListingFormat::Source => Ok(self.render_source()),
            ListingFormat::Toml => toml_format::encode(self),
        }
    }

    /// Renders source syntax; untouched records are written back with their original text.
    pub fn render_source(&self) -> String {
        let mut out = String::with_capacity(self.preamble.len() + self.epilogue.len() + 64);
        out.push_str(&self.preamble);
        out.push_str(&self.opening);
        let count = self.records.len();
        for (index, record) in self.records.iter().enumerate() {
            record.render_into(&mut out, index + 1 < count);
        }
        out.push_str(&self.closing);
        out.push(']');
        out.push_str(&self.epilogue);
        out
    }

    /// Name the listing is assigned to.
    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Records in listing order.
    pub fn records(&self) -> &[RawRecord] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// `true` when the listing holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> RawRecord {
        let mut raw = RawRecord::new("Files");
        raw.push("client", Literal::String("acme".into()));
        raw.push("number1", Literal::None);
        raw.push("rate", Literal::Integer(720));
        raw
    }

    #[test]
    fn new_records_render_one_field_per_line() {
        let mut listing = Listing::new("CONFIG");
        listing.records.push(sample_record());
        assert_eq!(
            listing.render_source(),
            "CONFIG = [\n    Files(\n        client=\"acme\",\n        number1=None,\n        rate=720,\n    ),\n]\n"
        );
    }

    #[test]
    fn push_replaces_existing_field() {
        let mut raw = sample_record();
        raw.push("rate", Literal::Float(1.5));
        assert_eq!(raw.get("rate"), Some(&Literal::Float(1.5)));
        assert_eq!(raw.fields().count(), 3);
    }

    #[test]
    fn new_record_after_same_line_neighbour_starts_a_line() -> Result<()> {
        let mut listing = Listing::parse("CONFIG = [F(a=1)]\n", ListingFormat::Source, "CONFIG", "F")?;
        listing.records.push(sample_record());
        let text = listing.render_source();
        assert!(text.starts_with("CONFIG = [F(a=1),\n    Files(\n"));
        assert!(text.ends_with("    ),\n]\n"));
        Ok(())
    }

    #[test]
    fn rendered_listing_parses_back_identically() -> Result<()> {
        let mut listing = Listing::new("CONFIG");
        listing.preamble = "from models import Files\n\n".into();
        listing.records.push(sample_record());
        let text = listing.render_source();

        let parsed = Listing::parse(&text, ListingFormat::Source, "CONFIG", "Files")?;
        assert_eq!(parsed.records()[0].fields().count(), 3);
        assert_eq!(parsed.render_source(), text);
        Ok(())
    }
}
