//! `[[MARKER]]` array-of-tables representation of a listing.

use toml::{Table, Value};

use crate::error::{RatebookError, Result};
use crate::listing::{Listing, RawRecord};
use crate::literal::Literal;

/// Decodes a TOML document whose `marker` key holds the records.
///
/// Other top-level keys are carried in the listing preamble and written back by [`encode`].
pub(crate) fn decode(source: &str, marker: &str, constructor: &str) -> Result<Listing> {
    let mut table: Table = toml::from_str(source)?;
    let entries = table
        .remove(marker)
        .ok_or_else(|| RatebookError::MissingMarker {
            marker: marker.to_owned(),
        })?;

    let entries = match entries {
        Value::Array(entries) => entries,
        other => {
            return Err(RatebookError::type_mismatch(
                marker,
                "<listing>",
                "array of tables",
                describe(&other),
            ))
        }
    };

    let mut records = Vec::with_capacity(entries.len());
    for entry in entries {
        let fields = match entry {
            Value::Table(fields) => fields,
            other => {
                return Err(RatebookError::type_mismatch(
                    marker,
                    "<record>",
                    "table",
                    describe(&other),
                ))
            }
        };
        let mut literals = Vec::with_capacity(fields.len());
        for (name, value) in fields {
            let literal = to_literal(constructor, &name, value)?;
            literals.push((name, literal));
        }
        records.push(RawRecord::parsed(constructor.to_owned(), literals, None));
    }

    let preamble = if table.is_empty() {
        String::new()
    } else {
        toml::to_string(&table)?
    };

    tracing::debug!(records = records.len(), marker, "decoded TOML listing");

    Ok(Listing {
        preamble,
        records,
        epilogue: String::new(),
        ..Listing::new(marker)
    })
}

/// Encodes the listing as TOML; `None` fields are omitted.
pub(crate) fn encode(listing: &Listing) -> Result<String> {
    let mut table: Table = if listing.preamble.trim().is_empty() {
        Table::new()
    } else {
        toml::from_str(&listing.preamble)?
    };

    let entries = listing
        .records
        .iter()
        .map(|record| {
            let fields = record
                .fields()
                .filter_map(|(name, value)| from_literal(value).map(|value| (name.to_owned(), value)))
                .collect::<Table>();
            Value::Table(fields)
        })
        .collect();

    table.insert(listing.marker.clone(), Value::Array(entries));
    toml::to_string(&table).map_err(RatebookError::from)
}

fn to_literal(record: &str, field: &str, value: Value) -> Result<Literal> {
    Ok(match value {
        Value::String(s) => Literal::String(s),
        Value::Integer(v) => Literal::Integer(v),
        Value::Float(v) => Literal::Float(v),
        Value::Boolean(v) => Literal::Bool(v),
        Value::Datetime(dt) => Literal::String(dt.to_string()),
        Value::Array(items) => Literal::List(
            items
                .into_iter()
                .map(|item| to_literal(record, field, item))
                .collect::<Result<_>>()?,
        ),
        Value::Table(_) => {
            return Err(RatebookError::type_mismatch(record, field, "scalar or array", "table"))
        }
    })
}

fn from_literal(value: &Literal) -> Option<Value> {
    match value {
        Literal::None => None,
        Literal::Bool(v) => Some(Value::Boolean(*v)),
        Literal::Integer(v) => Some(Value::Integer(*v)),
        Literal::Float(v) => Some(Value::Float(*v)),
        Literal::String(s) => Some(Value::String(s.clone())),
        Literal::List(items) => Some(Value::Array(items.iter().filter_map(from_literal).collect())),
    }
}

/// Human-readable description of a TOML [`Value`] type.
fn describe(value: &Value) -> &'static str {
    match value {
        Value::String(_) => "string",
        Value::Integer(_) => "integer",
        Value::Float(_) => "float",
        Value::Boolean(_) => "boolean",
        Value::Datetime(_) => "datetime",
        Value::Array(_) => "array",
        Value::Table(_) => "table",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_reads_array_of_tables() -> Result<()> {
        let listing = decode(
            "title = \"billing\"\n\n[[CONFIG]]\nclient = \"acme\"\nrate = 720\ntypes = [\"a\", \"b\"]\n",
            "CONFIG",
            "Files",
        )?;
        assert_eq!(listing.len(), 1);
        let record = &listing.records()[0];
        assert_eq!(record.constructor(), "Files");
        assert_eq!(record.string_field("client"), Some("acme"));
        assert_eq!(record.get("rate"), Some(&Literal::Integer(720)));
        assert!(listing.preamble.contains("title = \"billing\""));
        Ok(())
    }

    #[test]
    fn encode_omits_null_fields_and_keeps_other_keys() -> Result<()> {
        let mut listing = decode("title = \"billing\"\nCONFIG = []\n", "CONFIG", "Files")?;
        let mut raw = RawRecord::new("Files");
        raw.push("client", Literal::String("acme".into()));
        raw.push("number1", Literal::None);
        listing.records.push(raw);

        let text = encode(&listing)?;
        assert!(text.contains("title = \"billing\""));
        assert!(text.contains("client = \"acme\""));
        assert!(!text.contains("number1"));

        let reparsed = decode(&text, "CONFIG", "Files")?;
        assert_eq!(reparsed.records()[0].string_field("client"), Some("acme"));
        Ok(())
    }

    #[test]
    fn missing_marker_key_is_an_error() {
        let err = decode("title = \"x\"\n", "CONFIG", "Files").unwrap_err();
        assert!(matches!(err, RatebookError::MissingMarker { .. }));
    }
}
