//! Literal values stored in listing records and their conversion into Rust types.

use std::fmt::{self, Write as _};

use crate::error::RatebookError;

/// A value that can appear on the right-hand side of `name=value` inside a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// The null sentinel, written `None`.
    None,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<Literal>),
}

impl Literal {
    /// `false` when the value holds a NaN or infinite float, which has no source spelling.
    pub fn is_finite(&self) -> bool {
        match self {
            Literal::Float(v) => v.is_finite(),
            Literal::List(items) => items.iter().all(Literal::is_finite),
            _ => true,
        }
    }
}

/// Human-readable description of a [`Literal`] type.
pub fn describe(value: &Literal) -> &'static str {
    match value {
        Literal::None => "None",
        Literal::Bool(_) => "boolean",
        Literal::Integer(_) => "integer",
        Literal::Float(_) => "float",
        Literal::String(_) => "string",
        Literal::List(_) => "list",
    }
}

impl fmt::Display for Literal {
    /// Writes the literal in listing source syntax, escaping strings so they parse back unchanged.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::None => f.write_str("None"),
            Literal::Bool(true) => f.write_str("True"),
            Literal::Bool(false) => f.write_str("False"),
            Literal::Integer(v) => write!(f, "{v}"),
            Literal::Float(v) => write!(f, "{v:?}"),
            Literal::String(s) => write_quoted(f, s),
            Literal::List(items) => {
                f.write_char('[')?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_char(']')
            }
        }
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    f.write_char('"')?;
    for ch in value.chars() {
        match ch {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if (c as u32) < 0x20 || c == '\u{7f}' => write!(f, "\\x{:02x}", c as u32)?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}

/// Conversion failure detected before the record and field context is known.
#[derive(Debug, Clone, PartialEq)]
pub enum Mismatch {
    Type {
        expected: &'static str,
        found: &'static str,
    },
    Value(String),
}

impl Mismatch {
    fn type_of(expected: &'static str, found: &Literal) -> Self {
        Self::Type {
            expected,
            found: describe(found),
        }
    }

    /// Attaches the record constructor and field name, producing a [`RatebookError`].
    pub fn into_error(self, record: &str, field: &str) -> RatebookError {
        match self {
            Mismatch::Type { expected, found } => {
                RatebookError::type_mismatch(record, field, expected, found)
            }
            Mismatch::Value(message) => RatebookError::value_parse(record, field, message),
        }
    }
}

/// Types that can be stored in a record field.
///
/// `Option<T>` maps `None` onto the null sentinel and `Vec<T>` onto a list literal, so
/// implementing the trait for a scalar is enough to use it in any container shape.
pub trait FieldValue: Sized {
    fn to_literal(&self) -> Literal;
    fn from_literal(literal: &Literal) -> Result<Self, Mismatch>;
}

impl FieldValue for String {
    fn to_literal(&self) -> Literal {
        Literal::String(self.clone())
    }

    fn from_literal(literal: &Literal) -> Result<Self, Mismatch> {
        match literal {
            Literal::String(s) => Ok(s.clone()),
            other => Err(Mismatch::type_of("string", other)),
        }
    }
}

impl FieldValue for bool {
    fn to_literal(&self) -> Literal {
        Literal::Bool(*self)
    }

    fn from_literal(literal: &Literal) -> Result<Self, Mismatch> {
        match literal {
            Literal::Bool(v) => Ok(*v),
            other => Err(Mismatch::type_of("boolean", other)),
        }
    }
}

impl FieldValue for i64 {
    fn to_literal(&self) -> Literal {
        Literal::Integer(*self)
    }

    fn from_literal(literal: &Literal) -> Result<Self, Mismatch> {
        match literal {
            Literal::Integer(v) => Ok(*v),
            other => Err(Mismatch::type_of("integer", other)),
        }
    }
}

macro_rules! narrow_integer {
    ($($ty:ty),*) => {
        $(
            impl FieldValue for $ty {
                fn to_literal(&self) -> Literal {
                    Literal::Integer(i64::from(*self))
                }

                fn from_literal(literal: &Literal) -> Result<Self, Mismatch> {
                    let raw = i64::from_literal(literal)?;
                    <$ty>::try_from(raw).map_err(|_| {
                        Mismatch::Value(format!("value {raw} out of range for {}", stringify!($ty)))
                    })
                }
            }
        )*
    };
}

narrow_integer!(i8, i16, i32, u8, u16, u32);

impl FieldValue for f64 {
    fn to_literal(&self) -> Literal {
        Literal::Float(*self)
    }

    /// Accepts integers as well as floats.
    fn from_literal(literal: &Literal) -> Result<Self, Mismatch> {
        match literal {
            Literal::Float(v) => Ok(*v),
            Literal::Integer(v) => Ok(*v as f64),
            other => Err(Mismatch::type_of("float", other)),
        }
    }
}

impl FieldValue for f32 {
    fn to_literal(&self) -> Literal {
        Literal::Float(f64::from(*self))
    }

    fn from_literal(literal: &Literal) -> Result<Self, Mismatch> {
        let wide = f64::from_literal(literal)?;
        let narrow = wide as f32;
        if wide.is_finite() && !narrow.is_finite() {
            return Err(Mismatch::Value(format!("value {wide} out of range for f32")));
        }
        Ok(narrow)
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    fn to_literal(&self) -> Literal {
        match self {
            Some(value) => value.to_literal(),
            None => Literal::None,
        }
    }

    fn from_literal(literal: &Literal) -> Result<Self, Mismatch> {
        match literal {
            Literal::None => Ok(None),
            other => T::from_literal(other).map(Some),
        }
    }
}

impl<T: FieldValue> FieldValue for Vec<T> {
    fn to_literal(&self) -> Literal {
        Literal::List(self.iter().map(FieldValue::to_literal).collect())
    }

    fn from_literal(literal: &Literal) -> Result<Self, Mismatch> {
        match literal {
            Literal::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    out.push(T::from_literal(item).map_err(|err| annotate_with_index(err, index))?);
                }
                Ok(out)
            }
            other => Err(Mismatch::type_of("list", other)),
        }
    }
}

/// Adds the list index to an element conversion failure.
fn annotate_with_index(err: Mismatch, index: usize) -> Mismatch {
    match err {
        Mismatch::Type { expected, found } => Mismatch::Value(format!(
            "expected list elements of type {expected}, found {found} at index {index}"
        )),
        Mismatch::Value(message) => Mismatch::Value(format!("{message} (at index {index})")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strings_are_escaped() {
        let value = Literal::String("say \"hi\" (now), C:\\tmp\n".into());
        assert_eq!(value.to_string(), r#""say \"hi\" (now), C:\\tmp\n""#);
    }

    #[test]
    fn floats_keep_a_decimal_point() {
        assert_eq!(Literal::Float(1.0).to_string(), "1.0");
        assert_eq!(Literal::Float(0.25).to_string(), "0.25");
    }

    #[test]
    fn lists_render_inline() {
        let value = vec!["outbound call".to_string(), "predictive dialer".to_string()].to_literal();
        assert_eq!(value.to_string(), r#"["outbound call", "predictive dialer"]"#);
        assert_eq!(Vec::<String>::new().to_literal().to_string(), "[]");
    }

    #[test]
    fn option_maps_to_null_sentinel() {
        assert_eq!(None::<String>.to_literal(), Literal::None);
        assert_eq!(
            Option::<String>::from_literal(&Literal::String("1".into())),
            Ok(Some("1".into()))
        );
    }

    #[test]
    fn list_element_mismatch_reports_index() {
        let literal = Literal::List(vec![Literal::String("a".into()), Literal::Integer(3)]);
        let err = Vec::<String>::from_literal(&literal).unwrap_err();
        assert_eq!(
            err,
            Mismatch::Value("expected list elements of type string, found integer at index 1".into())
        );
    }

    #[test]
    fn non_finite_floats_are_detected() {
        assert!(Literal::Float(0.5).is_finite());
        assert!(!Literal::Float(f64::NAN).is_finite());
        assert!(!Literal::List(vec![Literal::Integer(1), Literal::Float(f64::INFINITY)]).is_finite());
    }

    #[test]
    fn narrow_integers_check_range() {
        assert!(u32::from_literal(&Literal::Integer(-1)).is_err());
        assert_eq!(i32::from_literal(&Literal::Integer(42)), Ok(42));
        assert!(u8::from_literal(&Literal::Integer(256)).is_err());
        assert_eq!(u32::MAX.to_literal(), Literal::Integer(i64::from(u32::MAX)));
    }

    #[test]
    fn f32_rejects_out_of_range_values() {
        assert_eq!(f32::from_literal(&Literal::Integer(2)), Ok(2.0));
        assert!(f32::from_literal(&Literal::Float(1e300)).is_err());
    }
}
