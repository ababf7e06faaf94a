//! The client billing record and its value types.

use std::fmt;
use std::str::FromStr;

use crate::error::RatebookError;
use crate::literal::{FieldValue, Literal, Mismatch};

/// Billing configuration for one client, stored as a `Files(...)` record.
#[derive(Debug, Clone, PartialEq, crate::Record)]
#[record(constructor = "Files")]
pub struct ConfigEntry {
    #[record(key)]
    pub client: String,
    pub dashboard: String,
    pub console: String,
    pub output: String,
    #[record(default = "Atlasat")]
    pub carrier: String,
    pub number1: Option<String>,
    #[record(default = 0)]
    pub number1_rate: Number,
    #[record(default = "per_minute")]
    pub number1_rate_type: RateType,
    #[record(default = [])]
    pub number1_chargeable_call_types: Vec<String>,
    pub number2: Option<String>,
    #[record(default = 0)]
    pub number2_rate: Number,
    #[record(default = "per_minute")]
    pub number2_rate_type: RateType,
    #[record(default = [])]
    pub number2_chargeable_call_types: Vec<String>,
    #[record(default = 720)]
    pub rate: Number,
    #[record(default = "per_minute")]
    pub rate_type: RateType,
    #[record(default = "")]
    pub s2c: String,
    #[record(default = 0)]
    pub s2c_rate: Number,
    #[record(default = "per_minute")]
    pub s2c_rate_type: RateType,
    #[record(default = ["outbound call", "predictive dialer"])]
    pub chargeable_call_types: Vec<String>,
}

impl ConfigEntry {
    /// Returns the dashboard, console, and output paths stored in the entry.
    pub fn paths(&self) -> DerivedPaths {
        DerivedPaths {
            dashboard: self.dashboard.clone(),
            console: self.console.clone(),
            output: self.output.clone(),
        }
    }
}

/// The three CSV locations derived from a folder prefix and a client name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedPaths {
    /// `{folder_prefix}/DB/{client}.csv`
    pub dashboard: String,
    /// `{folder_prefix}/Console/{client}.csv`
    pub console: String,
    /// `{folder_prefix}/Merge/{client}.csv`
    pub output: String,
}

impl DerivedPaths {
    /// Builds `{folder_prefix}/{DB|Console|Merge}/{client}.csv`.
    pub fn new(folder_prefix: &str, client: &str) -> Self {
        Self {
            dashboard: format!("{folder_prefix}/DB/{client}.csv"),
            console: format!("{folder_prefix}/Console/{client}.csv"),
            output: format!("{folder_prefix}/Merge/{client}.csv"),
        }
    }
}

impl fmt::Display for DerivedPaths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Dashboard: {}", self.dashboard)?;
        writeln!(f, "Console:   {}", self.console)?;
        write!(f, "Output:    {}", self.output)
    }
}

/// Splits comma-separated input into trimmed, non-empty items.
pub fn parse_call_types(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}

/// A rate: either an integer or a finite decimal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Integer(i64),
    Decimal(f64),
}

impl Number {
    /// Wraps a decimal, rejecting NaN and infinities.
    pub fn decimal(value: f64) -> Result<Self, RatebookError> {
        if value.is_finite() {
            Ok(Number::Decimal(value))
        } else {
            Err(RatebookError::invalid_value(
                "number",
                format!("{value} is not a finite number"),
            ))
        }
    }

    /// `false` for a NaN or infinite decimal.
    pub fn is_finite(&self) -> bool {
        match self {
            Number::Integer(_) => true,
            Number::Decimal(v) => v.is_finite(),
        }
    }
}

impl Default for Number {
    fn default() -> Self {
        Number::Integer(0)
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::Integer(value)
    }
}

impl FromStr for Number {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(value) = trimmed.parse::<i64>() {
            return Ok(Number::Integer(value));
        }
        match trimmed.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(Number::Decimal(value)),
            _ => Err(format!("`{s}` is not a finite number")),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Integer(v) => write!(f, "{v}"),
            Number::Decimal(v) => write!(f, "{v:?}"),
        }
    }
}

impl FieldValue for Number {
    fn to_literal(&self) -> Literal {
        match self {
            Number::Integer(v) => Literal::Integer(*v),
            Number::Decimal(v) => Literal::Float(*v),
        }
    }

    fn from_literal(literal: &Literal) -> Result<Self, Mismatch> {
        match literal {
            Literal::Integer(v) => Ok(Number::Integer(*v)),
            Literal::Float(v) if v.is_finite() => Ok(Number::Decimal(*v)),
            Literal::Float(v) => Err(Mismatch::Value(format!("{v} is not a finite number"))),
            other => Err(Mismatch::Type {
                expected: "number",
                found: crate::literal::describe(other),
            }),
        }
    }
}

/// Billing granularity of a rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RateType {
    #[default]
    PerMinute,
    PerSecond,
}

impl RateType {
    /// Spelling used in listings and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            RateType::PerMinute => "per_minute",
            RateType::PerSecond => "per_second",
        }
    }
}

impl FromStr for RateType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "per_minute" => Ok(RateType::PerMinute),
            "per_second" => Ok(RateType::PerSecond),
            other => Err(format!(
                "`{other}` is not a rate type (expected per_minute or per_second)"
            )),
        }
    }
}

impl fmt::Display for RateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FieldValue for RateType {
    fn to_literal(&self) -> Literal {
        Literal::String(self.as_str().to_owned())
    }

    fn from_literal(literal: &Literal) -> Result<Self, Mismatch> {
        let raw = String::from_literal(literal)?;
        raw.parse().map_err(Mismatch::Value)
    }
}
