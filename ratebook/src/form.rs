//! Operator-facing form that collects the fields of a [`ConfigEntry`].

use crate::entry::{ConfigEntry, DerivedPaths, Number, RateType, parse_call_types};
use crate::error::{RatebookError, Result};

/// Raw form input. Call-type lists are kept as comma-separated text until submission.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryForm {
    pub client: String,
    pub folder_prefix: String,
    pub carrier: String,
    pub rate: Number,
    pub rate_type: RateType,
    pub s2c: String,
    pub s2c_rate: Number,
    pub s2c_rate_type: RateType,
    pub chargeable_call_types: String,
    pub number1: String,
    pub number1_rate: Number,
    pub number1_rate_type: RateType,
    pub number1_chargeable_call_types: String,
    pub number2: String,
    pub number2_rate: Number,
    pub number2_rate_type: RateType,
    pub number2_chargeable_call_types: String,
}

impl Default for EntryForm {
    fn default() -> Self {
        Self {
            client: String::new(),
            folder_prefix: String::new(),
            carrier: "Atlasat".to_owned(),
            rate: Number::Integer(720),
            rate_type: RateType::PerMinute,
            s2c: String::new(),
            s2c_rate: Number::Integer(0),
            s2c_rate_type: RateType::PerMinute,
            chargeable_call_types: "outbound call, predictive dialer".to_owned(),
            number1: String::new(),
            number1_rate: Number::Integer(0),
            number1_rate_type: RateType::PerMinute,
            number1_chargeable_call_types: String::new(),
            number2: String::new(),
            number2_rate: Number::Integer(0),
            number2_rate_type: RateType::PerMinute,
            number2_chargeable_call_types: String::new(),
        }
    }
}

impl EntryForm {
    /// Paths shown to the operator; available once both client and folder prefix are filled in.
    pub fn derived_paths(&self) -> Option<DerivedPaths> {
        let client = self.client.trim();
        let folder_prefix = self.folder_prefix.trim();
        if client.is_empty() || folder_prefix.is_empty() {
            None
        } else {
            Some(DerivedPaths::new(folder_prefix, client))
        }
    }

    /// Checks that the required fields are filled in.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.client.trim().is_empty() {
            missing.push("client");
        }
        if self.folder_prefix.trim().is_empty() {
            missing.push("folder_prefix");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(RatebookError::Validation { missing })
        }
    }

    /// Validates the form and assembles the record to upsert.
    pub fn to_entry(&self) -> Result<ConfigEntry> {
        self.validate()?;
        let paths = self
            .derived_paths()
            .ok_or_else(|| RatebookError::Validation {
                missing: vec!["client", "folder_prefix"],
            })?;

        Ok(ConfigEntry {
            client: self.client.trim().to_owned(),
            dashboard: paths.dashboard,
            console: paths.console,
            output: paths.output,
            carrier: self.carrier.clone(),
            number1: optional(&self.number1),
            number1_rate: self.number1_rate,
            number1_rate_type: self.number1_rate_type,
            number1_chargeable_call_types: parse_call_types(&self.number1_chargeable_call_types),
            number2: optional(&self.number2),
            number2_rate: self.number2_rate,
            number2_rate_type: self.number2_rate_type,
            number2_chargeable_call_types: parse_call_types(&self.number2_chargeable_call_types),
            rate: self.rate,
            rate_type: self.rate_type,
            s2c: self.s2c.clone(),
            s2c_rate: self.s2c_rate,
            s2c_rate_type: self.s2c_rate_type,
            chargeable_call_types: parse_call_types(&self.chargeable_call_types),
        })
    }

    /// Clears every field back to its default.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Empty input means "not set".
fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}
