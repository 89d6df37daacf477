use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ResolutionError;

const MIN_FIELD_LEN: usize = 2;
const MAX_FIELD_LEN: usize = 100;

/// A human-supplied location, e.g. `("America", "New York")`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationQuery {
    pub country: String,
    pub city: String,
}

impl LocationQuery {
    pub fn new(country: impl Into<String>, city: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            city: city.into(),
        }
    }

    /// Field checks applied at the request boundary.
    ///
    /// The country is required. The city may be left blank to ask for the
    /// zones of a whole area, but when given it has the same length bounds.
    pub fn validate(&self) -> Result<(), ResolutionError> {
        if self.country.trim().is_empty() {
            return Err(ResolutionError::InvalidInput("country is required".into()));
        }
        check_length("country", &self.country)?;
        if !self.city.trim().is_empty() {
            check_length("city", &self.city)?;
        }
        Ok(())
    }

    /// Catalog key: `Country/City` with surrounding whitespace trimmed and
    /// inner spaces turned into underscores. A blank city leaves a trailing `/`.
    pub fn key(&self) -> String {
        format!(
            "{}/{}",
            self.country.trim().replace(' ', "_"),
            self.city.trim().replace(' ', "_")
        )
    }
}

fn check_length(field: &str, value: &str) -> Result<(), ResolutionError> {
    let len = value.trim().chars().count();
    if (MIN_FIELD_LEN..=MAX_FIELD_LEN).contains(&len) {
        Ok(())
    } else {
        Err(ResolutionError::InvalidInput(format!(
            "{field} must be between {MIN_FIELD_LEN} and {MAX_FIELD_LEN} characters"
        )))
    }
}

/// An `Area/Location` key into the upstream catalog, e.g. `America/Bogota`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneIdentifier(String);

impl ZoneIdentifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ZoneIdentifier {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ZoneIdentifier {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ZoneIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
