//! Addressing persisted and not-yet-persisted occurrences.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

const VIRTUAL_MARKER: &str = "-virtual-";

/// Handle to an occurrence as the presentation layer sees it.
///
/// A virtual reference names a template projected onto a date; it has no row
/// of its own until a mutation forks it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OccurrenceRef {
    Concrete { id: String },
    Virtual { template_id: String, date: NaiveDate },
}

impl OccurrenceRef {
    pub fn concrete(id: impl Into<String>) -> Self {
        Self::Concrete { id: id.into() }
    }

    pub fn virtual_on(template_id: impl Into<String>, date: NaiveDate) -> Self {
        Self::Virtual {
            template_id: template_id.into(),
            date,
        }
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self, Self::Virtual { .. })
    }
}

/// Token form: the plain id, or `<templateId>-virtual-<YYYY-MM-DD>`.
impl fmt::Display for OccurrenceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Concrete { id } => f.write_str(id),
            Self::Virtual { template_id, date } => {
                write!(f, "{template_id}{VIRTUAL_MARKER}{}", date.format("%Y-%m-%d"))
            }
        }
    }
}

impl FromStr for OccurrenceRef {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "occurrence".to_string(),
                message: "reference is empty".to_string(),
            });
        }

        match s.rsplit_once(VIRTUAL_MARKER) {
            Some((template_id, date)) if !template_id.is_empty() => {
                let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|e| {
                    ValidationError::InvalidValue {
                        field: "occurrence".to_string(),
                        message: format!("bad date in virtual reference '{s}': {e}"),
                    }
                })?;
                Ok(Self::virtual_on(template_id, date))
            }
            _ => Ok(Self::concrete(s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_virtual_token() {
        let r: OccurrenceRef = "3f2a-virtual-2024-01-08".parse().unwrap();
        assert_eq!(
            r,
            OccurrenceRef::virtual_on("3f2a", NaiveDate::from_ymd_opt(2024, 1, 8).unwrap())
        );
        assert_eq!(r.to_string(), "3f2a-virtual-2024-01-08");
    }

    #[test]
    fn uuid_ids_stay_concrete() {
        let id = "0b6c1e5e-8f0a-4c1b-9d5e-2f1a7c3b9e10";
        let r: OccurrenceRef = id.parse().unwrap();
        assert_eq!(r, OccurrenceRef::concrete(id));
    }

    #[test]
    fn virtual_token_with_uuid_template() {
        let token = "0b6c1e5e-8f0a-4c1b-9d5e-2f1a7c3b9e10-virtual-2024-02-29";
        let r: OccurrenceRef = token.parse().unwrap();
        assert!(r.is_virtual());
        assert_eq!(r.to_string(), token);
    }

    #[test]
    fn rejects_bad_virtual_date_and_empty() {
        assert!("abc-virtual-2024-13-01".parse::<OccurrenceRef>().is_err());
        assert!("  ".parse::<OccurrenceRef>().is_err());
    }
}
