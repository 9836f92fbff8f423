use serde::{Deserialize, Serialize};

use crate::catalog::{Subject, YearCode};
use crate::error::{Result, SoluError};

/// Page request parameters: `subject=MAT&year=MAT2020&test=1`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageQuery {
    pub subject: Option<Subject>,
    pub year: Option<YearCode>,
    /// Request a single-URL diagnostic probe alongside the audit
    pub test: bool,
}

impl PageQuery {
    pub fn new(subject: Option<Subject>, year: Option<YearCode>, test: bool) -> Self {
        Self {
            subject,
            year,
            test,
        }
    }

    /// Parse a URL query string, with or without the leading `?`.
    ///
    /// Empty values count as absent. Unknown parameters are ignored; malformed
    /// subject or year codes are rejected.
    pub fn from_query_str(query: &str) -> Result<Self> {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut parsed = Self::default();

        for (name, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if value.is_empty() {
                continue;
            }
            match name.as_ref() {
                "subject" => {
                    let subject = value
                        .parse()
                        .map_err(|_| SoluError::InvalidQuery(format!("subject={value}")))?;
                    parsed.subject = Some(subject);
                }
                "year" => {
                    let year = value
                        .parse()
                        .map_err(|_| SoluError::InvalidQuery(format!("year={value}")))?;
                    parsed.year = Some(year);
                }
                "test" => parsed.test = !matches!(value.as_ref(), "0" | "false"),
                _ => {}
            }
        }

        Ok(parsed)
    }

    /// Both halves of a selection, when present
    pub fn selection(&self) -> Option<(&Subject, &YearCode)> {
        self.subject.as_ref().zip(self.year.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_query() {
        let query = PageQuery::from_query_str("?subject=MAT&year=MAT2020&test=1").unwrap();
        assert_eq!(query.subject.as_ref().map(Subject::as_str), Some("MAT"));
        assert_eq!(query.year.as_ref().map(YearCode::as_str), Some("MAT2020"));
        assert!(query.test);
        assert!(query.selection().is_some());
    }

    #[test]
    fn test_empty_and_partial_queries() {
        assert_eq!(PageQuery::from_query_str("").unwrap(), PageQuery::default());

        let query = PageQuery::from_query_str("subject=ENG&year=&utm=x").unwrap();
        assert!(query.subject.is_some());
        assert!(query.year.is_none());
        assert!(query.selection().is_none());
    }

    #[test]
    fn test_flag_values() {
        for (raw, expected) in [
            ("test=1", true),
            ("test=yes", true),
            ("test=0", false),
            ("test=false", false),
            ("test=", false),
        ] {
            let query = PageQuery::from_query_str(raw).unwrap();
            assert_eq!(query.test, expected, "{raw}");
        }
    }

    #[test]
    fn test_invalid_codes_rejected() {
        let err = PageQuery::from_query_str("subject=mat").unwrap_err();
        assert!(matches!(err, SoluError::InvalidQuery(ref q) if q == "subject=mat"));

        let err = PageQuery::from_query_str("subject=MAT&year=2020").unwrap_err();
        assert!(matches!(err, SoluError::InvalidQuery(_)));

        assert!(PageQuery::from_query_str("subject=..%2F..%2Fetc").is_err());
    }
}
