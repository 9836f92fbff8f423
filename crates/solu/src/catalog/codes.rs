use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SoluError;

/// Subject code such as `ENG` or `MAT`: 2 to 4 ASCII uppercase letters
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Subject(String);

impl Subject {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn is_valid(code: &str) -> bool {
        (2..=4).contains(&code.len()) && code.bytes().all(|b| b.is_ascii_uppercase())
    }
}

impl FromStr for Subject {
    type Err = SoluError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        if Self::is_valid(code) {
            Ok(Self(code.to_string()))
        } else {
            Err(SoluError::InvalidSubject(code.to_string()))
        }
    }
}

impl TryFrom<String> for Subject {
    type Error = SoluError;

    fn try_from(code: String) -> Result<Self, Self::Error> {
        if Self::is_valid(&code) {
            Ok(Self(code))
        } else {
            Err(SoluError::InvalidSubject(code))
        }
    }
}

impl From<Subject> for String {
    fn from(subject: Subject) -> Self {
        subject.0
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Exam sitting code such as `MAT2020`: uppercase letters then exactly four digits.
///
/// Ordering is lexicographic; within one subject the letter prefix is shared,
/// so this is chronological.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearCode(String);

impl YearCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn is_valid(code: &str) -> bool {
        let bytes = code.as_bytes();
        if bytes.len() < 5 {
            return false;
        }
        let (letters, digits) = bytes.split_at(bytes.len() - 4);
        letters.iter().all(u8::is_ascii_uppercase) && digits.iter().all(u8::is_ascii_digit)
    }
}

impl FromStr for YearCode {
    type Err = SoluError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        if Self::is_valid(code) {
            Ok(Self(code.to_string()))
        } else {
            Err(SoluError::InvalidYear(code.to_string()))
        }
    }
}

impl TryFrom<String> for YearCode {
    type Error = SoluError;

    fn try_from(code: String) -> Result<Self, Self::Error> {
        if Self::is_valid(&code) {
            Ok(Self(code))
        } else {
            Err(SoluError::InvalidYear(code))
        }
    }
}

impl From<YearCode> for String {
    fn from(year: YearCode) -> Self {
        year.0
    }
}

impl fmt::Display for YearCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_validation() {
        for ok in ["EN", "ENG", "MATH"] {
            assert_eq!(ok.parse::<Subject>().unwrap().as_str(), ok);
        }
        for bad in ["E", "ENGLI", "eng", "EN1", "", "ÉNG"] {
            assert!(bad.parse::<Subject>().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_year_validation() {
        for ok in ["MAT2020", "A1999", "UTME2024"] {
            assert_eq!(ok.parse::<YearCode>().unwrap().as_str(), ok);
        }
        for bad in [
            "2020", "MAT20", "MAT20201", "mat2020", "MAT202O", "MA1T2020",
        ] {
            assert!(bad.parse::<YearCode>().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_year_ordering_is_chronological_within_subject() {
        let mut years: Vec<YearCode> = ["MAT2019", "MAT2021", "MAT2020"]
            .iter()
            .map(|y| y.parse().unwrap())
            .collect();
        years.sort_by(|a, b| b.cmp(a));
        let codes: Vec<&str> = years.iter().map(YearCode::as_str).collect();
        assert_eq!(codes, ["MAT2021", "MAT2020", "MAT2019"]);
    }

    #[test]
    fn test_serde_rejects_invalid_codes() {
        let subject: Subject = serde_json::from_str("\"PHY\"").unwrap();
        assert_eq!(subject.as_str(), "PHY");
        assert!(serde_json::from_str::<Subject>("\"physics\"").is_err());
        assert!(serde_json::from_str::<YearCode>("\"PHY19\"").is_err());
    }
}
