// Domain types - Pure, immutable, no side effects
use chrono::NaiveTime;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::db::RepositoryError;

pub const CODE_NOT_FOUND: &str = "Code not found. Please try again.";
pub const COUNTERPART_MISSING: &str = "counterpart profile missing";

/// A six digit pairing code rendered as two groups: `"123 456"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairingCode(String);

impl PairingCode {
    /// Two independent uniform 3-digit groups, i.e. one draw from 10^6 codes.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let first: u16 = rng.gen_range(0..1000);
        let second: u16 = rng.gen_range(0..1000);
        Self(format!("{:03} {:03}", first, second))
    }

    /// Accepts exactly `DDD DDD`.
    pub fn parse(text: &str) -> Option<Self> {
        let bytes = text.as_bytes();
        if bytes.len() != 7 || bytes[3] != b' ' {
            return None;
        }
        let digits_ok = bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 3 || b.is_ascii_digit());
        digits_ok.then(|| Self(text.to_string()))
    }

    /// Assemble a code from six single-character inputs.
    pub fn from_digits(digits: [&str; 6]) -> Option<Self> {
        let [d1, d2, d3, d4, d5, d6] = digits.map(str::trim);
        Self::parse(&format!("{}{}{} {}{}{}", d1, d2, d3, d4, d5, d6))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PairingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A persisted code and the user who issued it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCode {
    pub code: PairingCode,
    pub user_id: i64,
    pub time: NaiveTime,
}

impl IssuedCode {
    pub fn time_string(&self) -> String {
        self.time.format("%H:%M:%S").to_string()
    }
}

/// Result of a successful verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkOutcome {
    pub caregiver_id: i64,
    pub recipient_id: i64,
    /// False when the pair was already linked.
    pub newly_linked: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum PairingError {
    #[error("{}", CODE_NOT_FOUND)]
    CodeNotFound,

    #[error("User role not recognized.")]
    RoleNotRecognized,

    #[error("{}", COUNTERPART_MISSING)]
    CounterpartMissing,

    #[error("Could not allocate a unique pairing code")]
    CodeSpaceExhausted,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_have_two_digit_groups() {
        for _ in 0..200 {
            let code = PairingCode::generate();
            let s = code.as_str();
            assert_eq!(s.len(), 7);
            assert_eq!(&s[3..4], " ");
            assert!(s[..3].chars().all(|c| c.is_ascii_digit()));
            assert!(s[4..].chars().all(|c| c.is_ascii_digit()));
            assert_eq!(PairingCode::parse(s), Some(code));
        }
    }

    #[test]
    fn parse_rejects_malformed_codes() {
        assert!(PairingCode::parse("123 456").is_some());
        assert!(PairingCode::parse("000 007").is_some());
        assert!(PairingCode::parse("123456").is_none());
        assert!(PairingCode::parse("123-456").is_none());
        assert!(PairingCode::parse("12a 456").is_none());
        assert!(PairingCode::parse(" 123 456").is_none());
        assert!(PairingCode::parse("").is_none());
    }

    #[test]
    fn from_digits_inserts_separator() {
        let code = PairingCode::from_digits(["1", "2", "3", "4", "5", "6"]).unwrap();
        assert_eq!(code.as_str(), "123 456");
        assert!(PairingCode::from_digits(["1", "2", "", "4", "5", "6"]).is_none());
        assert!(PairingCode::from_digits(["1", "2", "33", "4", "5", "6"]).is_none());
    }

    #[test]
    fn issued_code_formats_time() {
        let issued = IssuedCode {
            code: PairingCode::parse("123 456").unwrap(),
            user_id: 1,
            time: NaiveTime::from_hms_opt(9, 5, 7).unwrap(),
        };
        assert_eq!(issued.time_string(), "09:05:07");
    }

    #[test]
    fn error_messages_match_responses() {
        assert_eq!(
            PairingError::CodeNotFound.to_string(),
            "Code not found. Please try again."
        );
        assert_eq!(
            PairingError::RoleNotRecognized.to_string(),
            "User role not recognized."
        );
    }
}
