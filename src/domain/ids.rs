//! Domain identifier types with validation
//!
//! Newtype wrappers for the two identifiers Tally works with: the record
//! identifier used for ledger membership and the identity whose records are
//! exported.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Record identifier newtype wrapper
///
/// Identity for deduplication is the string representation of the record's
/// identifier column only. Surrounding whitespace is trimmed so that a ledger
/// cell `" R0001 "` and a database value `"R0001"` compare equal.
///
/// # Examples
///
/// ```
/// use tally::domain::ids::RecordId;
/// use std::str::FromStr;
///
/// let id = RecordId::from_str(" R0001 ").unwrap();
/// assert_eq!(id.as_str(), "R0001");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(String);

impl RecordId {
    /// Creates a new RecordId, rejecting empty or blank values
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err("Record ID cannot be empty".to_string());
        }
        if trimmed.len() == id.len() {
            Ok(Self(id))
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    /// Returns the record ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for RecordId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identity newtype wrapper
///
/// The identity selects whose records are exported and prefixes every
/// artifact name. It is a configuration value checked against an allow-list,
/// never read interactively.
///
/// # Examples
///
/// ```
/// use tally::domain::ids::Identity;
///
/// let allowed = vec!["ALICE".to_string(), "BOB".to_string()];
/// let identity = Identity::new("BOB", &allowed).unwrap();
/// assert_eq!(identity.as_str(), "BOB");
///
/// assert!(Identity::new("NOBODY", &allowed).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity(String);

impl Identity {
    /// Creates an Identity if it is a member of `allowed`
    pub fn new(identity: impl Into<String>, allowed: &[String]) -> Result<Self, String> {
        let identity = identity.into();
        if identity.trim().is_empty() {
            return Err("Identity cannot be empty".to_string());
        }
        if !allowed.iter().any(|candidate| candidate == &identity) {
            return Err(format!(
                "Identity '{}' is not allowed. Must be one of: {}",
                identity,
                allowed.join(", ")
            ));
        }
        Self::unchecked(identity)
    }

    /// Creates an Identity without consulting an allow-list
    ///
    /// Still rejects values that cannot appear in a file name.
    pub fn unchecked(identity: impl Into<String>) -> Result<Self, String> {
        let identity = identity.into();
        if identity.trim().is_empty() {
            return Err("Identity cannot be empty".to_string());
        }
        if identity
            .chars()
            .any(|c| matches!(c, '/' | '\\' | ':' | '\0'))
        {
            return Err(format!(
                "Identity '{identity}' contains characters not allowed in file names"
            ));
        }
        Ok(Self(identity))
    }

    /// Returns the identity as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_valid() {
        let id = RecordId::new("R0042").unwrap();
        assert_eq!(id.as_str(), "R0042");
        assert_eq!(id.to_string(), "R0042");
    }

    #[test]
    fn test_record_id_trims_whitespace() {
        let id = RecordId::new("  123\t").unwrap();
        assert_eq!(id, RecordId::new("123").unwrap());
    }

    #[test]
    fn test_record_id_empty() {
        assert!(RecordId::new("").is_err());
        assert!(RecordId::new("   ").is_err());
    }

    #[test]
    fn test_record_id_ordering_is_string_ordering() {
        let mut ids = vec![
            RecordId::new("R0010").unwrap(),
            RecordId::new("R0002").unwrap(),
        ];
        ids.sort();
        assert_eq!(ids[0].as_str(), "R0002");
    }

    #[test]
    fn test_identity_allow_list() {
        let allowed = vec!["CAROL".to_string(), "BOB".to_string()];
        assert!(Identity::new("CAROL", &allowed).is_ok());
        assert!(Identity::new("carol", &allowed).is_err());
        assert!(Identity::new("", &allowed).is_err());
    }

    #[test]
    fn test_identity_rejects_path_characters() {
        assert!(Identity::unchecked("ALICE/../x").is_err());
        assert!(Identity::unchecked("ALICE").is_ok());
    }
}
