//! Identifiers for pathway entities.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use ulid::Ulid;

/// Errors produced while parsing identifiers.
#[derive(Debug, thiserror::Error)]
pub enum IdError {
    /// User IDs must contain at least one non-whitespace character
    #[error("user id must not be empty")]
    EmptyUserId,

    /// Pathway ID is not a valid ULID
    #[error("invalid pathway id: {0}")]
    InvalidPathwayId(#[from] ulid::DecodeError),
}

/// Unique identifier for a Pathway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PathwayId(Ulid);

impl PathwayId {
    /// Generate a new PathwayId
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for PathwayId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PathwayId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for PathwayId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Identifier of a learner, as issued by the identity provider.
///
/// The value is opaque; the only rule is that it is not blank.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Create a user id, rejecting blank values.
    pub fn new(id: impl Into<String>) -> Result<Self, IdError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(IdError::EmptyUserId);
        }
        Ok(Self(id))
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Filesystem-safe form of the id: lowercase hex SHA-256 of its bytes,
    /// always 64 characters whatever the id's length.
    pub fn storage_key(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        let mut out = String::with_capacity(64);
        for b in digest {
            let _ = write!(&mut out, "{:02x}", b);
        }
        out
    }
}

impl TryFrom<String> for UserId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pathway_id_roundtrips_through_display() {
        let id = PathwayId::new();
        let parsed: PathwayId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_pathway_id_rejects_garbage() {
        assert!(matches!(
            "not-a-ulid".parse::<PathwayId>(),
            Err(IdError::InvalidPathwayId(_))
        ));
    }

    #[test]
    fn test_user_id_rejects_blank() {
        assert!(matches!(UserId::new(""), Err(IdError::EmptyUserId)));
        assert!(matches!(UserId::new("   "), Err(IdError::EmptyUserId)));
        assert_eq!(UserId::new("user_2abc").unwrap().as_str(), "user_2abc");
    }

    #[test]
    fn test_user_id_storage_key_is_fixed_length_hex() {
        let id = UserId::new("abc").unwrap();
        assert_eq!(
            id.storage_key(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );

        let long = UserId::new("x".repeat(300)).unwrap();
        let key = long.storage_key();
        assert_eq!(key.len(), 64);
        assert!(key.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()));
        assert_ne!(key, UserId::new("x".repeat(301)).unwrap().storage_key());
        assert_ne!(
            UserId::new("a/b").unwrap().storage_key(),
            UserId::new("a_b").unwrap().storage_key()
        );
    }

    #[test]
    fn test_user_id_deserialize_validates() {
        let ok: UserId = serde_json::from_str("\"u1\"").unwrap();
        assert_eq!(ok.as_str(), "u1");
        assert!(serde_json::from_str::<UserId>("\"\"").is_err());
    }
}
