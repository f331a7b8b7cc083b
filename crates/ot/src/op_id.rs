//! Identifiers for users and operations.
//!
//! This module provides types for uniquely identifying peers and operations
//! in a distributed collaborative editing session.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a user/peer in the collaborative session.
///
/// User IDs are used for:
/// - Keying vector clock entries
/// - Identifying the source of operations
/// - Breaking ties when ordering concurrent operations
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    /// Create a new UserId from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the raw string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "User({})", self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Unique identifier for an operation.
///
/// Operations created locally get a fresh UUID; operations decoded from the
/// transport carry whatever id the sender assigned.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OperationId(pub String);

impl OperationId {
    /// Create a new unique operation ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Create an operation ID from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Op({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_creation() {
        let id = UserId::new("alice");
        assert_eq!(id.as_str(), "alice");
    }

    #[test]
    fn test_user_id_from_str() {
        let id: UserId = "bob".into();
        assert_eq!(id, UserId::new("bob"));
    }

    #[test]
    fn test_operation_id_unique() {
        let id1 = OperationId::new();
        let id2 = OperationId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_operation_id_from_string() {
        let id = OperationId::from_string("remote-op-7");
        assert_eq!(id.0, "remote-op-7");
    }

    #[test]
    fn test_user_id_ordering() {
        let a = UserId::new("alice");
        let b = UserId::new("bob");
        assert!(a < b);
    }
}
