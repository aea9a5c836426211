//! Error types for chronorel operations.
//!
//! Every fallible operation returns [`ChronoRelResult`]. Errors carry a stable
//! [`ErrorCode`] for programmatic handling; none are retried internally —
//! callers own retry decisions.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::types::EntityId;

/// Result type alias for chronorel operations.
pub type ChronoRelResult<T> = Result<T, ChronoRelError>;

/// Main error type for all chronorel operations.
#[derive(Error, Debug)]
pub enum ChronoRelError {
    /// An open edge already exists for this (owner, field, member) tuple.
    #[error("duplicate open edge for owner {owner_id} field '{field_name}' member {member_id}")]
    DuplicateEdge {
        owner_id: EntityId,
        field_name: String,
        member_id: EntityId,
    },

    /// No open edge exists for this (owner, field, member) tuple.
    #[error("no open edge for owner {owner_id} field '{field_name}' member {member_id}")]
    NoOpenEdge {
        owner_id: EntityId,
        field_name: String,
        member_id: EntityId,
    },

    /// Range query with an empty or inverted interval.
    #[error("invalid time range: {from} .. {to} (end must be after start)")]
    InvalidRange {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },

    /// A member reference carries an entity kind incompatible with the association.
    #[error("type mismatch: expected '{expected}' member, got '{actual}'")]
    TypeMismatch { expected: String, actual: String },

    /// A member reference is bound to a different backing store.
    #[error("cross-store reference: this store is '{expected}', member is bound to '{actual}'")]
    CrossStore { expected: String, actual: String },

    /// No version snapshot exists at the given time.
    #[error("no version snapshot for owner {owner_id} field '{field_name}' at {time}")]
    VersionNotFound {
        owner_id: EntityId,
        field_name: String,
        time: DateTime<Utc>,
    },

    /// Database operation failed.
    #[error("database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Stable error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Edge store (EDGE_xxx)
    EdgeDuplicateOpen,
    EdgeNoOpen,

    // Query engine (QRY_xxx)
    QryInvalidRange,

    // Mutation validation (VAL_xxx)
    ValTypeMismatch,
    ValCrossStore,

    // Version ledger (VER_xxx)
    VerNotFound,

    // Database (DB_xxx)
    DbOperationFailed,

    // Configuration (CFG_xxx)
    CfgInvalid,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::EdgeDuplicateOpen => "EDGE_001",
            ErrorCode::EdgeNoOpen => "EDGE_002",
            ErrorCode::QryInvalidRange => "QRY_001",
            ErrorCode::ValTypeMismatch => "VAL_001",
            ErrorCode::ValCrossStore => "VAL_002",
            ErrorCode::VerNotFound => "VER_001",
            ErrorCode::DbOperationFailed => "DB_001",
            ErrorCode::CfgInvalid => "CFG_001",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl ChronoRelError {
    /// Create a duplicate-edge error.
    pub fn duplicate_edge(
        owner_id: EntityId,
        field_name: impl Into<String>,
        member_id: EntityId,
    ) -> Self {
        Self::DuplicateEdge {
            owner_id,
            field_name: field_name.into(),
            member_id,
        }
    }

    /// Create a no-open-edge error.
    pub fn no_open_edge(
        owner_id: EntityId,
        field_name: impl Into<String>,
        member_id: EntityId,
    ) -> Self {
        Self::NoOpenEdge {
            owner_id,
            field_name: field_name.into(),
            member_id,
        }
    }

    /// Create an invalid-range error.
    pub fn invalid_range(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self::InvalidRange { from, to }
    }

    /// Create a type-mismatch error.
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a cross-store error.
    pub fn cross_store(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::CrossStore {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a version-not-found error.
    pub fn version_not_found(
        owner_id: EntityId,
        field_name: impl Into<String>,
        time: DateTime<Utc>,
    ) -> Self {
        Self::VersionNotFound {
            owner_id,
            field_name: field_name.into(),
            time,
        }
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            source: None,
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::DuplicateEdge { .. } => ErrorCode::EdgeDuplicateOpen,
            Self::NoOpenEdge { .. } => ErrorCode::EdgeNoOpen,
            Self::InvalidRange { .. } => ErrorCode::QryInvalidRange,
            Self::TypeMismatch { .. } => ErrorCode::ValTypeMismatch,
            Self::CrossStore { .. } => ErrorCode::ValCrossStore,
            Self::VersionNotFound { .. } => ErrorCode::VerNotFound,
            Self::Database { .. } => ErrorCode::DbOperationFailed,
            Self::Configuration(_) => ErrorCode::CfgInvalid,
            _ => ErrorCode::Internal,
        }
    }
}

impl From<rusqlite::Error> for ChronoRelError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_edge_error() {
        let err = ChronoRelError::duplicate_edge(1, "members", 7);
        assert_eq!(err.code(), ErrorCode::EdgeDuplicateOpen);
        assert!(err.to_string().contains("member 7"));
    }

    #[test]
    fn test_invalid_range_error() {
        let now = Utc::now();
        let err = ChronoRelError::invalid_range(now, now);
        assert_eq!(err.code(), ErrorCode::QryInvalidRange);
    }

    #[test]
    fn test_error_code_as_str() {
        assert_eq!(ErrorCode::EdgeDuplicateOpen.as_str(), "EDGE_001");
        assert_eq!(ErrorCode::ValCrossStore.as_str(), "VAL_002");
    }

    #[test]
    fn test_sqlite_error_maps_to_database() {
        let err: ChronoRelError = rusqlite::Error::InvalidQuery.into();
        assert_eq!(err.code(), ErrorCode::DbOperationFailed);
    }
}
