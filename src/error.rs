//! Error types and handling for the tradeflow pipeline

use std::fmt;

use thiserror::Error;

/// Result type alias for tradeflow operations
pub type Result<T> = std::result::Result<T, TradeflowError>;

/// Sub-kind for store failures, used to route retry guidance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// Could not open a connection / wire-level session
    Connect,
    /// Schema bootstrap or DDL (prepare phase) failed
    Schema,
    /// Bulk COPY stream or row encoding failed
    Bulk,
    /// Constraint rebuild (primary key / index) failed
    Constraint,
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Connect => "connect",
            Self::Schema => "schema",
            Self::Bulk => "bulk",
            Self::Constraint => "constraint",
        };
        f.write_str(s)
    }
}

/// Main error type for the tradeflow pipeline
#[derive(Error, Debug)]
pub enum TradeflowError {
    /// I/O errors from file operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Structurally corrupt input that cannot yield any record
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the corruption
        message: String,
    },

    /// Invalid configuration parameter
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Error message describing the configuration issue
        message: String,
    },

    /// Database operation failure
    #[error("Store error ({kind}): {message}")]
    Store {
        /// Which part of the store contract failed
        kind: StoreErrorKind,
        /// Driver-level message
        message: String,
    },

    /// Columnar encoder or codec error
    #[error("Encode error: {message}")]
    Encode {
        /// Underlying codec message
        message: String,
    },

    /// Task submitted after the pool began shutdown
    #[error("Thread pool is closed")]
    PoolClosed,

    /// A pool task panicked; the payload is captured here
    #[error("Task panicked: {message}")]
    TaskPanic {
        /// Panic payload rendered as text
        message: String,
    },
}

impl TradeflowError {
    /// Create a new parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a new store error of the given sub-kind
    pub fn store(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self::Store {
            kind,
            message: message.into(),
        }
    }

    /// Create a new connection failure
    pub fn connect(message: impl Into<String>) -> Self {
        Self::store(StoreErrorKind::Connect, message)
    }

    /// Create a new schema/DDL failure
    pub fn schema(message: impl Into<String>) -> Self {
        Self::store(StoreErrorKind::Schema, message)
    }

    /// Create a new bulk stream failure
    pub fn bulk(message: impl Into<String>) -> Self {
        Self::store(StoreErrorKind::Bulk, message)
    }

    /// Create a new constraint rebuild failure
    pub fn constraint(message: impl Into<String>) -> Self {
        Self::store(StoreErrorKind::Constraint, message)
    }

    /// Create a new encode error
    pub fn encode(message: impl Into<String>) -> Self {
        Self::Encode {
            message: message.into(),
        }
    }

    /// Create a new task panic error
    pub fn task_panic(message: impl Into<String>) -> Self {
        Self::TaskPanic {
            message: message.into(),
        }
    }

    /// Check if this error concerns the relational store
    pub fn is_store_error(&self) -> bool {
        matches!(self, Self::Store { .. })
    }

    /// Check if the operation can be retried without redoing the bulk load.
    ///
    /// A constraint rebuild failure leaves the data loaded; the operator can
    /// rerun finalize. A connect failure can be retried once the server is
    /// reachable again.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::Store {
                kind: StoreErrorKind::Constraint | StoreErrorKind::Connect,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = TradeflowError::config("bad worker count");
        assert!(matches!(err, TradeflowError::InvalidConfig { .. }));
        assert!(!err.is_store_error());
    }

    #[test]
    fn test_store_error_classification() {
        let bulk = TradeflowError::bulk("copy stream reset");
        assert!(bulk.is_store_error());
        assert!(!bulk.is_retriable());

        let constraint = TradeflowError::constraint("duplicate key");
        assert!(constraint.is_store_error());
        assert!(constraint.is_retriable());

        let connect = TradeflowError::connect("refused");
        assert!(connect.is_retriable());
    }

    #[test]
    fn test_error_display_includes_kind() {
        let err = TradeflowError::schema("relation exists");
        assert_eq!(err.to_string(), "Store error (schema): relation exists");
    }
}
