//! Error types for store operations
//!
//! We use `thiserror` for automatic `Display` and `Error` implementations.
//! Persistence-layer errors (codec, save, recovery) live next to the code
//! that raises them in `ember-persistence`; this module only covers the
//! store's own operation errors.

use thiserror::Error;

/// Result type alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors raised by store operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Operation applied to a key holding a different value type
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value (expected {expected}, found {actual})")]
    WrongType {
        /// Type the operation requires
        expected: &'static str,
        /// Type actually stored at the key
        actual: &'static str,
    },

    /// Value at the key is not representable as a 64-bit integer
    #[error("value is not an integer or out of range")]
    NotAnInteger,

    /// Integer operation overflowed
    #[error("increment or decrement would overflow")]
    IntegerOverflow,
}
