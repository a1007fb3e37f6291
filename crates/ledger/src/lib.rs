//! Share ledger for Coffer pools
//!
//! Shares are fungible units that represent both ownership of the pool's
//! holdings and voting weight. Only the owning pool can issue or burn them,
//! and once the pool is liquidated the ledger is destroyed for good.

pub mod math;
pub mod shares;

use thiserror::Error;

pub use math::mul_div;
pub use shares::ShareLedger;

/// Error types for ledger operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Caller is not the owning pool
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Balance too low for a transfer or burn
    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),

    /// Zero amount, self-delegation and similar
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Arithmetic would overflow
    #[error("Overflow: {0}")]
    Overflow(String),

    /// The ledger has been destroyed
    #[error("Share ledger destroyed")]
    Destroyed,
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

impl From<LedgerError> for coffer_common::Error {
    fn from(err: LedgerError) -> Self {
        use coffer_common::Error;
        match err {
            LedgerError::PermissionDenied(_) => Error::Authorization(err.to_string()),
            LedgerError::InsufficientBalance(_) | LedgerError::Overflow(_) => {
                Error::Economic(err.to_string())
            }
            LedgerError::InvalidOperation(_) => Error::Validation(err.to_string()),
            LedgerError::Destroyed => Error::State(err.to_string()),
        }
    }
}
