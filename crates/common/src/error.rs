//! Error taxonomy for pool operations
//!
//! Every check is a precondition: the first failing one aborts the whole
//! operation, so an error always means "nothing happened".

use thiserror::Error;
use std::result;

/// Common result type used throughout Coffer
pub type Result<T> = result::Result<T, Error>;

/// Error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Authorization,
    Validation,
    Membership,
    Economic,
    State,
    Serialization,
    Internal,
}

/// Common error type for pool operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Bad or stale signature, nonce mismatch, wrong signer, wrong caller
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// Missing or malformed input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not a member, already a member, not whitelisted, member cap reached
    #[error("Membership error: {0}")]
    Membership(String),

    /// Stake out of bounds, insufficient funds, allowance or balance
    #[error("Economic error: {0}")]
    Economic(String),

    /// Operation not allowed in the current lifecycle state
    #[error("State error: {0}")]
    State(String),

    /// Payload encoding or decoding failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new authorization error
    pub fn authorization<S: Into<String>>(msg: S) -> Self {
        Error::Authorization(msg.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Error::Validation(msg.into())
    }

    /// Create a new membership error
    pub fn membership<S: Into<String>>(msg: S) -> Self {
        Error::Membership(msg.into())
    }

    /// Create a new economic error
    pub fn economic<S: Into<String>>(msg: S) -> Self {
        Error::Economic(msg.into())
    }

    /// Create a new state error
    pub fn state<S: Into<String>>(msg: S) -> Self {
        Error::State(msg.into())
    }

    /// Create a new serialization error
    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        Error::Serialization(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Error::Internal(msg.into())
    }

    /// The category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Authorization(_) => ErrorKind::Authorization,
            Error::Validation(_) => ErrorKind::Validation,
            Error::Membership(_) => ErrorKind::Membership,
            Error::Economic(_) => ErrorKind::Economic,
            Error::State(_) => ErrorKind::State,
            Error::Serialization(_) => ErrorKind::Serialization,
            Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// The human-readable reason without the category prefix
    pub fn reason(&self) -> &str {
        match self {
            Error::Authorization(msg)
            | Error::Validation(msg)
            | Error::Membership(msg)
            | Error::Economic(msg)
            | Error::State(msg)
            | Error::Serialization(msg)
            | Error::Internal(msg) => msg,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
