//! Common types, errors and utilities for Coffer pools
//!
//! Every other crate in the workspace builds on the account identifiers,
//! amount types and the error taxonomy defined here.

pub mod clock;
pub mod error;
pub mod logging;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, ErrorKind, Result};
pub use types::{AccountId, Amount, Timestamp};
