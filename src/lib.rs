//! Coffer
//!
//! Member-owned capital pools: members stake a base currency for shares,
//! and the shared treasury moves only through proposals the shareholders
//! approve.

/// Module version information
pub mod version {
    /// The current version of the Coffer library
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}

/// Shared building blocks
pub mod foundation {
    pub use coffer_common as common;
    pub use coffer_config as config;
    pub use coffer_crypto as crypto;
}

/// Pool subsystems
pub mod systems {
    pub use coffer_economic as economic;
    pub use coffer_governance as governance;
    pub use coffer_ledger as ledger;
    pub use coffer_pool as pool;
}

pub use coffer_common::logging::init_logging;
pub use coffer_common::{AccountId, Amount, Error, ErrorKind, Result, Timestamp};
pub use coffer_pool::{LaunchParams, Pool, PoolDirectory, PoolEvent, PoolHost, RelayedCall, RelayerGateway};

#[cfg(test)]
mod tests {
    #[test]
    fn version_is_available() {
        assert!(!super::version::VERSION.is_empty());
    }
}
