use std::env;
use std::fs;
use std::path::Path;

use coffer_common::{Amount, Timestamp};
use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

/// How the Yes tally is compared against the voting threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdRule {
    /// `yes * 100 >= threshold * total`
    #[default]
    AtLeast,
    /// `yes * 100 > threshold * total`
    StrictlyGreater,
}

impl ThresholdRule {
    pub fn is_met(&self, yes: Amount, total: Amount, threshold_percent: u32) -> bool {
        let lhs = yes.saturating_mul(100);
        let rhs = total.saturating_mul(threshold_percent as Amount);
        match self {
            ThresholdRule::AtLeast => lhs >= rhs,
            ThresholdRule::StrictlyGreater => lhs > rhs,
        }
    }
}

/// What happens to an unexecuted proposal after its deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ExpiryPolicy {
    /// Stays executable forever unless actively voted down
    #[default]
    Unbounded,
    /// Executable for `seconds` after the deadline, then rejected
    Window { seconds: u64 },
}

/// Policy values for one pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSettings {
    /// Minimum stake for joining, in base currency units
    pub min_invest: Amount,
    /// Maximum total stake per member
    pub max_invest: Amount,
    #[serde(default = "default_max_members")]
    pub max_members: u32,
    /// Yes percentage (0-100) of total weight needed before the deadline
    #[serde(default = "default_voting_threshold")]
    pub voting_threshold: u32,
    /// Seconds a proposal stays open for voting
    #[serde(default = "default_voting_time")]
    pub voting_time: u64,
    #[serde(default = "default_min_yes_voters")]
    pub min_yes_voters: u32,
    /// Anyone may join without a whitelist entry
    #[serde(default)]
    pub public: bool,
    /// After this time anyone may liquidate the pool directly
    #[serde(default)]
    pub auto_liquidate_at: Option<Timestamp>,
    #[serde(default)]
    pub threshold_rule: ThresholdRule,
    #[serde(default)]
    pub expiry: ExpiryPolicy,
}

fn default_max_members() -> u32 {
    50
}

fn default_voting_threshold() -> u32 {
    51
}

fn default_voting_time() -> u64 {
    86_400
}

fn default_min_yes_voters() -> u32 {
    1
}

impl PoolSettings {
    pub fn new(min_invest: Amount, max_invest: Amount) -> Self {
        Self {
            min_invest,
            max_invest,
            max_members: default_max_members(),
            voting_threshold: default_voting_threshold(),
            voting_time: default_voting_time(),
            min_yes_voters: default_min_yes_voters(),
            public: false,
            auto_liquidate_at: None,
            threshold_rule: ThresholdRule::default(),
            expiry: ExpiryPolicy::default(),
        }
    }

    pub fn with_max_members(mut self, max_members: u32) -> Self {
        self.max_members = max_members;
        self
    }

    pub fn with_voting_threshold(mut self, threshold: u32) -> Self {
        self.voting_threshold = threshold;
        self
    }

    pub fn with_voting_time(mut self, seconds: u64) -> Self {
        self.voting_time = seconds;
        self
    }

    pub fn with_min_yes_voters(mut self, voters: u32) -> Self {
        self.min_yes_voters = voters;
        self
    }

    pub fn with_public(mut self, public: bool) -> Self {
        self.public = public;
        self
    }

    pub fn with_auto_liquidate_at(mut self, at: Timestamp) -> Self {
        self.auto_liquidate_at = Some(at);
        self
    }

    pub fn with_threshold_rule(mut self, rule: ThresholdRule) -> Self {
        self.threshold_rule = rule;
        self
    }

    pub fn with_expiry(mut self, expiry: ExpiryPolicy) -> Self {
        self.expiry = expiry;
        self
    }

    /// Check the values a pool may be launched with
    pub fn validate(&self) -> Result<()> {
        check_voting_threshold(self.voting_threshold)?;
        check_voting_time(self.voting_time)?;
        check_max_members(self.max_members)?;
        check_min_yes_voters(self.min_yes_voters)?;
        check_min_invest(self.min_invest)?;
        check_invest_bounds(self.min_invest, self.max_invest)?;
        Ok(())
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let settings: PoolSettings = serde_yaml::from_str(contents)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            ConfigError::FileReadError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Load settings from the file named by `COFFER_POOL_CONFIG`
    pub fn from_env() -> Result<Self> {
        let path = env::var("COFFER_POOL_CONFIG")
            .map_err(|e| ConfigError::EnvVarNotFound(format!("COFFER_POOL_CONFIG: {}", e)))?;
        Self::from_file(path)
    }
}

pub(crate) fn check_voting_threshold(threshold: u32) -> Result<()> {
    if threshold > 100 {
        return Err(ConfigError::InvalidSetting("Invalid Voting Threshold (0-100)".into()));
    }
    Ok(())
}

pub(crate) fn check_voting_time(seconds: u64) -> Result<()> {
    if seconds == 0 {
        return Err(ConfigError::InvalidSetting("Invalid Voting Time".into()));
    }
    Ok(())
}

pub(crate) fn check_max_members(max_members: u32) -> Result<()> {
    if max_members == 0 {
        return Err(ConfigError::InvalidSetting("Invalid MaxMembers".into()));
    }
    Ok(())
}

pub(crate) fn check_min_yes_voters(voters: u32) -> Result<()> {
    if voters == 0 {
        return Err(ConfigError::InvalidSetting("Invalid minYesVoters".into()));
    }
    Ok(())
}

pub(crate) fn check_min_invest(min_invest: Amount) -> Result<()> {
    if min_invest == 0 {
        return Err(ConfigError::InvalidSetting("Invalid minInvest".into()));
    }
    Ok(())
}

pub(crate) fn check_invest_bounds(min_invest: Amount, max_invest: Amount) -> Result<()> {
    if max_invest < min_invest {
        return Err(ConfigError::InvalidSetting(
            "maxInvest must be at least minInvest".into(),
        ));
    }
    Ok(())
}
