//! Reward-weight learning rules

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tabular_rl_core::{RLError, Result};

/// How a learner tracks its per-state reward weights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WeightRule {
    /// Delta rule toward the observed reward of the reached state
    #[default]
    #[serde(rename = "direct")]
    Direct,
    /// State-value TD error scattered along the policy-averaged SR row
    #[serde(rename = "td")]
    Td,
    /// Max-min bootstrapped TD error scattered along the SR row
    #[serde(rename = "max-min")]
    MaxMin,
    /// Separate reward and punishment averages, recombined
    #[serde(rename = "rew_pun")]
    RewPun,
}

impl WeightRule {
    /// Reject rules a learner family does not implement
    pub fn ensure_supported(self, supported: &[WeightRule], family: &str) -> Result<Self> {
        if supported.contains(&self) {
            Ok(self)
        } else {
            Err(RLError::InvalidConfig(format!(
                "{family} does not support weight rule '{self}'"
            )))
        }
    }
}

impl FromStr for WeightRule {
    type Err = RLError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "direct" => Ok(Self::Direct),
            "td" => Ok(Self::Td),
            "max-min" => Ok(Self::MaxMin),
            "rew_pun" => Ok(Self::RewPun),
            other => Err(RLError::InvalidConfig(format!(
                "unknown weight rule '{other}'"
            ))),
        }
    }
}

impl fmt::Display for WeightRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Direct => "direct",
            Self::Td => "td",
            Self::MaxMin => "max-min",
            Self::RewPun => "rew_pun",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_supported() {
        let allowed = [WeightRule::Direct, WeightRule::RewPun];
        assert!(WeightRule::RewPun.ensure_supported(&allowed, "TDSR_RP").is_ok());
        assert!(WeightRule::Td.ensure_supported(&allowed, "TDSR_RP").is_err());
    }

    #[test]
    fn test_serde_names() {
        let rule: WeightRule = serde_json::from_str("\"rew_pun\"").unwrap();
        assert_eq!(rule, WeightRule::RewPun);
        assert_eq!("max-min".parse::<WeightRule>().unwrap(), WeightRule::MaxMin);
    }
}
