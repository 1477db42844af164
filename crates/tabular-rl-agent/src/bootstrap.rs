//! One-step bootstrap targets shared by the Q-style learners
//!
//! The TD error of a transition `(s, a, s_1, r, done)` is
//! `target - Q(s, a)`, where the target is `r` on terminal transitions and
//! `r + gamma * bootstrap(Q(s_1, .))` otherwise.

use std::fmt;
use std::str::FromStr;

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use tabular_rl_core::numeric::{max, min, softmax};
use tabular_rl_core::{check_unit_interval, Experience, RLError, Result};

/// How the successor state's action values are collapsed into one number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Bootstrap {
    /// `w_value * max + (1 - w_value) * min`
    #[default]
    #[serde(rename = "max-min")]
    MaxMin,
    /// Expectation under `softmax(beta * Q(s_1, .))`
    #[serde(rename = "softmax")]
    Softmax,
    /// Unweighted mean over actions
    #[serde(rename = "mean")]
    Mean,
    /// Value of the action actually taken in `s_1`
    #[serde(rename = "action")]
    NextAction,
}

impl FromStr for Bootstrap {
    type Err = RLError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "max-min" => Ok(Self::MaxMin),
            "softmax" => Ok(Self::Softmax),
            "mean" => Ok(Self::Mean),
            "action" => Ok(Self::NextAction),
            other => Err(RLError::InvalidConfig(format!(
                "unknown bootstrap type '{other}'"
            ))),
        }
    }
}

impl fmt::Display for Bootstrap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MaxMin => "max-min",
            Self::Softmax => "softmax",
            Self::Mean => "mean",
            Self::NextAction => "action",
        };
        f.write_str(name)
    }
}

/// Interpolate between the optimistic and pessimistic value of a vector
#[must_use]
pub fn max_min(values: ArrayView1<f64>, w_value: f64) -> f64 {
    w_value * max(values) + (1.0 - w_value) * min(values)
}

/// Bootstrap strategy resolved once at construction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QBootstrap {
    /// Bootstrap mode
    pub mode: Bootstrap,
    /// Discount factor
    pub gamma: f64,
    /// Inverse temperature for the softmax mode
    pub beta: f64,
    /// Optimism weight for the max-min mode
    pub w_value: f64,
}

impl QBootstrap {
    /// Create a bootstrap strategy
    pub fn new(mode: Bootstrap, gamma: f64, beta: f64, w_value: f64) -> Result<Self> {
        check_unit_interval("w_value", w_value)?;
        Ok(Self {
            mode,
            gamma,
            beta,
            w_value,
        })
    }

    /// Fail early when the fixed-action mode has no action to use
    pub fn check(&self, next_action: Option<usize>) -> Result<()> {
        if self.mode == Bootstrap::NextAction && next_action.is_none() {
            Err(RLError::InvalidBootstrap)
        } else {
            Ok(())
        }
    }

    /// Bootstrapped value of the successor state
    pub fn value(&self, q_next: ArrayView1<f64>, next_action: Option<usize>) -> Result<f64> {
        match self.mode {
            Bootstrap::MaxMin => Ok(max_min(q_next, self.w_value)),
            Bootstrap::Softmax => {
                let probs = softmax(q_next.mapv(|v| v * self.beta).view());
                Ok(q_next.dot(&probs))
            }
            Bootstrap::Mean => Ok(q_next.sum() / q_next.len() as f64),
            Bootstrap::NextAction => next_action
                .map(|a| q_next[a])
                .ok_or(RLError::InvalidBootstrap),
        }
    }

    /// TD error of `experience` given the action values of its two states
    pub fn q_error(
        &self,
        q_state: ArrayView1<f64>,
        q_next: ArrayView1<f64>,
        experience: &Experience,
    ) -> Result<f64> {
        let bootstrap = self.value(q_next, experience.next_action)?;
        let target = if experience.done {
            experience.reward
        } else {
            experience.reward + self.gamma * bootstrap
        };
        Ok(target - q_state[experience.action])
    }
}
