//! Action-selection rules over action-value vectors
//!
//! An [`ActionSampler`] maps a length-A vector of action values to either a
//! sampled action or the full distribution it samples from. It holds no mutable
//! state; randomness comes from the caller's RNG.

use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::numeric::{argmax, softmax};
use crate::{RLError, Result};

/// How actions are selected from action values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PolicyType {
    /// Sample proportional to `softmax(beta * values)`
    #[default]
    #[serde(rename = "softmax")]
    Softmax,
    /// Greedy with probability `1 - epsilon`, uniform otherwise
    #[serde(rename = "epsilon-greedy", alias = "greedy")]
    EpsilonGreedy,
    /// Epsilon-greedy, replaced by a uniform action with probability `lapse`
    #[serde(rename = "s_lapse")]
    Lapse,
}

impl FromStr for PolicyType {
    type Err = RLError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "softmax" => Ok(Self::Softmax),
            "greedy" | "epsilon-greedy" => Ok(Self::EpsilonGreedy),
            "s_lapse" => Ok(Self::Lapse),
            other => Err(RLError::InvalidConfig(format!(
                "unknown policy type '{other}'"
            ))),
        }
    }
}

impl fmt::Display for PolicyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Softmax => "softmax",
            Self::EpsilonGreedy => "epsilon-greedy",
            Self::Lapse => "s_lapse",
        };
        f.write_str(name)
    }
}

/// Stateless action sampler shared by every agent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActionSampler {
    /// Selection rule
    pub poltype: PolicyType,
    /// Inverse temperature for softmax selection
    pub beta: f64,
    /// Exploration probability for epsilon-greedy selection
    pub epsilon: f64,
    /// Probability of a uniformly random lapse
    pub lapse: f64,
}

impl ActionSampler {
    /// Create a new sampler
    #[must_use]
    pub fn new(poltype: PolicyType, beta: f64, epsilon: f64, lapse: f64) -> Self {
        Self {
            poltype,
            beta,
            epsilon,
            lapse,
        }
    }

    /// Sample an action index from a vector of action values
    pub fn sample<R: Rng + ?Sized>(&self, values: ArrayView1<f64>, rng: &mut R) -> Result<usize> {
        let n = values.len();
        match self.poltype {
            PolicyType::Softmax => {
                let probs = softmax(values.mapv(|v| v * self.beta).view());
                let dist = WeightedIndex::new(probs.iter())
                    .map_err(|e| RLError::Computation(format!("softmax policy: {e}")))?;
                Ok(dist.sample(rng))
            }
            PolicyType::EpsilonGreedy => Ok(self.epsilon_greedy(values, rng)),
            PolicyType::Lapse => {
                if rng.gen::<f64>() < self.lapse {
                    Ok(rng.gen_range(0..n))
                } else {
                    Ok(self.epsilon_greedy(values, rng))
                }
            }
        }
    }

    fn epsilon_greedy<R: Rng + ?Sized>(&self, values: ArrayView1<f64>, rng: &mut R) -> usize {
        if rng.gen::<f64>() < self.epsilon {
            rng.gen_range(0..values.len())
        } else {
            argmax(values)
        }
    }

    /// Distribution over actions that [`ActionSampler::sample`] draws from
    #[must_use]
    pub fn probabilities(&self, values: ArrayView1<f64>) -> Array1<f64> {
        let n = values.len() as f64;
        match self.poltype {
            PolicyType::Softmax => softmax(values.mapv(|v| v * self.beta).view()),
            PolicyType::EpsilonGreedy => self.epsilon_greedy_probs(values),
            PolicyType::Lapse => {
                self.epsilon_greedy_probs(values) * (1.0 - self.lapse) + self.lapse / n
            }
        }
    }

    fn epsilon_greedy_probs(&self, values: ArrayView1<f64>) -> Array1<f64> {
        let n = values.len();
        let mut probs = Array1::from_elem(n, self.epsilon / n as f64);
        probs[argmax(values)] += 1.0 - self.epsilon;
        probs
    }

    /// Policy matrix `[S, A]` for an action-value table shaped `[A, S]`
    #[must_use]
    pub fn policy(&self, q: ArrayView2<f64>) -> Array2<f64> {
        let (actions, states) = q.dim();
        let mut policy = Array2::zeros((states, actions));
        for (s, column) in q.columns().into_iter().enumerate() {
            policy.row_mut(s).assign(&self.probabilities(column));
        }
        policy
    }
}

impl Default for ActionSampler {
    fn default() -> Self {
        Self::new(PolicyType::Softmax, 1e4, 1e-1, 0.0)
    }
}
