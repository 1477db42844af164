//! Mood-modulated Q-learning
//!
//! Positive and negative TD errors use separate learning rates, and a running
//! average of recent TD errors ("mood") biases every committed update.

use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use tabular_rl_core::{
    check_unit_interval, Agent, AgentConfig, BaseAgent, Experience, Result, TableInit,
    UpdateOptions,
};
use tracing::{debug, trace};

use crate::bootstrap::Bootstrap;
use crate::td::QCore;

/// Configuration for [`MoodQ`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoodQConfig {
    /// Base agent configuration
    #[serde(flatten)]
    pub base: AgentConfig,
    /// Successor-state bootstrap
    pub bootstrap: Bootstrap,
    /// Optimism weight for the max-min bootstrap
    pub w_value: f64,
    /// Initial action values
    pub q_init: TableInit<Array2<f64>>,
    /// Learning rate for non-positive TD errors; defaults to `lr`
    pub lr_neg: Option<f64>,
    /// Weight of the mood bias in each update
    pub mood_factor: f64,
    /// Step size of the mood average
    pub mood_lr: f64,
}

impl Default for MoodQConfig {
    fn default() -> Self {
        Self {
            base: AgentConfig::default(),
            bootstrap: Bootstrap::Softmax,
            w_value: 1.0,
            q_init: TableInit::Default,
            lr_neg: None,
            mood_factor: 0.0,
            mood_lr: 1e-1,
        }
    }
}

/// Q-learning agent whose updates are biased by a running TD-error average
#[derive(Debug, Clone)]
pub struct MoodQ {
    core: QCore,
    lr_neg: f64,
    mood_factor: f64,
    mood_lr: f64,
    mood: f64,
}

impl MoodQ {
    /// Create a new MoodQ agent
    pub fn new(config: MoodQConfig) -> Result<Self> {
        let lr_neg = config.lr_neg.unwrap_or(config.base.lr);
        check_unit_interval("lr_neg", lr_neg)?;
        check_unit_interval("mood_lr", config.mood_lr)?;
        let core = QCore::new(config.base, config.bootstrap, config.w_value, &config.q_init)?;
        Ok(Self {
            core,
            lr_neg,
            mood_factor: config.mood_factor,
            mood_lr: config.mood_lr,
            mood: 0.0,
        })
    }

    /// Current mood
    #[must_use]
    pub fn mood(&self) -> f64 {
        self.mood
    }

    /// Action values of a state
    pub fn q_estimate(&self, state: usize) -> Result<ArrayView1<'_, f64>> {
        self.core.q_estimate(state)
    }

    /// Softmax-weighted value of a state
    pub fn v_estimate(&self, state: usize) -> Result<f64> {
        self.core.v_estimate(state)
    }

    /// Apply the mood-biased TD update unless `prospective`; returns the TD error
    pub fn update_q(&mut self, experience: &Experience, prospective: bool) -> Result<f64> {
        let error = self.core.q_error(experience)?;
        if !prospective {
            let lr = if error > 0.0 {
                self.core.base.lr()
            } else {
                self.lr_neg
            };
            self.core.q[[experience.action, experience.state]] +=
                lr * (error + self.mood * self.mood_factor);
        }
        Ok(error)
    }
}

impl Agent for MoodQ {
    fn base(&self) -> &BaseAgent {
        &self.core.base
    }

    fn sample_action(&mut self, state: usize) -> Result<usize> {
        self.core.sample_action(state)
    }

    fn update_with(&mut self, experience: &Experience, options: UpdateOptions) -> Result<f64> {
        let error = self.update_q(experience, options.prospective)?;
        self.mood += self.mood_lr * (error - self.mood);
        trace!(error, mood = self.mood, "MoodQ update");
        self.core.base.record_update(error);
        Ok(error)
    }

    fn policy(&self) -> Array2<f64> {
        self.core.policy()
    }

    fn q_values(&self) -> Array2<f64> {
        self.core.q.clone()
    }

    fn reset(&mut self) {
        debug!(mood = self.mood, "resetting mood");
        self.mood = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn agent(mood_factor: f64, lr_neg: Option<f64>) -> MoodQ {
        MoodQ::new(MoodQConfig {
            base: AgentConfig {
                lr: 0.5,
                gamma: 0.9,
                ..AgentConfig::new(2, 2)
            },
            bootstrap: Bootstrap::MaxMin,
            lr_neg,
            mood_factor,
            mood_lr: 0.5,
            ..MoodQConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_mood_tracks_td_error() {
        let mut a = agent(0.0, None);
        let error = a.update(&Experience::new(0, 0, 1, 1.0, true)).unwrap();
        assert_abs_diff_eq!(error, 1.0);
        assert_abs_diff_eq!(a.mood(), 0.5);
        a.reset();
        assert_abs_diff_eq!(a.mood(), 0.0);
    }

    #[test]
    fn test_mood_biases_update() {
        let mut a = agent(1.0, None);
        a.update(&Experience::new(0, 0, 1, 1.0, true)).unwrap();
        // Q[0,0] = 0.5; mood = 0.5
        a.update(&Experience::new(1, 1, 0, 1.0, true)).unwrap();
        // error 1.0, bias 0.5 -> Q[1,1] = 0.5 * 1.5
        assert_abs_diff_eq!(a.q_values()[[1, 1]], 0.75);
    }

    #[test]
    fn test_negative_errors_use_lr_neg() {
        let mut a = agent(0.0, Some(0.0));
        a.update(&Experience::new(0, 0, 1, -1.0, true)).unwrap();
        assert_abs_diff_eq!(a.q_values()[[0, 0]], 0.0);
        assert_abs_diff_eq!(a.mood(), -0.5);
    }

    #[test]
    fn test_prospective_still_moves_mood() {
        let mut a = agent(0.0, None);
        a.update_with(&Experience::new(0, 0, 1, 2.0, true), UpdateOptions::prospective())
            .unwrap();
        assert_abs_diff_eq!(a.q_values()[[0, 0]], 0.0);
        assert_abs_diff_eq!(a.mood(), 1.0);
    }
}
