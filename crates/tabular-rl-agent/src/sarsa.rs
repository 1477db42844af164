//! SARSA with a one-slot delay buffer
//!
//! The update for a transition needs the action taken after it, so each
//! experience is held until the next one arrives.

use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use tabular_rl_core::{
    Agent, AgentConfig, BaseAgent, Experience, Result, TableInit, UpdateOptions,
};
use tracing::{debug, trace};

/// Configuration for [`Sarsa`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SarsaConfig {
    /// Base agent configuration
    #[serde(flatten)]
    pub base: AgentConfig,
    /// Initial action values
    pub q_init: TableInit<Array2<f64>>,
}

/// On-policy SARSA agent
#[derive(Debug, Clone)]
pub struct Sarsa {
    base: BaseAgent,
    q: Array2<f64>,
    last_exp: Option<Experience>,
}

impl Sarsa {
    /// Create a new SARSA agent
    pub fn new(config: SarsaConfig) -> Result<Self> {
        let mut base = BaseAgent::new(config.base)?;
        let (actions, states) = (base.action_size(), base.state_size());
        let q = config.q_init.resolve_q(actions, states, base.rng())?;
        Ok(Self {
            base,
            q,
            last_exp: None,
        })
    }

    /// Action values of a state
    pub fn q_estimate(&self, state: usize) -> Result<ArrayView1<'_, f64>> {
        self.base.check_state(state)?;
        Ok(self.q.column(state))
    }

    /// Experience waiting for its successor action
    #[must_use]
    pub fn pending(&self) -> Option<&Experience> {
        self.last_exp.as_ref()
    }
}

impl Agent for Sarsa {
    fn base(&self) -> &BaseAgent {
        &self.base
    }

    fn sample_action(&mut self, state: usize) -> Result<usize> {
        self.base.check_state(state)?;
        self.base.sample_action(self.q.column(state))
    }

    fn update_with(&mut self, experience: &Experience, _options: UpdateOptions) -> Result<f64> {
        self.base.check_experience(experience)?;
        let Some(last) = self.last_exp.replace(*experience) else {
            self.base.record_update(0.0);
            return Ok(0.0);
        };

        let (lr, gamma) = (self.base.lr(), self.base.gamma());
        let next_cell = [experience.action, last.next_state];
        let error = last.reward + gamma * self.q[next_cell] - self.q[[last.action, last.state]];
        self.q[[last.action, last.state]] += lr * error;
        if experience.done {
            self.q[next_cell] += lr * (experience.reward - self.q[next_cell]);
        }

        let error = error.abs();
        trace!(state = last.state, action = last.action, error, "SARSA update");
        self.base.record_update(error);
        Ok(error)
    }

    fn policy(&self) -> Array2<f64> {
        self.base.policy(self.q.view())
    }

    fn q_values(&self) -> Array2<f64> {
        self.q.clone()
    }

    fn reset(&mut self) {
        debug!("dropping pending SARSA experience");
        self.last_exp = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn agent() -> Sarsa {
        Sarsa::new(SarsaConfig {
            base: AgentConfig {
                lr: 0.5,
                gamma: 0.9,
                ..AgentConfig::new(3, 2)
            },
            ..SarsaConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_first_update_is_buffered() {
        let mut a = agent();
        let error = a.update(&Experience::new(0, 1, 1, 1.0, false)).unwrap();
        assert_abs_diff_eq!(error, 0.0);
        assert!(a.q_values().iter().all(|v| *v == 0.0));
        assert!(a.pending().is_some());
    }

    #[test]
    fn test_second_update_targets_first_cell() {
        let mut a = agent();
        a.update(&Experience::new(0, 1, 1, 1.0, false)).unwrap();
        let error = a.update(&Experience::new(1, 0, 2, 5.0, false)).unwrap();
        assert_abs_diff_eq!(error, 1.0);
        let q = a.q_values();
        assert_abs_diff_eq!(q[[1, 0]], 0.5);
        assert_abs_diff_eq!(q.sum(), 0.5);
    }

    #[test]
    fn test_terminal_successor_gets_corrected() {
        let mut a = agent();
        a.update(&Experience::new(0, 1, 1, 0.0, false)).unwrap();
        a.update(&Experience::new(1, 0, 2, 2.0, true)).unwrap();
        assert_abs_diff_eq!(a.q_values()[[0, 1]], 1.0);
    }

    #[test]
    fn test_reset_clears_buffer() {
        let mut a = agent();
        a.update(&Experience::new(0, 1, 1, 1.0, false)).unwrap();
        a.reset();
        assert!(a.pending().is_none());
        assert_abs_diff_eq!(a.update(&Experience::new(2, 0, 0, 1.0, false)).unwrap(), 0.0);
        assert!(a.q_values().iter().all(|v| *v == 0.0));
    }
}
