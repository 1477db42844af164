//! Model-based value iteration
//!
//! The learners here record a deterministic transition table `T[a, s, :]`
//! (one-hot successor rows) and plan over it with synchronous value-iteration
//! sweeps:
//!
//! ```text
//! Q[a, s] = w[s_1] + gamma * (w_value * max Q[., s_1] + (1 - w_value) * min Q[., s_1])
//! ```
//!
//! Pairs without a recorded successor keep their value. Whenever a recorded
//! successor changes the planned table is stale and is reset to zero.

use ndarray::{s, Array1, Array2, Array3, ArrayView1, ArrayView3};
use serde::{Deserialize, Serialize};
use tabular_rl_core::numeric::{argmax, onehot};
use tabular_rl_core::{
    check_unit_interval, Agent, AgentConfig, BaseAgent, Experience, RLError, Result,
    UpdateOptions,
};
use tracing::{debug, trace};

use crate::bootstrap::max_min;
use crate::weights::WeightRule;

/// Sweeps run by [`MbvR`] whenever its model or reward expectation is violated
pub const REPLAN_SWEEPS: usize = 10;

/// Transition model plus the action values planned over it
#[derive(Debug, Clone)]
pub(crate) struct Planner {
    t: Array3<f64>,
    q: Array2<f64>,
    gamma: f64,
    w_value: f64,
    tol: f64,
}

impl Planner {
    fn new(actions: usize, states: usize, gamma: f64, w_value: f64, tol: f64) -> Result<Self> {
        check_unit_interval("w_value", w_value)?;
        if !(tol.is_finite() && tol >= 0.0) {
            return Err(RLError::InvalidConfig(format!(
                "tol must be finite and non-negative, got {tol}"
            )));
        }
        Ok(Self {
            t: Array3::zeros((actions, states, states)),
            q: Array2::zeros((actions, states)),
            gamma,
            w_value,
            tol,
        })
    }

    /// Record `s --a--> s_1`; returns whether the model changed
    fn record(&mut self, state: usize, action: usize, next_state: usize) -> bool {
        let next = onehot(next_state, self.t.dim().2);
        let mut row = self.t.slice_mut(s![action, state, ..]);
        if row == next {
            return false;
        }
        row.assign(&next);
        self.q.fill(0.0);
        debug!(state, action, next_state, "transition model changed, planned values reset");
        true
    }

    /// Run up to `max_iter` sweeps; returns the number performed
    fn plan(&mut self, w: ArrayView1<f64>, max_iter: usize) -> usize {
        let (actions, states, _) = self.t.dim();
        for sweep in 1..=max_iter {
            let prev = self.q.clone();
            let mut delta = 0.0_f64;
            for s in 0..states {
                for a in 0..actions {
                    let row = self.t.slice(s![a, s, ..]);
                    if row.sum() <= 0.0 {
                        continue;
                    }
                    let s_1 = argmax(row);
                    let value = w[s_1] + self.gamma * max_min(prev.column(s_1), self.w_value);
                    delta = delta.max((value - prev[[a, s]]).abs());
                    self.q[[a, s]] = value;
                }
            }
            if delta < self.tol {
                debug!(sweep, delta, "value iteration converged");
                return sweep;
            }
        }
        max_iter
    }
}

/// Configuration for [`Mbv`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MbvConfig {
    /// Base agent configuration
    #[serde(flatten)]
    pub base: AgentConfig,
    /// Reward-weight learning rule; only direct is supported
    pub weights: WeightRule,
    /// Optimism weight of the planning backup
    pub w_value: f64,
    /// Sweeps per update
    pub max_iter: usize,
    /// Convergence threshold on the largest value change of a sweep
    pub tol: f64,
}

impl Default for MbvConfig {
    fn default() -> Self {
        Self {
            base: AgentConfig::default(),
            weights: WeightRule::Direct,
            w_value: 1.0,
            max_iter: 1,
            tol: 0.01,
        }
    }
}

/// Model-based value-iteration agent
#[derive(Debug, Clone)]
pub struct Mbv {
    base: BaseAgent,
    planner: Planner,
    w: Array1<f64>,
    max_iter: usize,
}

impl Mbv {
    /// Create a new MBV agent
    pub fn new(config: MbvConfig) -> Result<Self> {
        config
            .weights
            .ensure_supported(&[WeightRule::Direct], "MBV")?;
        let base = BaseAgent::new(config.base)?;
        let (actions, states) = (base.action_size(), base.state_size());
        let planner = Planner::new(actions, states, base.gamma(), config.w_value, config.tol)?;
        Ok(Self {
            base,
            planner,
            w: Array1::zeros(states),
            max_iter: config.max_iter,
        })
    }

    /// Recorded transitions, `[actions, states, states]`
    #[must_use]
    pub fn transitions(&self) -> ArrayView3<'_, f64> {
        self.planner.t.view()
    }

    /// Learned reward weights
    #[must_use]
    pub fn weights(&self) -> ArrayView1<'_, f64> {
        self.w.view()
    }

    /// Planned action values of a state
    pub fn q_estimate(&self, state: usize) -> Result<ArrayView1<'_, f64>> {
        self.base.check_state(state)?;
        Ok(self.planner.q.column(state))
    }

    /// Record the experienced transition; returns whether the model changed
    pub fn update_t(&mut self, experience: &Experience) -> Result<bool> {
        self.base.check_experience(experience)?;
        Ok(self
            .planner
            .record(experience.state, experience.action, experience.next_state))
    }

    /// Delta rule toward the observed reward; returns the signed error
    pub fn update_w(&mut self, experience: &Experience) -> Result<f64> {
        self.base.check_experience(experience)?;
        let s_1 = experience.next_state;
        let error = experience.reward - self.w[s_1];
        self.w[s_1] += self.base.lr() * error;
        Ok(error)
    }

    /// Run up to `max_iter` value-iteration sweeps; returns the sweeps performed
    pub fn update_q(&mut self, max_iter: usize) -> usize {
        self.planner.plan(self.w.view(), max_iter)
    }
}

impl Agent for Mbv {
    fn base(&self) -> &BaseAgent {
        &self.base
    }

    fn sample_action(&mut self, state: usize) -> Result<usize> {
        self.base.check_state(state)?;
        self.base.sample_action(self.planner.q.column(state))
    }

    fn update_with(&mut self, experience: &Experience, _options: UpdateOptions) -> Result<f64> {
        self.update_t(experience)?;
        let error = self.update_w(experience)?.abs();
        let sweeps = self.update_q(self.max_iter);
        trace!(w_error = error, sweeps, "MBV update");
        self.base.record_update(error);
        Ok(error)
    }

    fn policy(&self) -> Array2<f64> {
        self.base.policy(self.planner.q.view())
    }

    fn q_values(&self) -> Array2<f64> {
        self.planner.q.clone()
    }
}

/// Configuration for [`MbvR`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MbvRConfig {
    /// Base agent configuration
    #[serde(flatten)]
    pub base: AgentConfig,
    /// Reward per state; zeros when empty
    pub reward: Array1<f64>,
    /// Optimism weight of the planning backup
    pub w_value: f64,
}

impl Default for MbvRConfig {
    fn default() -> Self {
        Self {
            base: AgentConfig::default(),
            reward: Array1::zeros(0),
            w_value: 1.0,
        }
    }
}

/// Model-based value iteration over a known reward function
///
/// Only the transition model is learned. The agent replans with
/// [`REPLAN_SWEEPS`] sweeps when the model changes or a reward exceeds its
/// expected value, and runs one sweep on every update.
#[derive(Debug, Clone)]
pub struct MbvR {
    base: BaseAgent,
    planner: Planner,
    w: Array1<f64>,
}

impl MbvR {
    /// Create a new MBV_R agent
    pub fn new(config: MbvRConfig) -> Result<Self> {
        let base = BaseAgent::new(config.base)?;
        let (actions, states) = (base.action_size(), base.state_size());
        let w = if config.reward.is_empty() {
            Array1::zeros(states)
        } else if config.reward.len() == states {
            config.reward
        } else {
            return Err(RLError::ShapeMismatch {
                expected: vec![states],
                actual: config.reward.shape().to_vec(),
            });
        };
        let planner = Planner::new(actions, states, base.gamma(), config.w_value, 0.0)?;
        Ok(Self { base, planner, w })
    }

    /// Recorded transitions, `[actions, states, states]`
    #[must_use]
    pub fn transitions(&self) -> ArrayView3<'_, f64> {
        self.planner.t.view()
    }

    /// Reward function
    #[must_use]
    pub fn weights(&self) -> ArrayView1<'_, f64> {
        self.w.view()
    }

    /// Planned action values of a state
    pub fn q_estimate(&self, state: usize) -> Result<ArrayView1<'_, f64>> {
        self.base.check_state(state)?;
        Ok(self.planner.q.column(state))
    }

    /// Record the experienced transition, replanning if the model changed
    pub fn update_t(&mut self, experience: &Experience) -> Result<bool> {
        self.base.check_experience(experience)?;
        let changed = self
            .planner
            .record(experience.state, experience.action, experience.next_state);
        if changed {
            self.planner.plan(self.w.view(), REPLAN_SWEEPS);
        }
        Ok(changed)
    }

    /// Compare the reward to the known function, replanning on a surplus
    ///
    /// Returns the signed error; the reward function itself is left unchanged.
    pub fn update_w(&mut self, experience: &Experience) -> Result<f64> {
        self.base.check_experience(experience)?;
        let error = experience.reward - self.w[experience.next_state];
        if error > 0.0 {
            self.planner.plan(self.w.view(), REPLAN_SWEEPS);
        }
        Ok(error)
    }

    /// Run exactly `iters` value-iteration sweeps
    pub fn update_q(&mut self, iters: usize) -> usize {
        self.planner.plan(self.w.view(), iters)
    }
}

impl Agent for MbvR {
    fn base(&self) -> &BaseAgent {
        &self.base
    }

    fn sample_action(&mut self, state: usize) -> Result<usize> {
        self.base.check_state(state)?;
        self.base.sample_action(self.planner.q.column(state))
    }

    fn update_with(&mut self, experience: &Experience, _options: UpdateOptions) -> Result<f64> {
        self.update_t(experience)?;
        let error = self.update_w(experience)?.abs();
        self.update_q(1);
        trace!(w_error = error, "MBV_R update");
        self.base.record_update(error);
        Ok(error)
    }

    fn policy(&self) -> Array2<f64> {
        self.base.policy(self.planner.q.view())
    }

    fn q_values(&self) -> Array2<f64> {
        self.planner.q.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn mbv(states: usize, actions: usize) -> Mbv {
        Mbv::new(MbvConfig {
            base: AgentConfig {
                lr: 1.0,
                gamma: 0.5,
                ..AgentConfig::new(states, actions)
            },
            ..MbvConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_two_state_scenario() {
        let mut agent = mbv(2, 1);
        let exp = Experience::new(0, 0, 1, 5.0, false);
        assert!(agent.update_t(&exp).unwrap());
        assert_abs_diff_eq!(agent.update_w(&exp).unwrap(), 5.0);
        assert_eq!(agent.weights(), array![0.0, 5.0]);
        assert_eq!(agent.update_q(5), 2);
        assert_abs_diff_eq!(agent.q_values()[[0, 0]], 5.0);
        assert_abs_diff_eq!(agent.q_values()[[0, 1]], 0.0);
    }

    #[test]
    fn test_update_t_idempotent_until_model_changes() {
        let mut agent = mbv(3, 1);
        agent.update(&Experience::new(0, 0, 1, 1.0, false)).unwrap();
        let planned = agent.q_values();
        assert!(planned[[0, 0]] > 0.0);

        assert!(!agent.update_t(&Experience::new(0, 0, 1, 1.0, false)).unwrap());
        assert_eq!(agent.q_values(), planned);

        assert!(agent.update_t(&Experience::new(0, 0, 2, 1.0, false)).unwrap());
        assert!(agent.q_values().iter().all(|v| *v == 0.0));
        assert_eq!(agent.transitions().slice(s![0, 0, ..]), array![0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_sweeps_are_synchronous() {
        // chain 0 -> 1 -> 2 with reward on 2: one sweep reaches only state 1
        let mut agent = mbv(3, 1);
        agent.update_t(&Experience::new(0, 0, 1, 0.0, false)).unwrap();
        agent.update_t(&Experience::new(1, 0, 2, 0.0, false)).unwrap();
        agent.update_w(&Experience::new(1, 0, 2, 4.0, false)).unwrap();
        agent.update_q(1);
        assert_abs_diff_eq!(agent.q_values()[[0, 1]], 4.0);
        assert_abs_diff_eq!(agent.q_values()[[0, 0]], 0.0);
        agent.update_q(1);
        assert_abs_diff_eq!(agent.q_values()[[0, 0]], 2.0);
    }

    #[test]
    fn test_rejects_non_direct_weights() {
        let result = Mbv::new(MbvConfig {
            weights: WeightRule::Td,
            ..MbvConfig::default()
        });
        assert!(matches!(result, Err(RLError::InvalidConfig(_))));
    }

    #[test]
    fn test_mbv_r_plans_over_known_reward() {
        let mut agent = MbvR::new(MbvRConfig {
            base: AgentConfig {
                gamma: 0.5,
                ..AgentConfig::new(3, 1)
            },
            reward: array![0.0, 0.0, 4.0],
            ..MbvRConfig::default()
        })
        .unwrap();
        agent.update(&Experience::new(1, 0, 2, 0.0, false)).unwrap();
        let error = agent.update(&Experience::new(0, 0, 1, 0.0, false)).unwrap();
        assert_abs_diff_eq!(error, 0.0);
        assert_abs_diff_eq!(agent.q_values()[[0, 1]], 4.0);
        assert_abs_diff_eq!(agent.q_values()[[0, 0]], 2.0);
        assert_eq!(agent.weights(), array![0.0, 0.0, 4.0]);
    }

    #[test]
    fn test_mbv_r_replans_on_reward_surplus() {
        let mut agent = MbvR::new(MbvRConfig {
            base: AgentConfig {
                gamma: 0.5,
                ..AgentConfig::new(3, 1)
            },
            reward: array![0.0, 0.0, 4.0],
            ..MbvRConfig::default()
        })
        .unwrap();
        // record the chain without the replanning done by update_t
        agent.planner.record(0, 0, 1);
        agent.planner.record(1, 0, 2);
        assert!(agent.q_values().iter().all(|v| *v == 0.0));

        let error = agent.update_w(&Experience::new(1, 0, 2, 3.0, false)).unwrap();
        assert_abs_diff_eq!(error, -1.0);
        assert!(agent.q_values().iter().all(|v| *v == 0.0));

        let error = agent.update_w(&Experience::new(1, 0, 2, 5.0, false)).unwrap();
        assert_abs_diff_eq!(error, 1.0);
        assert_eq!(agent.q_values(), array![[2.0, 4.0, 0.0]]);
        assert_eq!(agent.weights(), array![0.0, 0.0, 4.0]);
    }

    #[test]
    fn test_mbv_r_reward_shape_checked() {
        let result = MbvR::new(MbvRConfig {
            base: AgentConfig::new(3, 1),
            reward: array![1.0, 2.0],
            ..MbvRConfig::default()
        });
        assert!(matches!(result, Err(RLError::ShapeMismatch { .. })));
    }
}
