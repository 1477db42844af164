//! One-step TD actor-critic
//!
//! The critic holds state values; the actor holds per-state action logits.
//! Both are moved by the same critic TD error.

use ndarray::{Array1, Array2, ArrayView1};
use tabular_rl_core::{Agent, AgentConfig, BaseAgent, Experience, Result, UpdateOptions};
use tracing::trace;

/// Tabular actor-critic agent
#[derive(Debug, Clone)]
pub struct Tdac {
    base: BaseAgent,
    /// Critic state values, `[states]`
    c_w: Array1<f64>,
    /// Actor logits, `[states, actions]`
    a_w: Array2<f64>,
}

impl Tdac {
    /// Create a new actor-critic agent
    pub fn new(config: AgentConfig) -> Result<Self> {
        let base = BaseAgent::new(config)?;
        let (states, actions) = (base.state_size(), base.action_size());
        Ok(Self {
            base,
            c_w: Array1::zeros(states),
            a_w: Array2::zeros((states, actions)),
        })
    }

    /// Critic value of a state
    pub fn critic(&self, state: usize) -> Result<f64> {
        self.base.check_state(state)?;
        Ok(self.c_w[state])
    }

    /// Actor logits of a state
    pub fn actor(&self, state: usize) -> Result<ArrayView1<'_, f64>> {
        self.base.check_state(state)?;
        Ok(self.a_w.row(state))
    }

    /// Critic TD error of an experience
    pub fn v_error(&self, experience: &Experience) -> Result<f64> {
        self.base.check_experience(experience)?;
        let target = if experience.done {
            experience.reward
        } else {
            experience.reward + self.base.gamma() * self.c_w[experience.next_state]
        };
        Ok(target - self.c_w[experience.state])
    }
}

impl Agent for Tdac {
    fn base(&self) -> &BaseAgent {
        &self.base
    }

    fn sample_action(&mut self, state: usize) -> Result<usize> {
        self.base.check_state(state)?;
        self.base.sample_action(self.a_w.row(state))
    }

    fn update_with(&mut self, experience: &Experience, _options: UpdateOptions) -> Result<f64> {
        let td_error = self.v_error(experience)?;
        let step = self.base.lr() * td_error;
        self.c_w[experience.state] += step;
        self.a_w[[experience.state, experience.action]] += step;
        trace!(state = experience.state, td_error, "TDAC update");
        self.base.record_update(td_error);
        Ok(td_error)
    }

    fn policy(&self) -> Array2<f64> {
        self.base.policy(self.a_w.t())
    }

    fn q_values(&self) -> Array2<f64> {
        self.a_w.t().to_owned()
    }
}
