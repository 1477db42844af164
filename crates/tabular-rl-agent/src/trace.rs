//! Q-learning with accumulating eligibility traces

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use tabular_rl_core::numeric::argmax;
use tabular_rl_core::{
    check_unit_interval, Agent, AgentConfig, BaseAgent, Experience, Result, TableInit,
    UpdateOptions,
};
use tracing::{debug, trace};

/// Configuration for [`Qet`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QetConfig {
    /// Base agent configuration
    #[serde(flatten)]
    pub base: AgentConfig,
    /// Initial action values
    pub q_init: TableInit<Array2<f64>>,
    /// Trace decay
    pub lamb: f64,
}

impl Default for QetConfig {
    fn default() -> Self {
        Self {
            base: AgentConfig::default(),
            q_init: TableInit::Default,
            lamb: 0.95,
        }
    }
}

/// Q-learning agent spreading each TD error along an eligibility trace
#[derive(Debug, Clone)]
pub struct Qet {
    base: BaseAgent,
    q: Array2<f64>,
    /// Eligibility of each `[action, state]` cell
    et: Array2<f64>,
    lamb: f64,
}

impl Qet {
    /// Create a new QET agent
    pub fn new(config: QetConfig) -> Result<Self> {
        check_unit_interval("lamb", config.lamb)?;
        let mut base = BaseAgent::new(config.base)?;
        let (actions, states) = (base.action_size(), base.state_size());
        let q = config.q_init.resolve_q(actions, states, base.rng())?;
        Ok(Self {
            base,
            q,
            et: Array2::zeros((actions, states)),
            lamb: config.lamb,
        })
    }

    /// Current eligibility traces, `[actions, states]`
    #[must_use]
    pub fn traces(&self) -> ArrayView2<'_, f64> {
        self.et.view()
    }

    /// Mark the visited cell, apply the greedy TD error everywhere, decay traces
    pub fn update_et(&mut self, experience: &Experience) -> Result<f64> {
        self.base.check_experience(experience)?;
        let (s, a, s_1) = (experience.state, experience.action, experience.next_state);
        let a_1 = argmax(self.q.column(s_1));

        self.et[[a, s]] += 1.0;
        let target = if experience.done {
            experience.reward
        } else {
            experience.reward + self.base.gamma() * self.q[[a_1, s_1]]
        };
        let td_error = target - self.q[[a, s]];
        self.q.scaled_add(self.base.lr() * td_error, &self.et);
        self.et *= self.lamb * self.base.gamma();
        Ok(td_error)
    }
}

impl Agent for Qet {
    fn base(&self) -> &BaseAgent {
        &self.base
    }

    fn sample_action(&mut self, state: usize) -> Result<usize> {
        self.base.check_state(state)?;
        self.base.sample_action(self.q.column(state))
    }

    fn update_with(&mut self, experience: &Experience, _options: UpdateOptions) -> Result<f64> {
        let error = self.update_et(experience)?.abs();
        trace!(error, "QET update");
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
        debug!("clearing eligibility traces");
        self.et.fill(0.0);
    }
}
