//! Successor-representation learners
//!
//! `M[a, s, :]` estimates the discounted future occupancy of every state after
//! taking `a` in `s`. Action values for any reward-weight vector `w` are
//! recovered as `Q[a, s] = M[a, s, :] . w`, so reward learning and occupancy
//! learning proceed independently.
//!
//! Only the off-policy successor row is implemented: the row bootstrapped at
//! `s_1` is chosen from the current action values there, never from an
//! explicitly supplied next action.

use ndarray::{s, Array1, Array2, Array3, ArrayView1, ArrayView2, ArrayView3, Axis};
use serde::{Deserialize, Serialize};
use tabular_rl_core::numeric::{argmax, argmin, max, norm, onehot};
use tabular_rl_core::{
    check_unit_interval, Agent, AgentConfig, BaseAgent, Experience, Result, TableInit,
    UpdateOptions,
};
use tracing::trace;

use crate::bootstrap::{max_min, Bootstrap, QBootstrap};
use crate::weights::WeightRule;

/// Action values `[A, S]` of an SR tensor under reward weights
#[must_use]
pub fn sr_q_values(m: ArrayView3<f64>, w: ArrayView1<f64>) -> Array2<f64> {
    let (actions, states, _) = m.dim();
    let mut q = Array2::zeros((actions, states));
    for (a, m_a) in m.outer_iter().enumerate() {
        q.row_mut(a).assign(&m_a.dot(&w));
    }
    q
}

/// Collapse `M[a, s, s']` into `M[s, s']` weighting actions by `policy[s, a]`
#[must_use]
pub fn policy_weighted_states(m: ArrayView3<f64>, policy: ArrayView2<f64>) -> Array2<f64> {
    let (actions, states, _) = m.dim();
    let mut out = Array2::zeros((states, states));
    for s in 0..states {
        let mut row = out.row_mut(s);
        for a in 0..actions {
            row.scaled_add(policy[[s, a]], &m.slice(s![a, s, ..]));
        }
    }
    out
}

/// Successor tensor with its TD update
#[derive(Debug, Clone)]
struct SuccessorModel {
    m: Array3<f64>,
    goal_biased: bool,
}

impl SuccessorModel {
    fn m_estimate(&self, state: usize) -> ArrayView2<'_, f64> {
        self.m.index_axis(Axis(1), state)
    }

    fn q_estimate(&self, state: usize, w: &Array1<f64>) -> Array1<f64> {
        self.m_estimate(state).dot(w)
    }

    /// TD error of the row `M[a, s, :]`, committed unless `prospective`
    ///
    /// The bootstrapped row at `s_1` blends the rows of the best and worst
    /// actions under `q_next` by `w_value` when goal-biased, otherwise it is the
    /// mean row over actions.
    fn td_update(
        &mut self,
        experience: &Experience,
        q_next: ArrayView1<f64>,
        w_value: f64,
        gamma: f64,
        lr: f64,
        prospective: bool,
    ) -> Array1<f64> {
        let (s, a, s_1) = (experience.state, experience.action, experience.next_state);
        let states = self.m.dim().1;
        let next_m = if experience.done {
            onehot(s_1, states)
        } else if self.goal_biased {
            let optimistic = self.m.slice(s![argmax(q_next), s_1, ..]);
            let pessimistic = self.m.slice(s![argmin(q_next), s_1, ..]);
            &optimistic * w_value + &pessimistic * (1.0 - w_value)
        } else {
            self.m_estimate(s_1).sum_axis(Axis(0)) / self.m.dim().0 as f64
        };
        let m_error = onehot(s, states) + next_m * gamma - self.m.slice(s![a, s, ..]);
        if !prospective {
            self.m.slice_mut(s![a, s, ..]).scaled_add(lr, &m_error);
        }
        m_error
    }

    /// Q-style TD error of an experience whose indices are already validated
    fn q_error(
        &self,
        w: &Array1<f64>,
        bootstrap: &QBootstrap,
        experience: &Experience,
    ) -> Result<f64> {
        let q_s = self.q_estimate(experience.state, w);
        let q_s_1 = self.q_estimate(experience.next_state, w);
        bootstrap.q_error(q_s.view(), q_s_1.view(), experience)
    }
}

/// Configuration for [`Tdsr`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TdsrConfig {
    /// Base agent configuration
    #[serde(flatten)]
    pub base: AgentConfig,
    /// Initial successor tensor
    pub m_init: TableInit<Array3<f64>>,
    /// Reward-weight learning rule: direct, td or max-min
    pub weights: WeightRule,
    /// Blend best and worst successor rows instead of averaging them
    pub goal_biased_sr: bool,
    /// Bootstrap used for the reported TD error
    pub bootstrap: Bootstrap,
    /// Optimism weight
    pub w_value: f64,
}

impl Default for TdsrConfig {
    fn default() -> Self {
        Self {
            base: AgentConfig::default(),
            m_init: TableInit::Default,
            weights: WeightRule::Direct,
            goal_biased_sr: true,
            bootstrap: Bootstrap::MaxMin,
            w_value: 1.0,
        }
    }
}

/// TD successor-representation agent
#[derive(Debug, Clone)]
pub struct Tdsr {
    base: BaseAgent,
    bootstrap: QBootstrap,
    sr: SuccessorModel,
    w: Array1<f64>,
    weights: WeightRule,
}

impl Tdsr {
    /// Create a new TDSR agent
    pub fn new(config: TdsrConfig) -> Result<Self> {
        let weights = config.weights.ensure_supported(
            &[WeightRule::Direct, WeightRule::Td, WeightRule::MaxMin],
            "TDSR",
        )?;
        let mut base = BaseAgent::new(config.base)?;
        let bootstrap =
            QBootstrap::new(config.bootstrap, base.gamma(), base.beta(), config.w_value)?;
        let (actions, states) = (base.action_size(), base.state_size());
        let m = config.m_init.resolve_m(actions, states, base.rng())?;
        Ok(Self {
            base,
            bootstrap,
            sr: SuccessorModel {
                m,
                goal_biased: config.goal_biased_sr,
            },
            w: Array1::zeros(states),
            weights,
        })
    }

    /// Successor tensor, `[actions, states, states]`
    #[must_use]
    pub fn m(&self) -> ArrayView3<'_, f64> {
        self.sr.m.view()
    }

    /// Reward weights, `[states]`
    #[must_use]
    pub fn w(&self) -> ArrayView1<'_, f64> {
        self.w.view()
    }

    /// Successor rows of a state, `[actions, states]`
    pub fn m_estimate(&self, state: usize) -> Result<ArrayView2<'_, f64>> {
        self.base.check_state(state)?;
        Ok(self.sr.m_estimate(state))
    }

    /// Action values of a state
    pub fn q_estimate(&self, state: usize) -> Result<Array1<f64>> {
        self.base.check_state(state)?;
        Ok(self.sr.q_estimate(state, &self.w))
    }

    /// Update the successor row of the experienced state-action pair
    pub fn update_sr(&mut self, experience: &Experience, prospective: bool) -> Result<Array1<f64>> {
        self.base.check_experience(experience)?;
        Ok(self.sr_step(experience, prospective))
    }

    /// Update the reward weights; returns the norm of the weight error
    pub fn update_w(&mut self, experience: &Experience) -> Result<f64> {
        self.base.check_experience(experience)?;
        Ok(self.w_step(experience))
    }

    /// TD error of an experience under the current SR and weights
    pub fn q_error(&self, experience: &Experience) -> Result<f64> {
        self.base.check_experience(experience)?;
        self.sr.q_error(&self.w, &self.bootstrap, experience)
    }

    fn sr_step(&mut self, experience: &Experience, prospective: bool) -> Array1<f64> {
        let q_next = self.sr.q_estimate(experience.next_state, &self.w);
        self.sr.td_update(
            experience,
            q_next.view(),
            self.bootstrap.w_value,
            self.base.gamma(),
            self.base.lr(),
            prospective,
        )
    }

    fn w_step(&mut self, experience: &Experience) -> f64 {
        let (s, a, s_1, r) = (
            experience.state,
            experience.action,
            experience.next_state,
            experience.reward,
        );
        let (lr, gamma) = (self.base.lr(), self.base.gamma());
        match self.weights {
            WeightRule::Td | WeightRule::MaxMin => {
                let q_s = self.sr.q_estimate(s, &self.w);
                let q_s_1 = self.sr.q_estimate(s_1, &self.w);
                let delta = if self.weights == WeightRule::Td {
                    r + gamma * max(q_s_1.view()) - max(q_s.view())
                } else {
                    r + gamma * max_min(q_s_1.view(), self.bootstrap.w_value) - q_s[a]
                };
                let error = self.get_m_states().row(s).to_owned() * delta;
                self.w.scaled_add(lr, &error);
                norm(error.view())
            }
            _ => {
                let error = r - self.w[s_1];
                self.w[s_1] += lr * error;
                error.abs()
            }
        }
    }

    /// Successor matrix over states, averaging actions under the current policy
    #[must_use]
    pub fn get_m_states(&self) -> Array2<f64> {
        policy_weighted_states(self.sr.m.view(), self.policy().view())
    }

    /// Policy under an alternative SR tensor and/or reward vector
    ///
    /// Stored tables are left untouched.
    #[must_use]
    pub fn policy_with<'a>(
        &'a self,
        m: Option<ArrayView3<'a, f64>>,
        goal: Option<ArrayView1<'a, f64>>,
    ) -> Array2<f64> {
        let m = m.unwrap_or_else(|| self.sr.m.view());
        let goal = goal.unwrap_or_else(|| self.w.view());
        self.base.policy(sr_q_values(m, goal).view())
    }
}

impl Agent for Tdsr {
    fn base(&self) -> &BaseAgent {
        &self.base
    }

    fn sample_action(&mut self, state: usize) -> Result<usize> {
        let logits = self.q_estimate(state)?;
        self.base.sample_action(logits.view())
    }

    fn update_with(&mut self, experience: &Experience, options: UpdateOptions) -> Result<f64> {
        self.base.check_experience(experience)?;
        self.bootstrap.check(experience.next_action)?;
        let m_error = self.sr_step(experience, options.prospective);
        let w_error = self.w_step(experience);
        let q_error = self.sr.q_error(&self.w, &self.bootstrap, experience)?;
        trace!(
            m_error = norm(m_error.view()),
            w_error,
            q_error,
            "TDSR update"
        );
        self.base.record_update(q_error);
        Ok(q_error)
    }

    fn policy(&self) -> Array2<f64> {
        self.policy_with(None, None)
    }

    fn q_values(&self) -> Array2<f64> {
        sr_q_values(self.sr.m.view(), self.w.view())
    }
}

/// Configuration for [`TdsrRp`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TdsrRpConfig {
    /// Base agent configuration
    #[serde(flatten)]
    pub base: AgentConfig,
    /// Initial successor tensor
    pub m_init: TableInit<Array3<f64>>,
    /// Reward-weight learning rule: rew_pun or direct
    pub weights: WeightRule,
    /// Use the greedy successor row instead of averaging rows
    pub goal_biased_sr: bool,
    /// Bootstrap used for the reported TD error
    pub bootstrap: Bootstrap,
    /// Learning rate for punishments
    pub lr_p: f64,
}

impl Default for TdsrRpConfig {
    fn default() -> Self {
        Self {
            base: AgentConfig::default(),
            m_init: TableInit::Default,
            weights: WeightRule::RewPun,
            goal_biased_sr: true,
            bootstrap: Bootstrap::MaxMin,
            lr_p: 1e-1,
        }
    }
}

/// TD successor-representation agent with separate reward and punishment weights
#[derive(Debug, Clone)]
pub struct TdsrRp {
    base: BaseAgent,
    bootstrap: QBootstrap,
    sr: SuccessorModel,
    /// Average of non-negative rewards per state
    w_r: Array1<f64>,
    /// Average of negative rewards per state
    w_p: Array1<f64>,
    w: Array1<f64>,
    weights: WeightRule,
    lr_p: f64,
}

impl TdsrRp {
    /// Create a new TDSR_RP agent
    pub fn new(config: TdsrRpConfig) -> Result<Self> {
        let weights = config
            .weights
            .ensure_supported(&[WeightRule::RewPun, WeightRule::Direct], "TDSR_RP")?;
        check_unit_interval("lr_p", config.lr_p)?;
        let mut base = BaseAgent::new(config.base)?;
        let bootstrap = QBootstrap::new(config.bootstrap, base.gamma(), base.beta(), 1.0)?;
        let (actions, states) = (base.action_size(), base.state_size());
        let m = config.m_init.resolve_m(actions, states, base.rng())?;
        Ok(Self {
            base,
            bootstrap,
            sr: SuccessorModel {
                m,
                goal_biased: config.goal_biased_sr,
            },
            w_r: Array1::zeros(states),
            w_p: Array1::zeros(states),
            w: Array1::zeros(states),
            weights,
            lr_p: config.lr_p,
        })
    }

    /// Successor tensor, `[actions, states, states]`
    #[must_use]
    pub fn m(&self) -> ArrayView3<'_, f64> {
        self.sr.m.view()
    }

    /// Combined reward weights
    #[must_use]
    pub fn w(&self) -> ArrayView1<'_, f64> {
        self.w.view()
    }

    /// Reward part of the weights
    #[must_use]
    pub fn w_r(&self) -> ArrayView1<'_, f64> {
        self.w_r.view()
    }

    /// Punishment part of the weights
    #[must_use]
    pub fn w_p(&self) -> ArrayView1<'_, f64> {
        self.w_p.view()
    }

    /// Successor rows of a state, `[actions, states]`
    pub fn m_estimate(&self, state: usize) -> Result<ArrayView2<'_, f64>> {
        self.base.check_state(state)?;
        Ok(self.sr.m_estimate(state))
    }

    /// Action values of a state
    pub fn q_estimate(&self, state: usize) -> Result<Array1<f64>> {
        self.base.check_state(state)?;
        Ok(self.sr.q_estimate(state, &self.w))
    }

    /// Update the successor row toward the greedy successor row
    pub fn update_sr(&mut self, experience: &Experience, prospective: bool) -> Result<Array1<f64>> {
        self.base.check_experience(experience)?;
        Ok(self.sr_step(experience, prospective))
    }

    /// Update the reward weights; returns the absolute weight error
    pub fn update_w(&mut self, experience: &Experience) -> Result<f64> {
        self.base.check_experience(experience)?;
        Ok(self.w_step(experience))
    }

    /// TD error of an experience under the current SR and weights
    pub fn q_error(&self, experience: &Experience) -> Result<f64> {
        self.base.check_experience(experience)?;
        self.sr.q_error(&self.w, &self.bootstrap, experience)
    }

    fn sr_step(&mut self, experience: &Experience, prospective: bool) -> Array1<f64> {
        let q_next = self.sr.q_estimate(experience.next_state, &self.w);
        self.sr.td_update(
            experience,
            q_next.view(),
            1.0,
            self.base.gamma(),
            self.base.lr(),
            prospective,
        )
    }

    fn w_step(&mut self, experience: &Experience) -> f64 {
        let (s_1, r) = (experience.next_state, experience.reward);
        let error = match self.weights {
            WeightRule::RewPun => {
                let error = if r >= 0.0 {
                    let error = r - self.w_r[s_1];
                    self.w_r[s_1] += self.base.lr() * error;
                    error
                } else {
                    let error = r - self.w_p[s_1];
                    self.w_p[s_1] += self.lr_p * error;
                    error
                };
                self.w[s_1] = self.w_r[s_1] + self.w_p[s_1];
                error
            }
            _ => {
                let error = r - self.w[s_1];
                self.w[s_1] += self.base.lr() * error;
                error
            }
        };
        error.abs()
    }

    /// Successor matrix over states, averaging actions under the current policy
    #[must_use]
    pub fn get_m_states(&self) -> Array2<f64> {
        policy_weighted_states(self.sr.m.view(), self.policy().view())
    }

    /// Policy under an alternative SR tensor and/or reward vector
    #[must_use]
    pub fn policy_with<'a>(
        &'a self,
        m: Option<ArrayView3<'a, f64>>,
        goal: Option<ArrayView1<'a, f64>>,
    ) -> Array2<f64> {
        let m = m.unwrap_or_else(|| self.sr.m.view());
        let goal = goal.unwrap_or_else(|| self.w.view());
        self.base.policy(sr_q_values(m, goal).view())
    }
}

impl Agent for TdsrRp {
    fn base(&self) -> &BaseAgent {
        &self.base
    }

    fn sample_action(&mut self, state: usize) -> Result<usize> {
        let logits = self.q_estimate(state)?;
        self.base.sample_action(logits.view())
    }

    fn update_with(&mut self, experience: &Experience, options: UpdateOptions) -> Result<f64> {
        self.base.check_experience(experience)?;
        self.bootstrap.check(experience.next_action)?;
        self.sr_step(experience, options.prospective);
        let w_error = self.w_step(experience);
        let q_error = self.sr.q_error(&self.w, &self.bootstrap, experience)?;
        trace!(w_error, q_error, reward = experience.reward, "TDSR_RP update");
        self.base.record_update(q_error);
        Ok(q_error)
    }

    fn policy(&self) -> Array2<f64> {
        self.policy_with(None, None)
    }

    fn q_values(&self) -> Array2<f64> {
        sr_q_values(self.sr.m.view(), self.w.view())
    }
}
