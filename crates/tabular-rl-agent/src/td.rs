//! One-step temporal-difference Q-learning
//!
//! [`Tdq`] applies `Q[a, s] += lr * error` for every experience.
//! [`TdqRpl`] does the same with a separate learning rate for punishments
//! (negative rewards).

use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use tabular_rl_core::numeric::softmax;
use tabular_rl_core::{
    check_unit_interval, Agent, AgentConfig, BaseAgent, Experience, PolicyType, Result,
    TableInit, UpdateOptions,
};
use tracing::trace;

use crate::bootstrap::{Bootstrap, QBootstrap};

/// Action-value table with the bootstrap strategy that reads it
#[derive(Debug, Clone)]
pub(crate) struct QCore {
    pub(crate) base: BaseAgent,
    pub(crate) bootstrap: QBootstrap,
    /// Action values, `[actions, states]`
    pub(crate) q: Array2<f64>,
}

impl QCore {
    pub(crate) fn new(
        config: AgentConfig,
        mode: Bootstrap,
        w_value: f64,
        init: &TableInit<Array2<f64>>,
    ) -> Result<Self> {
        let mut base = BaseAgent::new(config)?;
        let bootstrap = QBootstrap::new(mode, base.gamma(), base.beta(), w_value)?;
        let (actions, states) = (base.action_size(), base.state_size());
        let q = init.resolve_q(actions, states, base.rng())?;
        Ok(Self { base, bootstrap, q })
    }

    pub(crate) fn q_estimate(&self, state: usize) -> Result<ArrayView1<'_, f64>> {
        self.base.check_state(state)?;
        Ok(self.q.column(state))
    }

    /// Softmax-weighted value of a state
    pub(crate) fn v_estimate(&self, state: usize) -> Result<f64> {
        let q = self.q_estimate(state)?;
        let probs = softmax(q.mapv(|v| v * self.base.beta()).view());
        Ok(q.dot(&probs))
    }

    /// Validated TD error of an experience; mutates nothing
    pub(crate) fn q_error(&self, experience: &Experience) -> Result<f64> {
        self.base.check_experience(experience)?;
        self.bootstrap.q_error(
            self.q.column(experience.state),
            self.q.column(experience.next_state),
            experience,
        )
    }

    pub(crate) fn sample_action(&mut self, state: usize) -> Result<usize> {
        self.base.check_state(state)?;
        self.base.sample_action(self.q.column(state))
    }

    pub(crate) fn policy(&self) -> Array2<f64> {
        self.base.policy(self.q.view())
    }
}

/// Configuration for [`Tdq`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TdqConfig {
    /// Base agent configuration
    #[serde(flatten)]
    pub base: AgentConfig,
    /// Successor-state bootstrap
    pub bootstrap: Bootstrap,
    /// Optimism weight for the max-min bootstrap
    pub w_value: f64,
    /// Initial action values
    pub q_init: TableInit<Array2<f64>>,
}

impl Default for TdqConfig {
    fn default() -> Self {
        Self {
            base: AgentConfig::default(),
            bootstrap: Bootstrap::Softmax,
            w_value: 1.0,
            q_init: TableInit::Default,
        }
    }
}

/// One-step TD Q-learning agent
#[derive(Debug, Clone)]
pub struct Tdq {
    core: QCore,
}

impl Tdq {
    /// Create a new TDQ agent
    pub fn new(config: TdqConfig) -> Result<Self> {
        let core = QCore::new(config.base, config.bootstrap, config.w_value, &config.q_init)?;
        Ok(Self { core })
    }

    /// Action values of a state
    pub fn q_estimate(&self, state: usize) -> Result<ArrayView1<'_, f64>> {
        self.core.q_estimate(state)
    }

    /// Softmax-weighted value of a state
    pub fn v_estimate(&self, state: usize) -> Result<f64> {
        self.core.v_estimate(state)
    }

    /// TD error of an experience under the current table
    pub fn q_error(&self, experience: &Experience) -> Result<f64> {
        self.core.q_error(experience)
    }

    /// Apply the TD update unless `prospective`; returns the TD error
    pub fn update_q(&mut self, experience: &Experience, prospective: bool) -> Result<f64> {
        let error = self.core.q_error(experience)?;
        if !prospective {
            let lr = self.core.base.lr();
            self.core.q[[experience.action, experience.state]] += lr * error;
        }
        Ok(error)
    }
}

impl Agent for Tdq {
    fn base(&self) -> &BaseAgent {
        &self.core.base
    }

    fn sample_action(&mut self, state: usize) -> Result<usize> {
        self.core.sample_action(state)
    }

    fn update_with(&mut self, experience: &Experience, options: UpdateOptions) -> Result<f64> {
        let error = self.update_q(experience, options.prospective)?;
        trace!(
            state = experience.state,
            action = experience.action,
            error,
            prospective = options.prospective,
            "TDQ update"
        );
        self.core.base.record_update(error);
        Ok(error)
    }

    fn policy(&self) -> Array2<f64> {
        self.core.policy()
    }

    fn q_values(&self) -> Array2<f64> {
        self.core.q.clone()
    }
}

/// Configuration for [`TdqRpl`]
///
/// The action-selection rule defaults to `s_lapse` here, whether the config is
/// built in code or deserialized without a `poltype` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TdqRplConfigRepr")]
pub struct TdqRplConfig {
    /// Base agent configuration
    #[serde(flatten)]
    pub base: AgentConfig,
    /// Successor-state bootstrap
    pub bootstrap: Bootstrap,
    /// Optimism weight for the max-min bootstrap
    pub w_value: f64,
    /// Initial action values
    pub q_init: TableInit<Array2<f64>>,
    /// Learning rate for negative rewards
    pub lr_p: f64,
}

impl Default for TdqRplConfig {
    fn default() -> Self {
        Self {
            base: AgentConfig {
                poltype: PolicyType::Lapse,
                ..AgentConfig::default()
            },
            bootstrap: Bootstrap::Softmax,
            w_value: 1.0,
            q_init: TableInit::Default,
            lr_p: 0.0,
        }
    }
}

/// Wire form of [`TdqRplConfig`]; claims `poltype` before the flattened base
/// can fall back to the shared default
#[derive(Deserialize)]
#[serde(default)]
struct TdqRplConfigRepr {
    #[serde(flatten)]
    base: AgentConfig,
    poltype: Option<PolicyType>,
    bootstrap: Bootstrap,
    w_value: f64,
    q_init: TableInit<Array2<f64>>,
    lr_p: f64,
}

impl Default for TdqRplConfigRepr {
    fn default() -> Self {
        let config = TdqRplConfig::default();
        Self {
            base: config.base,
            poltype: None,
            bootstrap: config.bootstrap,
            w_value: config.w_value,
            q_init: config.q_init,
            lr_p: config.lr_p,
        }
    }
}

impl From<TdqRplConfigRepr> for TdqRplConfig {
    fn from(repr: TdqRplConfigRepr) -> Self {
        Self {
            base: AgentConfig {
                poltype: repr.poltype.unwrap_or(PolicyType::Lapse),
                ..repr.base
            },
            bootstrap: repr.bootstrap,
            w_value: repr.w_value,
            q_init: repr.q_init,
            lr_p: repr.lr_p,
        }
    }
}

/// TD Q-learning with separate reward and punishment learning rates
#[derive(Debug, Clone)]
pub struct TdqRpl {
    core: QCore,
    lr_p: f64,
}

impl TdqRpl {
    /// Create a new TDQ_RPL agent
    pub fn new(config: TdqRplConfig) -> Result<Self> {
        check_unit_interval("lr_p", config.lr_p)?;
        let core = QCore::new(config.base, config.bootstrap, config.w_value, &config.q_init)?;
        Ok(Self {
            core,
            lr_p: config.lr_p,
        })
    }

    /// Learning rate applied to negative rewards
    #[must_use]
    pub fn lr_p(&self) -> f64 {
        self.lr_p
    }

    /// Action values of a state
    pub fn q_estimate(&self, state: usize) -> Result<ArrayView1<'_, f64>> {
        self.core.q_estimate(state)
    }

    /// Softmax-weighted value of a state
    pub fn v_estimate(&self, state: usize) -> Result<f64> {
        self.core.v_estimate(state)
    }

    /// TD error of an experience under the current table
    pub fn q_error(&self, experience: &Experience) -> Result<f64> {
        self.core.q_error(experience)
    }

    /// Apply the TD update unless `prospective`; returns the TD error
    pub fn update_q(&mut self, experience: &Experience, prospective: bool) -> Result<f64> {
        let error = self.core.q_error(experience)?;
        if !prospective {
            let lr = if experience.reward >= 0.0 {
                self.core.base.lr()
            } else {
                self.lr_p
            };
            self.core.q[[experience.action, experience.state]] += lr * error;
        }
        Ok(error)
    }
}

impl Agent for TdqRpl {
    fn base(&self) -> &BaseAgent {
        &self.core.base
    }

    fn sample_action(&mut self, state: usize) -> Result<usize> {
        self.core.sample_action(state)
    }

    fn update_with(&mut self, experience: &Experience, options: UpdateOptions) -> Result<f64> {
        let error = self.update_q(experience, options.prospective)?;
        trace!(
            state = experience.state,
            action = experience.action,
            reward = experience.reward,
            error,
            "TDQ_RPL update"
        );
        self.core.base.record_update(error);
        Ok(error)
    }

    fn policy(&self) -> Array2<f64> {
        self.core.policy()
    }

    fn q_values(&self) -> Array2<f64> {
        self.core.q.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use tabular_rl_core::RLError;

    fn tdq(bootstrap: Bootstrap) -> Tdq {
        Tdq::new(TdqConfig {
            base: AgentConfig {
                lr: 1.0,
                gamma: 0.9,
                ..AgentConfig::new(3, 2)
            },
            bootstrap,
            ..TdqConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_mean_bootstrap_scenario() {
        let mut agent = tdq(Bootstrap::Mean);
        let error = agent.update(&Experience::new(0, 1, 1, 1.0, false)).unwrap();
        assert_abs_diff_eq!(error, 1.0);
        let q = agent.q_values();
        assert_abs_diff_eq!(q[[1, 0]], 1.0);
        assert_abs_diff_eq!(q.sum(), 1.0);
    }

    #[test]
    fn test_prospective_update_leaves_table() {
        let mut agent = tdq(Bootstrap::MaxMin);
        let exp = Experience::new(2, 0, 1, 3.0, false);
        let error = agent.update_with(&exp, UpdateOptions::prospective()).unwrap();
        assert_abs_diff_eq!(error, 3.0);
        assert!(agent.q_values().iter().all(|v| *v == 0.0));
        assert_eq!(agent.metrics().total_updates, 1);
    }

    #[test]
    fn test_next_action_bootstrap_without_action_fails_cleanly() {
        let mut agent = tdq(Bootstrap::NextAction);
        let exp = Experience::new(0, 0, 1, 1.0, false);
        assert!(matches!(agent.update(&exp), Err(RLError::InvalidBootstrap)));
        assert!(agent.q_values().iter().all(|v| *v == 0.0));

        let exp = exp.with_next_action(1);
        assert_abs_diff_eq!(agent.update(&exp).unwrap(), 1.0);
    }

    #[test]
    fn test_v_estimate_of_zero_table() {
        let agent = tdq(Bootstrap::Softmax);
        assert_abs_diff_eq!(agent.v_estimate(1).unwrap(), 0.0);
        assert!(agent.v_estimate(3).is_err());
    }

    #[test]
    fn test_snapshot_is_independent() {
        let agent = tdq(Bootstrap::Mean);
        let mut snapshot = agent.q_values();
        snapshot.fill(100.0);
        assert!(agent.q_values().iter().all(|v| *v == 0.0));
        let policy = agent.policy();
        assert_abs_diff_eq!(policy[[0, 0]], 0.5);
    }

    #[test]
    fn test_rpl_ignores_punishment_without_lr_p() {
        let mut agent = TdqRpl::new(TdqRplConfig {
            base: AgentConfig::new(2, 2),
            ..TdqRplConfig::default()
        })
        .unwrap();
        for _ in 0..5 {
            agent.update(&Experience::new(0, 1, 1, -1.0, false)).unwrap();
        }
        assert!(agent.q_values().iter().all(|v| *v == 0.0));
        agent.update(&Experience::new(0, 1, 1, 1.0, true)).unwrap();
        assert_abs_diff_eq!(agent.q_values()[[1, 0]], 0.1);
    }

    #[test]
    fn test_rpl_json_defaults_to_lapse() {
        let config: TdqRplConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.base.poltype, PolicyType::Lapse);
        assert_eq!(config, TdqRplConfig::default());

        let config: TdqRplConfig =
            serde_json::from_str(r#"{"state_size": 3, "poltype": "softmax", "lr_p": 0.2}"#)
                .unwrap();
        assert_eq!(config.base.poltype, PolicyType::Softmax);
        assert_eq!(config.base.state_size, 3);
        assert_abs_diff_eq!(config.lr_p, 0.2);
    }

    #[test]
    fn test_rpl_config_survives_json_round_trip() {
        let config = TdqRplConfig {
            base: AgentConfig {
                poltype: PolicyType::EpsilonGreedy,
                ..AgentConfig::new(4, 2)
            },
            lr_p: 0.3,
            ..TdqRplConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: TdqRplConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_rpl_q_error_matches_tdq() {
        let exp = Experience::new(2, 1, 0, -2.0, false);
        let tdq = tdq(Bootstrap::Softmax);
        let rpl = TdqRpl::new(TdqRplConfig {
            base: AgentConfig {
                lr: 1.0,
                gamma: 0.9,
                ..AgentConfig::new(3, 2)
            },
            ..TdqRplConfig::default()
        })
        .unwrap();
        assert_abs_diff_eq!(rpl.q_error(&exp).unwrap(), tdq.q_error(&exp).unwrap());
        assert_abs_diff_eq!(rpl.q_error(&exp).unwrap(), -2.0);
        assert!(rpl.q_error(&Experience::new(0, 2, 0, 0.0, false)).is_err());
    }
}
