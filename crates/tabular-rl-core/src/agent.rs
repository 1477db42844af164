//! Agent traits and types

use ndarray::{Array2, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::space::DiscreteSpace;
use crate::{ActionSampler, Experience, PolicyType, RLError, Result};

/// Configuration shared by every agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Number of states
    pub state_size: usize,
    /// Number of actions
    pub action_size: usize,
    /// Learning rate
    pub lr: f64,
    /// Discount factor
    pub gamma: f64,
    /// Action-selection rule
    pub poltype: PolicyType,
    /// Softmax inverse temperature
    pub beta: f64,
    /// Exploration rate for epsilon-greedy selection
    pub epsilon: f64,
    /// Lapse probability for `s_lapse` selection
    pub lapse: f64,
    /// Random seed; entropy-seeded when absent
    pub seed: Option<u64>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            state_size: 1,
            action_size: 1,
            lr: 1e-1,
            gamma: 0.99,
            poltype: PolicyType::Softmax,
            beta: 1e4,
            epsilon: 1e-1,
            lapse: 0.0,
            seed: None,
        }
    }
}

impl AgentConfig {
    /// Default configuration for the given space sizes
    #[must_use]
    pub fn new(state_size: usize, action_size: usize) -> Self {
        Self {
            state_size,
            action_size,
            ..Self::default()
        }
    }

    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check sizes and hyperparameter ranges
    pub fn validate(&self) -> Result<()> {
        if self.state_size == 0 || self.action_size == 0 {
            return Err(RLError::InvalidConfig(format!(
                "state_size and action_size must be positive, got {} and {}",
                self.state_size, self.action_size
            )));
        }
        check_unit_interval("lr", self.lr)?;
        check_unit_interval("gamma", self.gamma)?;
        check_unit_interval("epsilon", self.epsilon)?;
        check_unit_interval("lapse", self.lapse)?;
        if !self.beta.is_finite() || self.beta < 0.0 {
            return Err(RLError::InvalidConfig(format!(
                "beta must be finite and non-negative, got {}",
                self.beta
            )));
        }
        Ok(())
    }

    /// Action sampler described by this configuration
    #[must_use]
    pub fn sampler(&self) -> ActionSampler {
        ActionSampler::new(self.poltype, self.beta, self.epsilon, self.lapse)
    }
}

/// Reject values outside `[0, 1]`
pub fn check_unit_interval(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(RLError::InvalidConfig(format!(
            "{name} must lie in [0, 1], got {value}"
        )))
    }
}

/// Per-call update options
///
/// `prospective` is honoured by learners whose update is a single table
/// backup (TD Q-learning and its variants, and the successor rows of SR
/// learners). Trace, buffered and model-based learners ignore it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Compute errors without committing table changes
    pub prospective: bool,
}

impl UpdateOptions {
    /// Options for a look-ahead update that mutates nothing it can avoid
    #[must_use]
    pub fn prospective() -> Self {
        Self { prospective: true }
    }
}

/// Agent metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentMetrics {
    /// Number of updates applied
    pub total_updates: usize,
    /// Error metric returned by the latest update
    pub last_error: Option<f64>,
}

/// Capabilities every tabular learner provides
pub trait Agent {
    /// Shared agent state
    fn base(&self) -> &BaseAgent;

    /// Number of states
    fn state_size(&self) -> usize {
        self.base().state_size()
    }

    /// Number of actions
    fn action_size(&self) -> usize {
        self.base().action_size()
    }

    /// Select an action in a state
    fn sample_action(&mut self, state: usize) -> Result<usize>;

    /// Learn from one experience and return the update's error metric
    fn update(&mut self, experience: &Experience) -> Result<f64> {
        self.update_with(experience, UpdateOptions::default())
    }

    /// Learn from one experience with explicit options
    fn update_with(&mut self, experience: &Experience, options: UpdateOptions) -> Result<f64>;

    /// Policy matrix shaped `[states, actions]`
    fn policy(&self) -> Array2<f64>;

    /// Owned snapshot of the action values, shaped `[actions, states]`
    fn q_values(&self) -> Array2<f64>;

    /// Clear per-episode state
    fn reset(&mut self) {}

    /// Get agent metrics
    fn metrics(&self) -> AgentMetrics {
        self.base().metrics().clone()
    }
}

/// State and behaviour shared by every learner
#[derive(Debug, Clone)]
pub struct BaseAgent {
    config: AgentConfig,
    sampler: ActionSampler,
    states: DiscreteSpace,
    actions: DiscreteSpace,
    rng: StdRng,
    metrics: AgentMetrics,
}

impl BaseAgent {
    /// Create a new base agent from a validated configuration
    pub fn new(config: AgentConfig) -> Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            sampler: config.sampler(),
            states: DiscreteSpace::new(config.state_size),
            actions: DiscreteSpace::new(config.action_size),
            rng,
            metrics: AgentMetrics::default(),
            config,
        })
    }

    /// Configuration
    #[must_use]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Action sampler
    #[must_use]
    pub fn sampler(&self) -> &ActionSampler {
        &self.sampler
    }

    /// Number of states
    #[must_use]
    pub fn state_size(&self) -> usize {
        self.states.n
    }

    /// Number of actions
    #[must_use]
    pub fn action_size(&self) -> usize {
        self.actions.n
    }

    /// Learning rate
    #[must_use]
    pub fn lr(&self) -> f64 {
        self.config.lr
    }

    /// Discount factor
    #[must_use]
    pub fn gamma(&self) -> f64 {
        self.config.gamma
    }

    /// Softmax inverse temperature
    #[must_use]
    pub fn beta(&self) -> f64 {
        self.config.beta
    }

    /// Random number generator owned by this agent
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Sample an action from a vector of action values
    pub fn sample_action(&mut self, values: ArrayView1<f64>) -> Result<usize> {
        self.sampler.sample(values, &mut self.rng)
    }

    /// Policy matrix `[S, A]` for a value table shaped `[A, S]`
    #[must_use]
    pub fn policy(&self, q: ArrayView2<f64>) -> Array2<f64> {
        self.sampler.policy(q)
    }

    /// Validate a state index
    pub fn check_state(&self, state: usize) -> Result<usize> {
        self.states.check_state(state)
    }

    /// Validate an action index
    pub fn check_action(&self, action: usize) -> Result<usize> {
        self.actions.check_action(action)
    }

    /// Validate every index carried by an experience
    pub fn check_experience(&self, experience: &Experience) -> Result<()> {
        self.check_state(experience.state)?;
        self.check_state(experience.next_state)?;
        self.check_action(experience.action)?;
        if let Some(next_action) = experience.next_action {
            self.check_action(next_action)?;
        }
        Ok(())
    }

    /// Record a completed update
    pub fn record_update(&mut self, error: f64) {
        self.metrics.total_updates += 1;
        self.metrics.last_error = Some(error);
        trace!(updates = self.metrics.total_updates, error, "update applied");
    }

    /// Get agent metrics
    #[must_use]
    pub fn metrics(&self) -> &AgentMetrics {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_json_uses_defaults() {
        let config =
            AgentConfig::from_json(r#"{"state_size": 5, "action_size": 4, "poltype": "greedy"}"#)
                .unwrap();
        assert_eq!(config.state_size, 5);
        assert_eq!(config.poltype, PolicyType::EpsilonGreedy);
        assert_eq!(config.gamma, 0.99);
    }

    #[test]
    fn test_config_rejects_bad_values() {
        assert!(AgentConfig::new(0, 2).validate().is_err());
        let config = AgentConfig {
            gamma: 1.5,
            ..AgentConfig::new(2, 2)
        };
        assert!(matches!(config.validate(), Err(RLError::InvalidConfig(_))));
        assert!(AgentConfig::from_json(r#"{"poltype": "boltzmann"}"#).is_err());
    }

    #[test]
    fn test_check_experience() {
        let base = BaseAgent::new(AgentConfig::new(3, 2)).unwrap();
        assert!(base.check_experience(&Experience::new(0, 1, 2, 0.0, false)).is_ok());
        assert!(matches!(
            base.check_experience(&Experience::new(0, 1, 3, 0.0, false)),
            Err(RLError::InvalidState { state: 3, .. })
        ));
        assert!(matches!(
            base.check_experience(&Experience::new(0, 0, 1, 0.0, false).with_next_action(2)),
            Err(RLError::InvalidAction { action: 2, .. })
        ));
    }

    #[test]
    fn test_seeded_sampling_is_reproducible() {
        let config = AgentConfig {
            poltype: PolicyType::EpsilonGreedy,
            epsilon: 0.5,
            seed: Some(42),
            ..AgentConfig::new(1, 4)
        };
        let mut a = BaseAgent::new(config.clone()).unwrap();
        let mut b = BaseAgent::new(config).unwrap();
        let values = ndarray::array![0.0, 1.0, 0.0, 0.0];
        for _ in 0..20 {
            assert_eq!(
                a.sample_action(values.view()).unwrap(),
                b.sample_action(values.view()).unwrap()
            );
        }
    }

    #[test]
    fn test_record_update() {
        let mut base = BaseAgent::new(AgentConfig::new(2, 2)).unwrap();
        base.record_update(0.25);
        base.record_update(-0.5);
        assert_eq!(base.metrics().total_updates, 2);
        assert_eq!(base.metrics().last_error, Some(-0.5));
    }
}
