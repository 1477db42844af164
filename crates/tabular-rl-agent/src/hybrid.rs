//! Mixture of a model-based planner and a successor-representation learner

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tabular_rl_core::{
    check_unit_interval, Agent, AgentConfig, BaseAgent, Experience, Result, UpdateOptions,
};
use tracing::trace;

use crate::model_based::{Mbv, MbvConfig};
use crate::sr::{Tdsr, TdsrConfig};
use crate::weights::WeightRule;

/// Configuration for [`Srmb`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SrmbConfig {
    /// Base agent configuration, shared by both sub-agents
    #[serde(flatten)]
    pub base: AgentConfig,
    /// Weight of the model-based values in the mixture
    pub mix: f64,
    /// Reward-weight learning rule of both sub-agents
    pub weights: WeightRule,
    /// Planning sweeps per update of the model-based sub-agent
    pub max_iter: usize,
    /// Planning convergence threshold
    pub tol: f64,
    /// Optimism weight of both sub-agents
    pub w_value: f64,
}

impl Default for SrmbConfig {
    fn default() -> Self {
        Self {
            base: AgentConfig::default(),
            mix: 0.5,
            weights: WeightRule::Direct,
            max_iter: 1,
            tol: 0.01,
            w_value: 1.0,
        }
    }
}

/// Hybrid agent acting on `mix * Q_mb + (1 - mix) * Q_sr`
///
/// Each sub-agent owns its tables and is driven with the same experience.
#[derive(Debug, Clone)]
pub struct Srmb {
    base: BaseAgent,
    mb: Mbv,
    sr: Tdsr,
    mix: f64,
}

impl Srmb {
    /// Create a new SRMB agent
    pub fn new(config: SrmbConfig) -> Result<Self> {
        check_unit_interval("mix", config.mix)?;
        let mb = Mbv::new(MbvConfig {
            base: config.base.clone(),
            weights: config.weights,
            w_value: config.w_value,
            max_iter: config.max_iter,
            tol: config.tol,
        })?;
        let sr = Tdsr::new(TdsrConfig {
            base: config.base.clone(),
            weights: config.weights,
            w_value: config.w_value,
            ..TdsrConfig::default()
        })?;
        Ok(Self {
            base: BaseAgent::new(config.base)?,
            mb,
            sr,
            mix: config.mix,
        })
    }

    /// Model-based sub-agent
    #[must_use]
    pub fn mb(&self) -> &Mbv {
        &self.mb
    }

    /// Successor-representation sub-agent
    #[must_use]
    pub fn sr(&self) -> &Tdsr {
        &self.sr
    }

    /// Mixture weight
    #[must_use]
    pub fn mix(&self) -> f64 {
        self.mix
    }

    /// Mixed action values of a state
    pub fn q_estimates(&self, state: usize) -> Result<Array1<f64>> {
        let mb_q = self.mb.q_estimate(state)?;
        let sr_q = self.sr.q_estimate(state)?;
        Ok(&mb_q * self.mix + sr_q * (1.0 - self.mix))
    }

    /// Update the reward weights of both sub-agents
    pub fn update_weights(&mut self, experience: &Experience) -> Result<()> {
        self.base.check_experience(experience)?;
        self.mb.update_w(experience)?;
        self.sr.update_w(experience)?;
        Ok(())
    }
}

impl Agent for Srmb {
    fn base(&self) -> &BaseAgent {
        &self.base
    }

    fn sample_action(&mut self, state: usize) -> Result<usize> {
        let logits = self.q_estimates(state)?;
        self.base.sample_action(logits.view())
    }

    fn update_with(&mut self, experience: &Experience, options: UpdateOptions) -> Result<f64> {
        self.base.check_experience(experience)?;
        let mb_error = self.mb.update_with(experience, options)?;
        let sr_error = self.sr.update_with(experience, options)?;
        trace!(mb_error, sr_error, "SRMB update");
        self.base.record_update(sr_error);
        Ok(sr_error)
    }

    fn policy(&self) -> Array2<f64> {
        self.base.policy(self.q_values().view())
    }

    fn q_values(&self) -> Array2<f64> {
        self.mb.q_values() * self.mix + self.sr.q_values() * (1.0 - self.mix)
    }
}
