//! Environment interface consumed by training loops
//!
//! Learners never call an environment themselves; whatever loop drives them
//! turns each [`Step`] into an [`Experience`].

use serde::{Deserialize, Serialize};

use crate::{Experience, Result};

/// Result of a single environment step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// State reached
    pub next_state: usize,
    /// Reward signal
    pub reward: f64,
    /// Whether the episode is done
    pub done: bool,
}

impl Step {
    /// Build the experience tuple for the transition that produced this step
    #[must_use]
    pub fn into_experience(self, state: usize, action: usize) -> Experience {
        Experience::new(state, action, self.next_state, self.reward, self.done)
    }
}

/// Finite, discrete environment producing transitions
pub trait Environment {
    /// Number of states
    fn state_size(&self) -> usize;

    /// Number of actions
    fn action_size(&self) -> usize;

    /// Start a new episode and return the initial state
    fn reset(&mut self) -> usize;

    /// Apply an action in the current state
    fn step(&mut self, action: usize) -> Result<Step>;
}
