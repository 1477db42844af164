//! Single-step experience tuples

use serde::{Deserialize, Serialize};

/// One transition fed to a learner's update
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    /// State the action was taken in
    pub state: usize,
    /// Action taken
    pub action: usize,
    /// State reached
    pub next_state: usize,
    /// Reward received
    pub reward: f64,
    /// Whether the episode ended with this transition
    pub done: bool,
    /// Action chosen in `next_state`, for on-policy bootstraps
    #[serde(default)]
    pub next_action: Option<usize>,
}

impl Experience {
    /// Create a new experience without a next action
    #[must_use]
    pub fn new(state: usize, action: usize, next_state: usize, reward: f64, done: bool) -> Self {
        Self {
            state,
            action,
            next_state,
            reward,
            done,
            next_action: None,
        }
    }

    /// Attach the action chosen in the next state
    #[must_use]
    pub fn with_next_action(mut self, next_action: usize) -> Self {
        self.next_action = Some(next_action);
        self
    }
}

impl From<(usize, usize, usize, f64, bool)> for Experience {
    fn from((state, action, next_state, reward, done): (usize, usize, usize, f64, bool)) -> Self {
        Self::new(state, action, next_state, reward, done)
    }
}
