//! Error types for the tabular RL core library

use thiserror::Error;

/// Core error type for agent construction and updates
#[derive(Error, Debug)]
pub enum RLError {
    /// Unknown mode string, out-of-range hyperparameter or unsupported rule
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Fixed-action bootstrap requested without a next action
    #[error("No valid bootstrap type provided")]
    InvalidBootstrap,

    /// State index outside the state space
    #[error("Invalid state: {state} (state space has {state_size} states)")]
    InvalidState { state: usize, state_size: usize },

    /// Action index outside the action space
    #[error("Invalid action: {action} (action space has {action_size} actions)")]
    InvalidAction { action: usize, action_size: usize },

    /// Provided table does not match the agent's dimensions
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Computation error
    #[error("Computation error: {0}")]
    Computation(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for RL operations
pub type Result<T> = std::result::Result<T, RLError>;
