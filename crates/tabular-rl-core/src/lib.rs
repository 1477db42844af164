//! Core traits and types for tabular reinforcement learning
//!
//! This crate provides the shared vocabulary of the tabular learners: the
//! experience tuple, discrete spaces, numeric primitives, action selection,
//! table initialisation and the [`Agent`] capability trait.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

pub mod agent;
pub mod environment;
pub mod error;
pub mod numeric;
pub mod policy;
pub mod space;
pub mod trajectory;
pub mod value;

// Re-export core traits and types
pub use agent::{check_unit_interval, Agent, AgentConfig, AgentMetrics, BaseAgent, UpdateOptions};
pub use environment::{Environment, Step};
pub use error::{RLError, Result};
pub use policy::{ActionSampler, PolicyType};
pub use space::DiscreteSpace;
pub use trajectory::Experience;
pub use value::{identity_stack, TableInit};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Agent, AgentConfig, Environment, Experience, PolicyType, Result, Step, TableInit,
        UpdateOptions,
    };
}
