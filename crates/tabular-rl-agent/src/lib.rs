//! Tabular value-learning agents
//!
//! This crate provides the learners built on `tabular-rl-core`:
//! - One-step TD Q-learning ([`Tdq`], [`TdqRpl`], [`MoodQ`])
//! - Eligibility traces ([`Qet`]) and on-policy SARSA ([`Sarsa`])
//! - Actor-critic ([`Tdac`])
//! - Successor representation ([`Tdsr`], [`TdsrRp`])
//! - Model-based value iteration ([`Mbv`], [`MbvR`]) and the [`Srmb`] hybrid
//!
//! Every learner implements [`Agent`](tabular_rl_core::Agent) and consumes
//! one [`Experience`](tabular_rl_core::Experience) per update.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

pub mod actor_critic;
pub mod bootstrap;
pub mod hybrid;
pub mod model_based;
pub mod mood;
pub mod sarsa;
pub mod sr;
pub mod td;
pub mod trace;
pub mod weights;

// Re-export agents
pub use actor_critic::Tdac;
pub use hybrid::{Srmb, SrmbConfig};
pub use model_based::{Mbv, MbvConfig, MbvR, MbvRConfig, REPLAN_SWEEPS};
pub use mood::{MoodQ, MoodQConfig};
pub use sarsa::{Sarsa, SarsaConfig};
pub use sr::{Tdsr, TdsrConfig, TdsrRp, TdsrRpConfig};
pub use td::{Tdq, TdqConfig, TdqRpl, TdqRplConfig};
pub use trace::{Qet, QetConfig};

// Re-export learning rules
pub use bootstrap::{max_min, Bootstrap, QBootstrap};
pub use weights::WeightRule;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Bootstrap, Mbv, MbvConfig, MbvR, MbvRConfig, MoodQ, MoodQConfig, Qet, QetConfig, Sarsa,
        SarsaConfig, Srmb, SrmbConfig, Tdac, Tdq, TdqConfig, TdqRpl, TdqRplConfig, Tdsr,
        TdsrConfig, TdsrRp, TdsrRpConfig, WeightRule,
    };
    pub use tabular_rl_core::prelude::*;
}
