//! Finite discrete state and action spaces

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{RLError, Result};

/// Discrete space of `n` indices `0..n`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscreteSpace {
    /// Number of elements
    pub n: usize,
}

impl DiscreteSpace {
    /// Create a new discrete space
    #[must_use]
    pub fn new(n: usize) -> Self {
        Self { n }
    }

    /// Sample an index uniformly at random
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        rng.gen_range(0..self.n)
    }

    /// Check if an index lies within the space
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        index < self.n
    }

    /// Validate a state index against this space
    pub fn check_state(&self, state: usize) -> Result<usize> {
        if self.contains(state) {
            Ok(state)
        } else {
            Err(RLError::InvalidState {
                state,
                state_size: self.n,
            })
        }
    }

    /// Validate an action index against this space
    pub fn check_action(&self, action: usize) -> Result<usize> {
        if self.contains(action) {
            Ok(action)
        } else {
            Err(RLError::InvalidAction {
                action,
                action_size: self.n,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_sample_within_bounds() {
        let space = DiscreteSpace::new(4);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            assert!(space.contains(space.sample(&mut rng)));
        }
    }

    #[test]
    fn test_checks_report_sizes() {
        let space = DiscreteSpace::new(3);
        assert_eq!(space.check_state(2).unwrap(), 2);
        match space.check_action(3) {
            Err(RLError::InvalidAction { action, action_size }) => {
                assert_eq!((action, action_size), (3, 3));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
