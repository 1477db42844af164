//! Value-table initialisation
//!
//! Tables are allocated once at construction from a [`TableInit`] and never
//! resized afterwards.

use ndarray::{Array, Array2, Array3, Dimension};
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::{RLError, Result};

/// Initial contents of a learner's table
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum TableInit<T> {
    /// Zeros for action-value tables, an identity stack for successor matrices
    #[default]
    Default,
    /// Standard-normal noise scaled by the given factor
    ScaledRandom(f64),
    /// A pre-built table, which must match the agent's dimensions
    Provided(T),
}

fn check_shape<D: Dimension>(table: &Array<f64, D>, expected: &[usize]) -> Result<()> {
    if table.shape() == expected {
        Ok(())
    } else {
        Err(RLError::ShapeMismatch {
            expected: expected.to_vec(),
            actual: table.shape().to_vec(),
        })
    }
}

impl TableInit<Array2<f64>> {
    /// Resolve into an action-value table shaped `[actions, states]`
    pub fn resolve_q<R: Rng + ?Sized>(
        &self,
        actions: usize,
        states: usize,
        rng: &mut R,
    ) -> Result<Array2<f64>> {
        match self {
            Self::Default => Ok(Array2::zeros((actions, states))),
            Self::ScaledRandom(scale) => Ok(Array2::from_shape_simple_fn((actions, states), || {
                scale * rng.sample::<f64, _>(StandardNormal)
            })),
            Self::Provided(table) => {
                check_shape(table, &[actions, states])?;
                Ok(table.clone())
            }
        }
    }
}

impl TableInit<Array3<f64>> {
    /// Resolve into a successor tensor shaped `[actions, states, states]`
    pub fn resolve_m<R: Rng + ?Sized>(
        &self,
        actions: usize,
        states: usize,
        rng: &mut R,
    ) -> Result<Array3<f64>> {
        match self {
            Self::Default => Ok(identity_stack(actions, states)),
            Self::ScaledRandom(scale) => Ok(Array3::from_shape_simple_fn(
                (actions, states, states),
                || scale * rng.sample::<f64, _>(StandardNormal),
            )),
            Self::Provided(table) => {
                check_shape(table, &[actions, states, states])?;
                Ok(table.clone())
            }
        }
    }
}

/// One identity matrix per action
#[must_use]
pub fn identity_stack(actions: usize, states: usize) -> Array3<f64> {
    Array3::from_shape_fn((actions, states, states), |(_, i, j)| {
        if i == j {
            1.0
        } else {
            0.0
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_default_q_is_zero() {
        let mut rng = StdRng::seed_from_u64(0);
        let q = TableInit::<Array2<f64>>::Default.resolve_q(2, 3, &mut rng).unwrap();
        assert_eq!(q, Array2::<f64>::zeros((2, 3)));
    }

    #[test]
    fn test_default_m_is_identity_stack() {
        let mut rng = StdRng::seed_from_u64(0);
        let m = TableInit::<Array3<f64>>::Default.resolve_m(2, 3, &mut rng).unwrap();
        for a in 0..2 {
            assert_eq!(m.index_axis(ndarray::Axis(0), a), Array2::<f64>::eye(3));
        }
    }

    #[test]
    fn test_scaled_random_q_is_seeded() {
        let q1 = TableInit::<Array2<f64>>::ScaledRandom(0.5)
            .resolve_q(2, 4, &mut StdRng::seed_from_u64(11))
            .unwrap();
        let q2 = TableInit::<Array2<f64>>::ScaledRandom(0.5)
            .resolve_q(2, 4, &mut StdRng::seed_from_u64(11))
            .unwrap();
        assert_eq!(q1, q2);
        assert!(q1.iter().any(|v| *v != 0.0));
    }

    #[test]
    fn test_provided_shape_is_checked() {
        let mut rng = StdRng::seed_from_u64(0);
        let init = TableInit::Provided(Array2::zeros((3, 2)));
        assert!(matches!(
            init.resolve_q(2, 3, &mut rng),
            Err(RLError::ShapeMismatch { .. })
        ));
    }
}
