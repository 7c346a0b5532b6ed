//! First-order continuation of the steady state along one enzyme level.
//!
//! Differentiating the balance `S_bal · V(E, X) = 0` with respect to the level of
//! enzyme `k` gives `J · dX/dE_k = -S_bal · ∂V/∂E_k`. Each step solves this with
//! the pseudo-inverse of `J` and takes an Euler step of fixed size.
//!
//! A sweep stops without recording the offending step when the Jacobian at the
//! current state is no longer stable, when `J` has no pseudo-inverse, or when any
//! concentration drops to zero or below.

use log::trace;
use nalgebra::{DMatrix, DVector};

use super::stability::is_stable;
use super::trajectory::{Direction, Trajectory, TrajectoryPoint};
use crate::sensitivity::system::SensitivitySystem;

/// Step control of a single sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepSettings {
    pub n_steps: usize,
    pub eig_threshold: f64,
    /// Relative to the largest singular value of the Jacobian
    pub pinv_tolerance: f64,
}

/// Why a sweep ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepEnd {
    Completed,
    Unstable,
    Singular,
    NonPositive,
}

/// Sweeps the level of `enzyme` from its reference value to `target`.
///
/// All other enzymes stay at their reference level.
///
/// # Arguments
///
/// * `system` - Compiled sensitivity equations of one member
/// * `enzyme` - Reaction index of the swept enzyme
/// * `direction` - Label of the sweep
/// * `target` - Absolute enzyme level at the end of the sweep
/// * `settings` - Step count and numerical tolerances
///
/// # Returns
///
/// The trajectory of accepted states and the reason the sweep ended.
pub fn sweep(
    system: &SensitivitySystem,
    enzyme: usize,
    direction: Direction,
    target: f64,
    settings: &SweepSettings,
) -> (Trajectory, SweepEnd) {
    let mut enzymes = system.reference_enzymes().clone();
    let mut state = system.reference_state();
    let delta = (target - enzymes[enzyme]) / settings.n_steps as f64;

    // S_bal column of the swept reaction; ∂V/∂E is diagonal
    let column: DVector<f64> = system.balance_matrix().column(enzyme).into_owned();

    let mut trajectory = Trajectory::new(
        enzyme,
        direction,
        TrajectoryPoint {
            enzyme_level: enzymes[enzyme],
            concentrations: state.clone(),
        },
    );

    for step in 1..=settings.n_steps {
        let linearization = system.linearize(&enzymes, &state);

        if !is_stable(&linearization.jacobian, settings.eig_threshold) {
            trace!("Enzyme {enzyme} {direction:?}: unstable before step {step}");
            return (trajectory, SweepEnd::Unstable);
        }

        let Some(pinv) = pseudo_inverse(&linearization.jacobian, settings.pinv_tolerance) else {
            trace!("Enzyme {enzyme} {direction:?}: no pseudo-inverse at step {step}");
            return (trajectory, SweepEnd::Singular);
        };

        let forcing = &column * (linearization.enzyme_sensitivity[enzyme] * delta);
        state -= pinv * forcing;
        enzymes[enzyme] += delta;

        if state.iter().any(|&x| !(x > 0.0 && x.is_finite())) {
            trace!("Enzyme {enzyme} {direction:?}: non-positive concentration at step {step}");
            return (trajectory, SweepEnd::NonPositive);
        }

        trajectory.push(TrajectoryPoint {
            enzyme_level: enzymes[enzyme],
            concentrations: state.clone(),
        });
    }

    (trajectory, SweepEnd::Completed)
}

/// Moore-Penrose pseudo-inverse with singular values below
/// `tolerance · σ_max` treated as zero.
///
/// Returns `None` for a Jacobian without any non-zero finite singular value.
fn pseudo_inverse(jacobian: &DMatrix<f64>, tolerance: f64) -> Option<DMatrix<f64>> {
    if jacobian.is_empty() {
        return Some(jacobian.transpose());
    }

    let svd = jacobian.clone().svd(true, true);
    let largest = svd.singular_values.max();
    if !(largest > 0.0 && largest.is_finite()) {
        return None;
    }
    svd.pseudo_inverse(tolerance * largest).ok()
}
