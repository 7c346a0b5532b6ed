//! Parallel continuation over the whole ensemble.
//!
//! Every retained ensemble member is one unit of work: its reference Jacobian is
//! screened, and if stable every selected enzyme is swept down and up. Units run
//! on a bounded rayon pool and their results are reassembled in member order.

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use rayon::prelude::*;

use super::integrator::{sweep, SweepEnd, SweepSettings};
use super::stability::max_real_eigenvalue;
use super::trajectory::{Direction, EnzymeResponse, MemberResponse, PerturbationResults};
use crate::ensemble::error::EnsembleError;
use crate::ensemble::params::{Ensemble, KineticParameterSet};
use crate::ensemble::setup::EnsembleSetup;
use crate::network::reaction::Network;
use crate::network::reference::ReferenceState;
use crate::sensitivity::system::SensitivitySystem;

/// Runs the stability screen and both sweeps of every selected enzyme for one member.
///
/// Returns `Ok(None)` if the member is unstable at the reference state.
///
/// # Arguments
///
/// * `network` - The reaction network
/// * `reference` - Reference steady state shared by all members
/// * `params` - Kinetic parameters of the member
/// * `enzymes` - Reaction indices whose enzymes are swept
/// * `setup` - Sweep bounds, step count and tolerances
pub fn simulate_member(
    network: &Network,
    reference: &ReferenceState,
    params: &KineticParameterSet,
    enzymes: &[usize],
    setup: &EnsembleSetup,
) -> Result<Option<MemberResponse>, EnsembleError> {
    let system = SensitivitySystem::new(network, reference, params)?;
    let reference_enzymes = system.reference_enzymes().clone();
    let reference_jacobian = system.jacobian(&reference_enzymes, &system.reference_state());

    match max_real_eigenvalue(&reference_jacobian) {
        Some(max) if max < setup.eig_threshold => {}
        Some(max) => {
            debug!(
                "Member {}: largest eigenvalue real part {max:.3e} at the reference state, discarded",
                params.member
            );
            return Ok(None);
        }
        None => {
            debug!(
                "Member {}: reference Jacobian has no eigen-decomposition, discarded",
                params.member
            );
            return Ok(None);
        }
    }

    let settings = SweepSettings {
        n_steps: setup.n_steps,
        eig_threshold: setup.eig_threshold,
        pinv_tolerance: setup.pinv_tolerance,
    };

    let responses = enzymes
        .iter()
        .map(|&enzyme| {
            let e_ref = reference_enzymes[enzyme];
            let (down, down_end) = sweep(
                &system,
                enzyme,
                Direction::Down,
                e_ref * setup.enzyme_lower,
                &settings,
            );
            let (up, up_end) = sweep(
                &system,
                enzyme,
                Direction::Up,
                e_ref * setup.enzyme_upper,
                &settings,
            );

            for (end, trajectory) in [(down_end, &down), (up_end, &up)] {
                if end != SweepEnd::Completed {
                    debug!(
                        "Member {}: sweep of {} {:?} truncated after {} steps ({end:?})",
                        params.member,
                        network.stoich().reactions()[enzyme],
                        trajectory.direction,
                        trajectory.completed_steps()
                    );
                }
            }

            EnzymeResponse { enzyme, down, up }
        })
        .collect();

    Ok(Some(MemberResponse {
        member: params.member,
        responses,
    }))
}

/// Reaction indices swept by default: every inner reaction, plus exchange
/// reactions if `setup.sweep_exchange_reactions` is set.
pub fn swept_enzymes(network: &Network, setup: &EnsembleSetup) -> Vec<usize> {
    if setup.sweep_exchange_reactions {
        (0..network.n_reactions()).collect()
    } else {
        network.stoich().inner_reactions()
    }
}

/// Screens and sweeps every member of `ensemble` in parallel.
///
/// # Errors
///
/// Returns an [`EnsembleError`] if the setup is invalid, the thread pool cannot
/// be built or a member does not match the network.
pub fn simulate_perturbations(
    network: &Network,
    reference: &ReferenceState,
    ensemble: &Ensemble,
    setup: &EnsembleSetup,
) -> Result<PerturbationResults, EnsembleError> {
    setup.validate()?;
    let enzymes = swept_enzymes(network, setup);
    let num_parallel = determine_num_parallel(setup.num_threads)?;

    info!(
        "Sweeping {} enzymes of {} members using {num_parallel} threads",
        enzymes.len(),
        ensemble.len()
    );

    let thread_pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_parallel)
        .build()
        .map_err(|e| EnsembleError::ThreadPoolError(e.to_string()))?;

    let progress_bar = setup_progress_bar(ensemble.len() as u64, setup.show_progress);

    let outcomes: Result<Vec<Option<MemberResponse>>, EnsembleError> = thread_pool.install(|| {
        ensemble
            .members()
            .par_iter()
            .map(|params| {
                let outcome = simulate_member(network, reference, params, &enzymes, setup);
                progress_bar.inc(1);
                outcome
            })
            .collect()
    });
    progress_bar.finish_and_clear();

    let mut members = Vec::with_capacity(ensemble.len());
    let mut unstable = Vec::new();
    for (params, outcome) in ensemble.members().iter().zip(outcomes?) {
        match outcome {
            Some(response) => members.push(response),
            None => unstable.push(params.member),
        }
    }

    if !unstable.is_empty() {
        warn!(
            "{} of {} members were unstable at the reference state and discarded",
            unstable.len(),
            ensemble.len()
        );
    }

    Ok(PerturbationResults {
        n_steps: setup.n_steps,
        enzymes,
        members,
        unstable,
    })
}

/// Determines the number of worker threads to use.
pub(crate) fn determine_num_parallel(num_threads: Option<usize>) -> Result<usize, EnsembleError> {
    let available = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);

    match num_threads {
        None => Ok(available),
        Some(0) => Err(EnsembleError::InvalidParallelism(0)),
        Some(n) if n > available => Err(EnsembleError::TooManyThreads {
            requested: n,
            available,
        }),
        Some(n) => Ok(n),
    }
}

fn setup_progress_bar(len: u64, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let progress_bar = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "Members: {spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} | {elapsed}/{eta}",
    ) {
        progress_bar.set_style(style.progress_chars("█▉▊▋▌▍▎▏ "));
    }
    progress_bar
}
