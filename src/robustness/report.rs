//! Robustness report.
//!
//! [`analyze`] runs every ensemble-level metric over finished continuation
//! results; [`run`] chains sampling, continuation and analysis.

use std::collections::BTreeMap;

use log::info;
use serde::{Deserialize, Serialize};

use super::control::{control_index, ControlIndex};
use super::failure::{failure_probability, FailureCurve};
use super::fold_change::{check_step_count, flux_fold_change, inner_swept_enzymes, FoldChangeTable};
use super::index::robustness_index;
use crate::continuation::runner::simulate_perturbations;
use crate::continuation::trajectory::PerturbationResults;
use crate::ensemble::error::EnsembleError;
use crate::ensemble::params::Ensemble;
use crate::ensemble::sampler::generate_ensemble;
use crate::ensemble::setup::EnsembleSetup;
use crate::network::reaction::Network;
use crate::network::reference::ReferenceState;

/// All metrics of one perturbed enzyme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnzymeRobustness {
    /// Reaction id of the enzyme
    pub reaction: String,
    /// `None` if no member survived the stability screen
    pub robustness_index: Option<f64>,
    pub failure: FailureCurve,
    pub fold_change: FoldChangeTable,
    pub control: ControlIndex,
}

/// Ensemble-level robustness metrics of every analyzed enzyme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobustnessReport {
    /// Members requested from the sampler
    pub n_requested: usize,
    /// Members that survived sampling
    pub n_sampled: usize,
    /// Members that survived the stability screen
    pub n_retained: usize,
    pub enzymes: Vec<EnzymeRobustness>,
}

impl RobustnessReport {
    pub fn enzyme(&self, reaction: &str) -> Option<&EnzymeRobustness> {
        self.enzymes.iter().find(|e| e.reaction == reaction)
    }

    /// Robustness index keyed by reaction id
    pub fn robustness_indices(&self) -> BTreeMap<String, Option<f64>> {
        self.enzymes
            .iter()
            .map(|e| (e.reaction.clone(), e.robustness_index))
            .collect()
    }
}

/// Computes the robustness index, failure curve, fold-change table and control
/// index of every inner swept enzyme.
///
/// # Errors
///
/// Returns an [`EnsembleError`] if `results` was produced with a different step
/// count than `setup`, a retained member is missing from `ensemble`, or the
/// thread pool cannot be built.
pub fn analyze(
    network: &Network,
    reference: &ReferenceState,
    ensemble: &Ensemble,
    results: &PerturbationResults,
    setup: &EnsembleSetup,
) -> Result<RobustnessReport, EnsembleError> {
    check_step_count(results, setup)?;
    let enzymes = inner_swept_enzymes(network, results);

    let tables = flux_fold_change()
        .network(network)
        .reference(reference)
        .ensemble(ensemble)
        .results(results)
        .setup(setup)
        .enzymes(enzymes.clone())
        .call()?;

    let ids = network.stoich().reactions();
    let mut analyzed = Vec::with_capacity(enzymes.len());
    for (enzyme, fold_change) in enzymes.into_iter().zip(tables) {
        let responses = results.responses_for(enzyme);
        analyzed.push(EnzymeRobustness {
            reaction: ids[enzyme].clone(),
            robustness_index: robustness_index(&responses)?,
            failure: failure_probability(&responses, setup),
            control: control_index(&fold_change),
            fold_change,
        });
    }

    Ok(RobustnessReport {
        n_requested: ensemble.n_requested(),
        n_sampled: ensemble.len(),
        n_retained: results.n_retained(),
        enzymes: analyzed,
    })
}

/// Everything produced by one end-to-end run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleRun {
    pub ensemble: Ensemble,
    pub results: PerturbationResults,
    pub report: RobustnessReport,
}

/// Samples an ensemble, sweeps every member and analyzes the results.
///
/// # Arguments
///
/// * `network` - The reaction network
/// * `reference` - Reference steady state
/// * `setup` - Configuration of all stages
///
/// # Errors
///
/// Returns the first [`EnsembleError`] raised by any stage.
pub fn run(
    network: &Network,
    reference: &ReferenceState,
    setup: &EnsembleSetup,
) -> Result<EnsembleRun, EnsembleError> {
    let ensemble = generate_ensemble(network, reference, setup)?;
    let results = simulate_perturbations(network, reference, &ensemble, setup)?;
    let report = analyze(network, reference, &ensemble, &results, setup)?;

    info!(
        "Analyzed {} enzymes over {} of {} members",
        report.enzymes.len(),
        report.n_retained,
        report.n_requested
    );

    Ok(EnsembleRun {
        ensemble,
        results,
        report,
    })
}
