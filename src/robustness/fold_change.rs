//! Flux fold-change distributions.
//!
//! For every grid level of a swept enzyme, the flux through its own reaction
//! relative to the reference flux is collected over all members that reached the
//! level and binned on a log-spaced grid of fold changes.

use itertools::iproduct;
use log::info;
use ndarray::{Array2, ArrayView1, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::continuation::runner::determine_num_parallel;
use crate::continuation::trajectory::{Direction, PerturbationResults, Trajectory};
use crate::ensemble::error::EnsembleError;
use crate::ensemble::params::Ensemble;
use crate::ensemble::setup::EnsembleSetup;
use crate::network::reaction::Network;
use crate::network::reference::ReferenceState;
use crate::sensitivity::system::SensitivitySystem;

/// Histogram of flux fold changes of one enzyme across the enzyme-level grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldChangeTable {
    /// Reaction index of the perturbed enzyme
    pub enzyme: usize,
    /// Ascending fold-change bin edges, one more than there are bins
    pub bin_edges: Vec<f64>,
    /// Relative enzyme levels, ascending
    pub levels: Vec<f64>,
    /// Member counts, bins × levels
    pub counts: Array2<usize>,
    /// Number of members that reached each level
    pub observed: Vec<usize>,
}

impl FoldChangeTable {
    pub fn n_bins(&self) -> usize {
        self.counts.nrows()
    }

    pub fn n_levels(&self) -> usize {
        self.counts.ncols()
    }

    /// Counts of one level, `None` if no member reached it
    pub fn column(&self, level: usize) -> Option<ArrayView1<'_, usize>> {
        (self.observed.get(level).copied().unwrap_or(0) > 0)
            .then(|| self.counts.index_axis(Axis(1), level))
    }

    /// Fraction of the members reaching `level` whose fold change fell into `bin`
    pub fn frequency(&self, bin: usize, level: usize) -> Option<f64> {
        let column = self.column(level)?;
        let count = column.get(bin)?;
        Some(*count as f64 / self.observed[level] as f64)
    }

    /// Geometric centre of every bin
    pub fn bin_centres(&self) -> Vec<f64> {
        self.bin_edges
            .windows(2)
            .map(|pair| (pair[0] * pair[1]).sqrt())
            .collect()
    }

    /// Joins a down table and an up table of the same enzyme, keeping the
    /// shared reference column once.
    fn join(down: Self, up: Self) -> Self {
        let n_down = down.n_levels();
        let n_up = up.n_levels().saturating_sub(1);

        let counts = Array2::from_shape_fn((down.n_bins(), n_down + n_up), |(bin, level)| {
            if level < n_down {
                down.counts[[bin, level]]
            } else {
                up.counts[[bin, level - n_down + 1]]
            }
        });

        let mut levels = down.levels;
        levels.extend(up.levels.into_iter().skip(1));
        let mut observed = down.observed;
        observed.extend(up.observed.into_iter().skip(1));

        Self {
            enzyme: down.enzyme,
            bin_edges: down.bin_edges,
            levels,
            counts,
            observed,
        }
    }
}

/// Bin of `value` on ascending `edges`.
///
/// Bins are half-open except the last, which includes its upper edge. Values
/// outside the edges, or NaN, fall into no bin.
pub fn bin_index(value: f64, edges: &[f64]) -> Option<usize> {
    let (first, last) = (*edges.first()?, *edges.last()?);
    if edges.len() < 2 || !(value >= first && value <= last) {
        return None;
    }
    if value == last {
        return Some(edges.len() - 2);
    }
    Some(edges.partition_point(|&e| e <= value) - 1)
}

/// Fold change of the swept reaction's flux at every point of `trajectory`.
fn fold_changes(system: &SensitivitySystem, trajectory: &Trajectory) -> Vec<f64> {
    let enzyme = trajectory.enzyme;
    let reference = system.reference_fluxes()[enzyme];

    trajectory
        .points
        .iter()
        .map(|point| {
            let enzymes = system.enzymes_with(enzyme, point.enzyme_level);
            system.fluxes(&enzymes, &point.concentrations)[enzyme] / reference
        })
        .collect()
}

fn direction_table(
    systems: &[SensitivitySystem],
    results: &PerturbationResults,
    enzyme: usize,
    direction: Direction,
    setup: &EnsembleSetup,
) -> FoldChangeTable {
    let n = setup.n_steps;
    let bin_edges = setup.flux_bin_edges();
    let levels = match direction {
        Direction::Down => setup.levels_down(),
        Direction::Up => setup.levels_up(),
    };

    let mut counts = Array2::zeros((bin_edges.len() - 1, levels.len()));
    let mut observed = vec![0; levels.len()];

    for (member, system) in results.members.iter().zip(systems) {
        let Some(response) = member.response(enzyme) else {
            continue;
        };
        let ratios = fold_changes(system, response.trajectory(direction));

        for column in 0..levels.len() {
            // steps away from the reference needed to reach this level
            let step = match direction {
                Direction::Down => n - column,
                Direction::Up => column,
            };
            let Some(&ratio) = ratios.get(step) else {
                continue;
            };
            observed[column] += 1;
            if let Some(bin) = bin_index(ratio, &bin_edges) {
                counts[[bin, column]] += 1;
            }
        }
    }

    FoldChangeTable {
        enzyme,
        bin_edges,
        levels,
        counts,
        observed,
    }
}

/// Builds the fold-change tables of the given enzymes.
///
/// Each (enzyme, direction) pair is one unit of parallel work. The compiled
/// sensitivity systems of all retained members are built once and shared
/// read-only between the units.
///
/// # Arguments
///
/// * `network` - The reaction network
/// * `reference` - Reference steady state
/// * `ensemble` - Sampled kinetic parameters
/// * `results` - Continuation results of `ensemble`
/// * `setup` - Grid and binning settings
/// * `enzymes` - Reaction indices to tabulate, defaults to the inner swept enzymes
///
/// # Returns
///
/// One table per enzyme, in the order requested.
///
/// # Errors
///
/// Returns an [`EnsembleError`] if a retained member is missing from the
/// ensemble, an enzyme was never swept or the thread pool cannot be built.
#[bon::builder]
pub fn flux_fold_change(
    network: &Network,
    reference: &ReferenceState,
    ensemble: &Ensemble,
    results: &PerturbationResults,
    setup: &EnsembleSetup,
    enzymes: Option<Vec<usize>>,
) -> Result<Vec<FoldChangeTable>, EnsembleError> {
    setup.validate()?;
    check_step_count(results, setup)?;
    let enzymes = enzymes.unwrap_or_else(|| inner_swept_enzymes(network, results));
    if let Some(&missing) = enzymes.iter().find(|e| !results.enzymes.contains(*e)) {
        return Err(EnsembleError::UnknownEnzyme(
            network
                .stoich()
                .reactions()
                .get(missing)
                .cloned()
                .unwrap_or_else(|| missing.to_string()),
        ));
    }

    let num_parallel = determine_num_parallel(setup.num_threads)?;
    let thread_pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_parallel)
        .build()
        .map_err(|e| EnsembleError::ThreadPoolError(e.to_string()))?;

    info!(
        "Tabulating flux fold changes of {} enzymes over {} members",
        enzymes.len(),
        results.n_retained()
    );

    thread_pool.install(|| -> Result<Vec<FoldChangeTable>, EnsembleError> {
        let systems: Vec<SensitivitySystem> = results
            .members
            .par_iter()
            .map(|member| {
                let params = ensemble
                    .member(member.member)
                    .ok_or_else(|| EnsembleError::DimensionMismatch {
                        what: format!("parameter set of member {}", member.member),
                        expected: 1,
                        found: 0,
                    })?;
                SensitivitySystem::new(network, reference, params)
            })
            .collect::<Result<_, _>>()?;

        let units: Vec<(usize, Direction)> =
            iproduct!(enzymes.iter().copied(), [Direction::Down, Direction::Up]).collect();

        let mut tables = units
            .par_iter()
            .map(|&(enzyme, direction)| direction_table(&systems, results, enzyme, direction, setup))
            .collect::<Vec<_>>()
            .into_iter();

        let mut joined = Vec::with_capacity(enzymes.len());
        while let (Some(down), Some(up)) = (tables.next(), tables.next()) {
            joined.push(FoldChangeTable::join(down, up));
        }
        Ok(joined)
    })
}

pub(crate) fn check_step_count(
    results: &PerturbationResults,
    setup: &EnsembleSetup,
) -> Result<(), EnsembleError> {
    if results.n_steps != setup.n_steps {
        return Err(EnsembleError::DimensionMismatch {
            what: "continuation steps".to_string(),
            expected: setup.n_steps,
            found: results.n_steps,
        });
    }
    Ok(())
}

/// Swept enzymes of inner reactions, in sweep order
pub(crate) fn inner_swept_enzymes(network: &Network, results: &PerturbationResults) -> Vec<usize> {
    let inner = network.stoich().inner_reactions();
    results
        .enzymes
        .iter()
        .copied()
        .filter(|e| inner.contains(e))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_bin_index() {
        let edges = [1.0, 2.0, 4.0, 8.0];
        assert_eq!(bin_index(1.0, &edges), Some(0));
        assert_eq!(bin_index(1.9, &edges), Some(0));
        assert_eq!(bin_index(2.0, &edges), Some(1));
        assert_eq!(bin_index(7.99, &edges), Some(2));
        assert_eq!(bin_index(8.0, &edges), Some(2));
        assert_eq!(bin_index(0.99, &edges), None);
        assert_eq!(bin_index(8.01, &edges), None);
        assert_eq!(bin_index(f64::NAN, &edges), None);
        assert_eq!(bin_index(1.0, &[1.0]), None);
    }

    fn table(levels: Vec<f64>, counts: Array2<usize>, observed: Vec<usize>) -> FoldChangeTable {
        FoldChangeTable {
            enzyme: 3,
            bin_edges: vec![0.5, 1.0, 2.0],
            levels,
            counts,
            observed,
        }
    }

    #[test]
    fn test_join_keeps_reference_once() {
        let down = table(vec![0.1, 0.55, 1.0], array![[2, 1, 0], [0, 1, 2]], vec![2, 2, 2]);
        let up = table(vec![1.0, 5.5, 10.0], array![[0, 0, 0], [2, 1, 0]], vec![2, 1, 0]);

        let joined = FoldChangeTable::join(down, up);
        assert_eq!(joined.levels, vec![0.1, 0.55, 1.0, 5.5, 10.0]);
        assert_eq!(joined.counts, array![[2, 1, 0, 0, 0], [0, 1, 2, 1, 0]]);
        assert_eq!(joined.observed, vec![2, 2, 2, 1, 0]);
        assert_eq!(joined.enzyme, 3);

        assert_eq!(joined.frequency(1, 1), Some(0.5));
        assert_eq!(joined.frequency(1, 3), Some(1.0));
        assert_eq!(joined.frequency(0, 4), None);
        assert!(joined.column(4).is_none());
    }

    #[test]
    fn test_bin_centres_are_geometric() {
        let t = table(vec![1.0], Array2::zeros((2, 1)), vec![0]);
        let centres = t.bin_centres();
        approx::assert_relative_eq!(centres[0], 0.5f64.sqrt());
        approx::assert_relative_eq!(centres[1], 2.0f64.sqrt());
    }
}
