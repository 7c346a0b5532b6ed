//! Failure probability along the enzyme-level grid.

use serde::{Deserialize, Serialize};

use crate::continuation::trajectory::EnzymeResponse;
use crate::ensemble::setup::EnsembleSetup;

/// Probability that the system fails before reaching each relative enzyme level.
///
/// Levels run from `enzyme_lower` through 1 to `enzyme_upper`; the reference
/// level 1 appears once. A probability of `None` means no member responses
/// were available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureCurve {
    pub levels: Vec<f64>,
    pub probabilities: Vec<Option<f64>>,
}

impl FailureCurve {
    /// `(level, probability)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (f64, Option<f64>)> + '_ {
        self.levels
            .iter()
            .copied()
            .zip(self.probabilities.iter().copied())
    }
}

/// Failure-probability curve of one enzyme.
///
/// A member reaches a grid level if its sweep toward that side accepted at
/// least as many steps as the level lies away from the reference.
pub fn failure_probability(responses: &[&EnzymeResponse], setup: &EnsembleSetup) -> FailureCurve {
    let n = setup.n_steps;
    let total = responses.len();

    let probability = |reached: usize| -> Option<f64> {
        (total > 0).then(|| 1.0 - reached as f64 / total as f64)
    };

    let mut levels = setup.levels_down();
    let mut probabilities: Vec<Option<f64>> = (0..=n)
        .map(|k| {
            let steps = n - k;
            probability(
                responses
                    .iter()
                    .filter(|r| r.down.completed_steps() >= steps)
                    .count(),
            )
        })
        .collect();

    levels.extend(setup.levels_up().into_iter().skip(1));
    probabilities.extend((1..=n).map(|steps| {
        probability(
            responses
                .iter()
                .filter(|r| r.up.completed_steps() >= steps)
                .count(),
        )
    }));

    FailureCurve {
        levels,
        probabilities,
    }
}
