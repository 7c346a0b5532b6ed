//! Flux control index.
//!
//! For a member whose flux changed by a fold `F` when its enzyme changed by a
//! fold `L`, the control index is `ln F / ln L`: 1 means the flux follows the
//! enzyme proportionally, 0 means the flux is insensitive to it.

use serde::{Deserialize, Serialize};

use super::fold_change::FoldChangeTable;

/// Control-index samples of one enzyme, split by the side of the reference level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlIndex {
    /// Samples from levels below the reference
    pub down: Vec<f64>,
    /// Samples from levels above the reference
    pub up: Vec<f64>,
}

impl ControlIndex {
    pub fn mean_down(&self) -> Option<f64> {
        mean(&self.down)
    }

    pub fn mean_up(&self) -> Option<f64> {
        mean(&self.up)
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

/// Expands the binned fold changes of `table` into control-index samples.
///
/// Each binned member contributes `ln(c) / ln(level)` with `c` the geometric
/// centre of its bin. The reference level itself carries no information and is
/// skipped.
pub fn control_index(table: &FoldChangeTable) -> ControlIndex {
    let centres = table.bin_centres();
    let mut index = ControlIndex::default();

    for (column, &level) in table.levels.iter().enumerate() {
        let side = if level < 1.0 {
            &mut index.down
        } else if level > 1.0 {
            &mut index.up
        } else {
            continue;
        };

        let Some(counts) = table.column(column) else {
            continue;
        };
        let log_level = level.ln();
        for (centre, &count) in centres.iter().zip(counts.iter()) {
            let sample = centre.ln() / log_level;
            side.extend(std::iter::repeat(sample).take(count));
        }
    }

    index
}
