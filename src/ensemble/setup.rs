//! Configuration of an ensemble run.

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_EIG_THRESHOLD, DEFAULT_ENZYME_REL_BOUNDS, DEFAULT_FLUX_BOUNDS, DEFAULT_MAX_REDRAWS,
    DEFAULT_N_MODELS, DEFAULT_N_STEPS, DEFAULT_N_WINDOWS, DEFAULT_PINV_TOLERANCE,
};

use super::error::EnsembleError;

/// What to do when a parameter draw is thermodynamically infeasible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InfeasibleDrawPolicy {
    /// Draw the member again, up to `max_attempts` draws in total
    Redraw { max_attempts: usize },
    /// Drop the member on its first infeasible draw
    Discard,
}

impl Default for InfeasibleDrawPolicy {
    fn default() -> Self {
        Self::Redraw {
            max_attempts: DEFAULT_MAX_REDRAWS,
        }
    }
}

impl InfeasibleDrawPolicy {
    /// Number of draws a member gets before it is discarded
    pub fn max_attempts(&self) -> usize {
        match self {
            Self::Redraw { max_attempts } => (*max_attempts).max(1),
            Self::Discard => 1,
        }
    }
}

/// Every knob of ensemble generation, continuation and aggregation.
///
/// Enzyme bounds are relative to the reference enzyme level, flux bounds are
/// fold changes relative to the reference flux.
///
/// # Examples
///
/// ```
/// use kinetic_ensemble::prelude::EnsembleSetupBuilder;
///
/// let setup = EnsembleSetupBuilder::default()
///     .n_models(20)
///     .seed(7)
///     .build()
///     .unwrap();
/// assert_eq!(setup.n_steps, 100);
/// ```
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct EnsembleSetup {
    #[builder(default = "DEFAULT_N_MODELS")]
    pub n_models: usize,
    #[builder(default = "0")]
    pub seed: u64,
    #[builder(default = "DEFAULT_ENZYME_REL_BOUNDS.0")]
    pub enzyme_lower: f64,
    #[builder(default = "DEFAULT_ENZYME_REL_BOUNDS.1")]
    pub enzyme_upper: f64,
    #[builder(default = "DEFAULT_N_STEPS")]
    pub n_steps: usize,
    #[builder(default = "DEFAULT_EIG_THRESHOLD")]
    pub eig_threshold: f64,
    #[builder(default = "DEFAULT_PINV_TOLERANCE")]
    pub pinv_tolerance: f64,
    #[builder(default = "DEFAULT_FLUX_BOUNDS.0")]
    pub flux_lower: f64,
    #[builder(default = "DEFAULT_FLUX_BOUNDS.1")]
    pub flux_upper: f64,
    #[builder(default = "DEFAULT_N_WINDOWS")]
    pub n_windows: usize,
    /// Worker threads; `None` uses every available core
    #[builder(default)]
    pub num_threads: Option<usize>,
    #[builder(default)]
    pub infeasible_draw: InfeasibleDrawPolicy,
    /// Also sweep the enzymes of exchange pseudo-reactions
    #[builder(default = "false")]
    pub sweep_exchange_reactions: bool,
    #[builder(default = "false")]
    pub show_progress: bool,
}

impl Default for EnsembleSetup {
    fn default() -> Self {
        Self {
            n_models: DEFAULT_N_MODELS,
            seed: 0,
            enzyme_lower: DEFAULT_ENZYME_REL_BOUNDS.0,
            enzyme_upper: DEFAULT_ENZYME_REL_BOUNDS.1,
            n_steps: DEFAULT_N_STEPS,
            eig_threshold: DEFAULT_EIG_THRESHOLD,
            pinv_tolerance: DEFAULT_PINV_TOLERANCE,
            flux_lower: DEFAULT_FLUX_BOUNDS.0,
            flux_upper: DEFAULT_FLUX_BOUNDS.1,
            n_windows: DEFAULT_N_WINDOWS,
            num_threads: None,
            infeasible_draw: InfeasibleDrawPolicy::default(),
            sweep_exchange_reactions: false,
            show_progress: false,
        }
    }
}

impl EnsembleSetup {
    /// Re-checks the knobs of a setup that did not come from the builder,
    /// e.g. one deserialized from JSON.
    pub fn validate(&self) -> Result<(), EnsembleError> {
        check_knobs(&Knobs {
            n_models: self.n_models,
            n_steps: self.n_steps,
            enzyme_lower: self.enzyme_lower,
            enzyme_upper: self.enzyme_upper,
            flux_lower: self.flux_lower,
            flux_upper: self.flux_upper,
            n_windows: self.n_windows,
            eig_threshold: self.eig_threshold,
            pinv_tolerance: self.pinv_tolerance,
        })
        .map_err(EnsembleError::InvalidSetup)
    }

    /// Relative enzyme levels of the down-regulation grid, `enzyme_lower ..= 1`
    pub fn levels_down(&self) -> Vec<f64> {
        linspace(self.enzyme_lower, 1.0, self.n_steps + 1)
    }

    /// Relative enzyme levels of the up-regulation grid, `1 ..= enzyme_upper`
    pub fn levels_up(&self) -> Vec<f64> {
        linspace(1.0, self.enzyme_upper, self.n_steps + 1)
    }

    /// Log-spaced fold-change bin edges, `n_windows + 1` of them
    pub fn flux_bin_edges(&self) -> Vec<f64> {
        linspace(self.flux_lower.log10(), self.flux_upper.log10(), self.n_windows + 1)
            .into_iter()
            .map(|e| 10f64.powf(e))
            .collect()
    }
}

impl EnsembleSetupBuilder {
    fn validate(&self) -> Result<(), String> {
        let defaults = EnsembleSetup::default();
        check_knobs(&Knobs {
            n_models: self.n_models.unwrap_or(defaults.n_models),
            n_steps: self.n_steps.unwrap_or(defaults.n_steps),
            enzyme_lower: self.enzyme_lower.unwrap_or(defaults.enzyme_lower),
            enzyme_upper: self.enzyme_upper.unwrap_or(defaults.enzyme_upper),
            flux_lower: self.flux_lower.unwrap_or(defaults.flux_lower),
            flux_upper: self.flux_upper.unwrap_or(defaults.flux_upper),
            n_windows: self.n_windows.unwrap_or(defaults.n_windows),
            eig_threshold: self.eig_threshold.unwrap_or(defaults.eig_threshold),
            pinv_tolerance: self.pinv_tolerance.unwrap_or(defaults.pinv_tolerance),
        })
    }
}

struct Knobs {
    n_models: usize,
    n_steps: usize,
    enzyme_lower: f64,
    enzyme_upper: f64,
    flux_lower: f64,
    flux_upper: f64,
    n_windows: usize,
    eig_threshold: f64,
    pinv_tolerance: f64,
}

fn check_knobs(knobs: &Knobs) -> Result<(), String> {
    if knobs.n_models == 0 {
        return Err("n_models must be positive".to_string());
    }
    if knobs.n_steps == 0 {
        return Err("n_steps must be positive".to_string());
    }
    if !(knobs.enzyme_lower > 0.0 && knobs.enzyme_lower < 1.0) {
        return Err(format!(
            "enzyme_lower must lie in (0, 1), got {}",
            knobs.enzyme_lower
        ));
    }
    if !(knobs.enzyme_upper > 1.0 && knobs.enzyme_upper.is_finite()) {
        return Err(format!(
            "enzyme_upper must be finite and greater than 1, got {}",
            knobs.enzyme_upper
        ));
    }
    if !(knobs.flux_lower > 0.0 && knobs.flux_lower < knobs.flux_upper && knobs.flux_upper.is_finite())
    {
        return Err(format!(
            "flux bounds must satisfy 0 < lower < upper, got [{}, {}]",
            knobs.flux_lower, knobs.flux_upper
        ));
    }
    if knobs.n_windows == 0 {
        return Err("n_windows must be positive".to_string());
    }
    if !knobs.eig_threshold.is_finite() {
        return Err("eig_threshold must be finite".to_string());
    }
    if !(knobs.pinv_tolerance >= 0.0 && knobs.pinv_tolerance.is_finite()) {
        return Err("pinv_tolerance must be finite and non-negative".to_string());
    }
    Ok(())
}

/// `n` evenly spaced values from `start` to `end`, both included
pub(crate) fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_builder_defaults_match_default() {
        let setup = EnsembleSetupBuilder::default().build().unwrap();
        assert_eq!(setup, EnsembleSetup::default());
        assert_eq!(setup.infeasible_draw.max_attempts(), DEFAULT_MAX_REDRAWS);
    }

    #[test]
    fn test_builder_rejects_invalid_knobs() {
        assert!(EnsembleSetupBuilder::default().n_models(0).build().is_err());
        assert!(EnsembleSetupBuilder::default().n_steps(0).build().is_err());
        assert!(EnsembleSetupBuilder::default().enzyme_lower(1.5).build().is_err());
        assert!(EnsembleSetupBuilder::default().enzyme_upper(0.5).build().is_err());
        assert!(EnsembleSetupBuilder::default()
            .flux_lower(5.0)
            .flux_upper(0.2)
            .build()
            .is_err());
        assert!(EnsembleSetupBuilder::default().n_windows(0).build().is_err());
    }

    #[test]
    fn test_deserialized_setup_is_validated() {
        let setup = EnsembleSetup {
            enzyme_lower: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            setup.validate(),
            Err(EnsembleError::InvalidSetup(_))
        ));
    }

    #[test]
    fn test_level_grids() {
        let setup = EnsembleSetupBuilder::default().n_steps(4).build().unwrap();

        let down = setup.levels_down();
        assert_eq!(down.len(), 5);
        assert_relative_eq!(down[0], 0.1);
        assert_relative_eq!(down[2], 0.55);
        assert_eq!(down[4], 1.0);

        let up = setup.levels_up();
        assert_eq!(up[0], 1.0);
        assert_eq!(up[4], 10.0);
    }

    #[test]
    fn test_flux_bin_edges_are_log_spaced() {
        let setup = EnsembleSetupBuilder::default()
            .flux_lower(0.1)
            .flux_upper(10.0)
            .n_windows(2)
            .build()
            .unwrap();
        let edges = setup.flux_bin_edges();
        assert_eq!(edges.len(), 3);
        assert_relative_eq!(edges[0], 0.1, epsilon = 1e-12);
        assert_relative_eq!(edges[1], 1.0, epsilon = 1e-12);
        assert_relative_eq!(edges[2], 10.0, epsilon = 1e-12);
    }
}
