//! Physical constants and modeling defaults.
//!
//! Concentrations are in mM, fluxes in mmol/gCDW/h and catalytic rates in 1/s
//! when a run is calibrated to measured values. In relative mode every
//! reference concentration and enzyme level is 1 and all quantities are
//! dimensionless.

/// Ideal gas constant, kJ/mol/K
pub const R: f64 = 8.315e-3;
/// Absolute temperature, K (25 °C)
pub const T: f64 = 298.15;

/// Default Michaelis constant, mM
pub const DEFAULT_KM: f64 = 0.2;

/// Relative range of Michaelis constants around their default
pub const DEFAULT_KM_REL_BOUNDS: (f64, f64) = (0.1, 10.0);
/// Relative range of equilibrium constants around their default
pub const DEFAULT_KEQ_REL_BOUNDS: (f64, f64) = (1.0, 10.0);

/// Number of ensemble members
pub const DEFAULT_N_MODELS: usize = 100;
/// Relative enzyme-level range swept around the reference state
pub const DEFAULT_ENZYME_REL_BOUNDS: (f64, f64) = (0.1, 10.0);
/// Number of continuation steps per sweep direction
pub const DEFAULT_N_STEPS: usize = 100;
/// Largest admissible real part of a Jacobian eigenvalue
pub const DEFAULT_EIG_THRESHOLD: f64 = 1e-6;
/// Singular values below this are treated as zero in the pseudo-inverse
pub const DEFAULT_PINV_TOLERANCE: f64 = 1e-12;

/// Fold-change range covered by the flux histograms
pub const DEFAULT_FLUX_BOUNDS: (f64, f64) = (0.2, 5.0);
/// Number of log-spaced histogram bins
pub const DEFAULT_N_WINDOWS: usize = 49;
/// Attempts per member before an infeasible draw discards it
pub const DEFAULT_MAX_REDRAWS: usize = 100;

/// Fluxes are given per hour, catalytic rates per second
pub const SECONDS_PER_HOUR: f64 = 3600.0;

/// Spread of ln(E) around ln(Eref) used by the robustness index
pub const ROBUSTNESS_SIGMA: f64 = 0.5;
/// Survival probabilities at or below zero are replaced by this floor
pub const PROBABILITY_FLOOR: f64 = 1e-4;

/// Driving forces at or below this are thermodynamically infeasible
pub const MIN_DRIVING_FORCE: f64 = 1e-12;
