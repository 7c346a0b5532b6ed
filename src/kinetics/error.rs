use thiserror::Error;

/// Failures of the generalized rate law.
///
/// These are local outcomes of sampling, never fatal to an ensemble run: an
/// infeasible draw is re-drawn or its member discarded.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KineticsError {
    /// The driving-force term `1 - exp(ΔG'm/RT + Σ ln P - Σ ln S)` is not in (0, 1).
    #[error("Thermodynamically infeasible: driving force {driving_force} is not positive")]
    ThermodynamicallyInfeasible { driving_force: f64 },

    #[error("Rate law evaluated to a non-finite value")]
    NonFiniteVelocity,

    #[error("Expected {expected} {what}, found {found}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
}
