use thiserror::Error;

use crate::kinetics::error::KineticsError;
use crate::network::error::NetworkError;

use super::setup::EnsembleSetupBuilderError;

/// Errors raised while generating or simulating an ensemble.
///
/// Discarded members and truncated trajectories are not errors; they are
/// reported through the results and the log.
#[derive(Error, Debug)]
pub enum EnsembleError {
    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("Invalid ensemble setup: {0}")]
    InvalidSetup(String),

    #[error("Failed to build ensemble setup: {0}")]
    SetupBuildError(#[from] EnsembleSetupBuilderError),

    #[error("Invalid sampling range [{lower}, {upper}]")]
    InvalidSamplingRange { lower: f64, upper: f64 },

    #[error("Invalid number of parallel threads requested: {0}")]
    InvalidParallelism(usize),

    #[error("Requested more parallel threads than available: requested={requested}, available={available}")]
    TooManyThreads { requested: usize, available: usize },

    #[error("Failed to initialize thread pool: {0}")]
    ThreadPoolError(String),

    #[error("Every one of the {0} requested ensemble members was discarded")]
    NoFeasibleMembers(usize),

    #[error("Expected {expected} {what}, found {found}")]
    DimensionMismatch {
        what: String,
        expected: usize,
        found: usize,
    },

    #[error("Invalid rate law of reaction {reaction}: {source}")]
    InvalidRateLaw {
        reaction: String,
        #[source]
        source: KineticsError,
    },

    #[error("Reaction {0} is not part of the perturbation results")]
    UnknownEnzyme(String),

    #[error("Statistics error: {0}")]
    Statistics(String),
}
