//! Network Error Module
//!
//! Structural problems with the network inputs. Every variant of [`NetworkError`]
//! is fatal: it is raised while the stoichiometric matrix, the reaction metadata
//! or the reference state are assembled, before any ensemble work begins.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetworkError {
    #[error("Stoichiometric matrix has no metabolites or no reactions")]
    EmptyMatrix,
    #[error("Dimension mismatch for {what}: expected {expected}, found {found}")]
    DimensionMismatch {
        what: String,
        expected: usize,
        found: usize,
    },
    #[error("Duplicate identifier: {0}")]
    DuplicateId(String),
    #[error("Unknown metabolite: {0}")]
    UnknownMetabolite(String),
    #[error("Unknown reaction: {0}")]
    UnknownReaction(String),
    #[error("Non-finite stoichiometric coefficient for {metabolite} in {reaction}")]
    NonFiniteCoefficient { metabolite: String, reaction: String },
    #[error("Reaction {0} has neither substrates nor products")]
    EmptyReaction(String),
    #[error("Non-finite reference flux for reaction {0}")]
    NonFiniteFlux(String),
    #[error("Reference flux of reaction {0} is zero")]
    ZeroFlux(String),
    #[error("Reaction {reaction} carries a flux of {flux} against its written direction")]
    BackwardFlux { reaction: String, flux: f64 },
    #[error("Reference {what} of {id} must be positive and finite, found {value}")]
    NonPositiveReference {
        what: String,
        id: String,
        value: f64,
    },
    #[error("Invalid bounds for {what}: lower={lower}, upper={upper}")]
    InvalidBounds { what: String, lower: f64, upper: f64 },
    #[error("No reference concentration supplied for metabolite {0}")]
    MissingConcentration(String),
    #[error("No reference enzyme concentration supplied for any reaction")]
    NoEnzymeConcentrations,
    #[error("Pseudo-reaction {0} must be irreversible")]
    ReversiblePseudoReaction(String),
}
