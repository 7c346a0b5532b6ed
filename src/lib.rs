//! Kinetic Ensemble Library
//!
//! This library builds ensembles of kinetic models around a fixed metabolic
//! steady state and studies how they respond to enzyme perturbations:
//! - Sampling kinetic parameters consistent with a reference flux distribution
//! - Compiling flux sensitivities of a generalized reversible Michaelis-Menten rate law
//! - Tracing steady states along enzyme-level sweeps with a stability screen
//! - Aggregating robustness index, failure probability, flux fold change and control index
//! - Reading/writing networks, ensembles and reports as JSON

#![warn(unused_imports)]

/// Commonly used types and functionality re-exported for convenience
pub mod prelude {
    pub use crate::continuation::runner::simulate_perturbations;
    pub use crate::continuation::trajectory::*;
    pub use crate::ensemble::error::EnsembleError;
    pub use crate::ensemble::params::*;
    pub use crate::ensemble::sampler::generate_ensemble;
    pub use crate::ensemble::setup::*;
    pub use crate::io::*;
    pub use crate::kinetics::rate_law::RateLaw;
    pub use crate::network::error::NetworkError;
    pub use crate::network::reaction::*;
    pub use crate::network::reference::ReferenceState;
    pub use crate::network::stoich::{
        MetaboliteRole, ReactionEquation, ReactionKind, StoichiometricMatrix,
    };
    pub use crate::robustness::report::*;
}

/// Physical constants and default kinetic bounds
pub mod constants;

/// Network topology, reaction metadata and the reference steady state
pub mod network {
    pub mod error;
    /// Per-reaction metadata and the assembled network
    pub mod reaction;
    /// Reference fluxes, concentrations and enzyme levels
    pub mod reference;
    /// Stoichiometric matrix with identifier lookups
    pub mod stoich;
}

/// Generalized rate law and its derivatives
pub mod kinetics {
    pub mod error;
    pub mod rate_law;
}

/// Random sampling of kinetic parameter sets
pub mod ensemble {
    pub use crate::ensemble::setup::EnsembleSetup;

    pub mod error;
    pub mod params;
    pub mod sampler;
    /// Configuration of generation, continuation and aggregation
    pub mod setup;
}

/// Flux sensitivities of one ensemble member
pub mod sensitivity {
    pub mod system;
}

/// Stability-screened continuation along enzyme levels
pub mod continuation {
    /// Single-direction Euler sweep
    pub mod integrator;
    /// Parallel sweeps over a whole ensemble
    pub mod runner;
    /// Eigenvalue screen of the system Jacobian
    pub mod stability;
    pub mod trajectory;
}

/// Ensemble-level robustness metrics
pub mod robustness {
    pub mod control;
    pub mod failure;
    pub mod fold_change;
    pub mod index;
    pub mod report;
}

/// IO functionality
pub mod io;
