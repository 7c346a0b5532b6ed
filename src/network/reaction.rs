//! Per-reaction kinetic metadata.
//!
//! [`ReactionInfo`] carries the reversibility flag and the sampling ranges of the
//! affinity and equilibrium constants of one reaction. The [`Network`] pairs these
//! records with the stoichiometric matrix, aligned by reaction index.

use std::collections::{BTreeMap, HashMap};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_KEQ_REL_BOUNDS, DEFAULT_KM, DEFAULT_KM_REL_BOUNDS, R, T};

use super::error::NetworkError;
use super::stoich::{ReactionKind, StoichiometricMatrix};

/// A kinetic constant with its admissible sampling range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KineticBound {
    pub value: f64,
    pub lower: f64,
    pub upper: f64,
}

impl KineticBound {
    /// Creates a bound, checking `0 < lower <= upper`.
    pub fn new(value: f64, lower: f64, upper: f64) -> Result<Self, NetworkError> {
        if !(lower > 0.0 && lower <= upper && upper.is_finite()) {
            return Err(NetworkError::InvalidBounds {
                what: "kinetic constant".to_string(),
                lower,
                upper,
            });
        }
        Ok(Self {
            value,
            lower,
            upper,
        })
    }

    /// Bound spanning `value * relative.0 ..= value * relative.1`
    pub fn with_default_bounds(value: f64, relative: (f64, f64)) -> Self {
        Self {
            value,
            lower: value * relative.0,
            upper: value * relative.1,
        }
    }

    /// Dimensionless bound used when concentrations are relative to the reference state
    pub fn relative(relative: (f64, f64)) -> Self {
        Self::with_default_bounds(1.0, relative)
    }
}

/// Kinetic metadata of one reaction.
///
/// Affinity bounds are keyed by metabolite identifier; metabolites without an
/// explicit entry use the default Michaelis constant and its relative range.
///
/// # Examples
///
/// ```
/// use kinetic_ensemble::prelude::ReactionInfoBuilder;
///
/// let info = ReactionInfoBuilder::default()
///     .reversible(true)
///     .build()
///     .unwrap();
/// assert!(info.reversible);
/// ```
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
pub struct ReactionInfo {
    #[builder(default = "false")]
    #[serde(default)]
    pub reversible: bool,
    #[builder(default = "KineticBound::relative(DEFAULT_KEQ_REL_BOUNDS)")]
    pub keq: KineticBound,
    #[builder(default)]
    #[serde(default)]
    pub substrate_km: BTreeMap<String, KineticBound>,
    #[builder(default)]
    #[serde(default)]
    pub product_km: BTreeMap<String, KineticBound>,
}

impl Default for ReactionInfo {
    fn default() -> Self {
        Self {
            reversible: false,
            keq: KineticBound::relative(DEFAULT_KEQ_REL_BOUNDS),
            substrate_km: BTreeMap::new(),
            product_km: BTreeMap::new(),
        }
    }
}

impl ReactionInfo {
    /// Metadata whose equilibrium constant derives from a standard free energy.
    ///
    /// # Arguments
    ///
    /// * `reversible` - Whether the reaction is reversible
    /// * `delta_g` - Standard Gibbs free energy change ΔG'm in kJ/mol
    pub fn from_gibbs(reversible: bool, delta_g: f64) -> Self {
        let keq = (-delta_g / R / T).exp();
        Self {
            reversible,
            keq: KineticBound::with_default_bounds(keq, DEFAULT_KEQ_REL_BOUNDS),
            ..Default::default()
        }
    }

    /// Standard free energy implied by an equilibrium constant, kJ/mol
    pub fn gibbs_from_keq(keq: f64) -> f64 {
        -R * T * keq.ln()
    }

    pub fn substrate_km_bound(&self, metabolite: &str) -> KineticBound {
        self.substrate_km
            .get(metabolite)
            .copied()
            .unwrap_or_else(default_km_bound)
    }

    pub fn product_km_bound(&self, metabolite: &str) -> KineticBound {
        self.product_km
            .get(metabolite)
            .copied()
            .unwrap_or_else(default_km_bound)
    }

    fn validate(&self, reaction: &str) -> Result<(), NetworkError> {
        let bounds = std::iter::once(("Keq", &self.keq))
            .chain(self.substrate_km.values().map(|b| ("substrate Km", b)))
            .chain(self.product_km.values().map(|b| ("product Km", b)));

        for (what, bound) in bounds {
            if !(bound.lower > 0.0 && bound.lower <= bound.upper && bound.upper.is_finite()) {
                return Err(NetworkError::InvalidBounds {
                    what: format!("{what} of {reaction}"),
                    lower: bound.lower,
                    upper: bound.upper,
                });
            }
        }
        Ok(())
    }
}

fn default_km_bound() -> KineticBound {
    KineticBound::with_default_bounds(DEFAULT_KM, DEFAULT_KM_REL_BOUNDS)
}

/// A stoichiometric matrix together with per-reaction metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    stoich: StoichiometricMatrix,
    reactions: Vec<ReactionInfo>,
}

impl Network {
    /// Pairs reaction metadata with the columns of `stoich`.
    ///
    /// Reactions missing from `info` are irreversible with default constants.
    ///
    /// # Errors
    ///
    /// Returns a [`NetworkError`] if `info` names an unknown reaction, a bound is
    /// invalid, or an exchange pseudo-reaction is marked reversible.
    pub fn new(
        stoich: StoichiometricMatrix,
        mut info: HashMap<String, ReactionInfo>,
    ) -> Result<Self, NetworkError> {
        if let Some(unknown) = info.keys().find(|id| stoich.reaction_index(id).is_none()) {
            return Err(NetworkError::UnknownReaction(unknown.clone()));
        }

        let mut reactions = Vec::with_capacity(stoich.n_reactions());
        for (j, id) in stoich.reactions().iter().enumerate() {
            let reaction = info.remove(id).unwrap_or_default();
            if reaction.reversible && stoich.reaction_kind(j).is_pseudo() {
                return Err(NetworkError::ReversiblePseudoReaction(id.clone()));
            }
            reaction.validate(id)?;
            reactions.push(reaction);
        }

        Ok(Self { stoich, reactions })
    }

    pub fn stoich(&self) -> &StoichiometricMatrix {
        &self.stoich
    }

    pub fn reaction_info(&self, j: usize) -> &ReactionInfo {
        &self.reactions[j]
    }

    pub fn n_reactions(&self) -> usize {
        self.stoich.n_reactions()
    }

    pub fn n_metabolites(&self) -> usize {
        self.stoich.n_metabolites()
    }

    pub fn reaction_kind(&self, j: usize) -> ReactionKind {
        self.stoich.reaction_kind(j)
    }
}
