//! Sampled kinetic parameters of the ensemble members.

use serde::{Deserialize, Serialize};

use crate::kinetics::rate_law::RateLaw;

/// Kinetic constants of one reaction in one ensemble member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionKinetics {
    pub law: RateLaw,
    /// Back-solved so that the reference state carries the reference flux
    pub kcat: f64,
}

impl ReactionKinetics {
    pub fn reversible(&self) -> bool {
        self.law.reversible
    }

    pub fn substrate_affinities(&self) -> &[f64] {
        &self.law.substrate_kms
    }

    pub fn product_affinities(&self) -> &[f64] {
        &self.law.product_kms
    }

    /// Equilibrium constant, 0 for irreversible reactions
    pub fn equilibrium_constant(&self) -> f64 {
        self.law.keq
    }
}

/// One fully sampled member of the ensemble, one entry per reaction in column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KineticParameterSet {
    /// Index of the member in the requested ensemble
    pub member: usize,
    pub reactions: Vec<ReactionKinetics>,
}

impl KineticParameterSet {
    pub fn n_reactions(&self) -> usize {
        self.reactions.len()
    }

    pub fn kcats(&self) -> Vec<f64> {
        self.reactions.iter().map(|r| r.kcat).collect()
    }
}

/// The retained members of an ensemble.
///
/// Members discarded during sampling leave a gap in the member indices; the
/// indices of the retained ones always refer to the originally requested slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ensemble {
    pub(crate) n_requested: usize,
    pub(crate) seed: u64,
    pub(crate) members: Vec<KineticParameterSet>,
}

impl Ensemble {
    pub fn members(&self) -> &[KineticParameterSet] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Number of members originally requested
    pub fn n_requested(&self) -> usize {
        self.n_requested
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Member indices that were discarded during sampling
    pub fn discarded(&self) -> Vec<usize> {
        let mut retained = self.members.iter().map(|m| m.member).peekable();
        (0..self.n_requested)
            .filter(|&i| {
                if retained.peek() == Some(&i) {
                    retained.next();
                    false
                } else {
                    true
                }
            })
            .collect()
    }

    pub fn member(&self, index: usize) -> Option<&KineticParameterSet> {
        self.members.iter().find(|m| m.member == index)
    }
}
