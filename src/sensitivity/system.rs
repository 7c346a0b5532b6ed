//! Flux vector and its sensitivities for one ensemble member.
//!
//! The state of the continuation is the vector `X` of concentrations of the
//! balanced metabolites; unbalanced metabolites stay at their reference
//! concentration. For enzyme levels `E` the fluxes are
//!
//! ```text
//! V_r(E, X) = scale · kcat_r · E_r · f_r(S_r(X), P_r(X))
//! ```
//!
//! where `scale` converts per-second turnover to the units of the reference
//! fluxes. The system Jacobian is `J = S_bal · ∂V/∂X`, and `∂V/∂E` is diagonal
//! with entries `scale · kcat_r · f_r`.

use nalgebra::{DMatrix, DVector};

use crate::constants::SECONDS_PER_HOUR;
use crate::ensemble::error::EnsembleError;
use crate::ensemble::params::KineticParameterSet;
use crate::kinetics::rate_law::RateLaw;
use crate::network::reaction::Network;
use crate::network::reference::ReferenceState;
use crate::network::stoich::RateLawOperands;

/// Rate law of one reaction bound to state-vector positions.
#[derive(Debug, Clone)]
struct CompiledReaction {
    law: RateLaw,
    kcat: f64,
    operands: RateLawOperands,
}

/// Fluxes and sensitivities evaluated at one `(E, X)` point.
#[derive(Debug, Clone)]
pub struct Linearization {
    pub fluxes: DVector<f64>,
    /// `∂V/∂X`, reactions × balanced metabolites
    pub flux_jacobian: DMatrix<f64>,
    /// Diagonal of `∂V/∂E`
    pub enzyme_sensitivity: DVector<f64>,
    /// `S_bal · ∂V/∂X`
    pub jacobian: DMatrix<f64>,
}

/// Sensitivity equations of one ensemble member, compiled once and evaluated
/// at every continuation step.
#[derive(Debug, Clone)]
pub struct SensitivitySystem {
    reactions: Vec<CompiledReaction>,
    balance: DMatrix<f64>,
    balanced: Vec<usize>,
    /// Position of each metabolite in the state vector, `None` if unbalanced
    state_position: Vec<Option<usize>>,
    reference_concentrations: DVector<f64>,
    reference_enzymes: DVector<f64>,
    reference_fluxes: DVector<f64>,
    scale: f64,
}

impl SensitivitySystem {
    /// Compiles the flux equations of `params` over `network`.
    ///
    /// # Errors
    ///
    /// Returns [`EnsembleError::DimensionMismatch`] if the parameter set does not
    /// cover every reaction of the network or a rate law has a different number
    /// of substrates or products than its reaction, and
    /// [`EnsembleError::InvalidRateLaw`] if its affinities do not match its own
    /// coefficients.
    pub fn new(
        network: &Network,
        reference: &ReferenceState,
        params: &KineticParameterSet,
    ) -> Result<Self, EnsembleError> {
        let stoich = network.stoich();
        if params.n_reactions() != stoich.n_reactions() {
            return Err(EnsembleError::DimensionMismatch {
                what: "reaction kinetics".to_string(),
                expected: stoich.n_reactions(),
                found: params.n_reactions(),
            });
        }

        let reactions = params
            .reactions
            .iter()
            .enumerate()
            .map(|(j, kinetics)| {
                let operands = stoich.rate_law_operands(j);
                check_rate_law(&stoich.reactions()[j], &kinetics.law, &operands)?;
                Ok(CompiledReaction {
                    law: kinetics.law.clone(),
                    kcat: kinetics.kcat,
                    operands,
                })
            })
            .collect::<Result<Vec<_>, EnsembleError>>()?;

        let balanced = stoich.balanced_indices();
        let mut state_position = vec![None; stoich.n_metabolites()];
        for (k, &i) in balanced.iter().enumerate() {
            state_position[i] = Some(k);
        }

        Ok(Self {
            reactions,
            balance: stoich.balance_view(),
            balanced,
            state_position,
            reference_concentrations: reference.concentrations().clone(),
            reference_enzymes: reference.enzymes().clone(),
            reference_fluxes: reference.fluxes().clone(),
            scale: if reference.is_calibrated() {
                SECONDS_PER_HOUR
            } else {
                1.0
            },
        })
    }

    pub fn n_reactions(&self) -> usize {
        self.reactions.len()
    }

    /// Dimension of the state vector
    pub fn n_balanced(&self) -> usize {
        self.balanced.len()
    }

    /// `S_bal`, balanced metabolites × reactions
    pub fn balance_matrix(&self) -> &DMatrix<f64> {
        &self.balance
    }

    pub fn reference_enzymes(&self) -> &DVector<f64> {
        &self.reference_enzymes
    }

    pub fn reference_fluxes(&self) -> &DVector<f64> {
        &self.reference_fluxes
    }

    /// Balanced concentrations of the reference state
    pub fn reference_state(&self) -> DVector<f64> {
        DVector::from_iterator(
            self.balanced.len(),
            self.balanced
                .iter()
                .map(|&i| self.reference_concentrations[i]),
        )
    }

    /// Full metabolite vector with the state inserted at the balanced rows
    pub fn full_concentrations(&self, state: &DVector<f64>) -> DVector<f64> {
        let mut full = self.reference_concentrations.clone();
        for (k, &i) in self.balanced.iter().enumerate() {
            full[i] = state[k];
        }
        full
    }

    /// Reference enzyme levels with the level of `enzyme` replaced
    pub fn enzymes_with(&self, enzyme: usize, level: f64) -> DVector<f64> {
        let mut enzymes = self.reference_enzymes.clone();
        enzymes[enzyme] = level;
        enzymes
    }

    /// Flux vector `V(E, X)` in the units of the reference fluxes
    pub fn fluxes(&self, enzymes: &DVector<f64>, state: &DVector<f64>) -> DVector<f64> {
        let full = self.full_concentrations(state);
        let concentrations = full.as_slice();

        DVector::from_iterator(
            self.reactions.len(),
            self.reactions.iter().enumerate().map(|(j, reaction)| {
                let s = reaction.operands.substrate_concentrations(concentrations);
                let p = reaction.operands.product_concentrations(concentrations);
                self.scale * reaction.kcat * enzymes[j] * reaction.law.velocity(&s, &p)
            }),
        )
    }

    /// System Jacobian `S_bal · ∂V/∂X` at `(E, X)`
    pub fn jacobian(&self, enzymes: &DVector<f64>, state: &DVector<f64>) -> DMatrix<f64> {
        self.linearize(enzymes, state).jacobian
    }

    /// Evaluates fluxes, `∂V/∂X`, `∂V/∂E` and the system Jacobian in one pass.
    pub fn linearize(&self, enzymes: &DVector<f64>, state: &DVector<f64>) -> Linearization {
        let full = self.full_concentrations(state);
        let concentrations = full.as_slice();
        let n_r = self.reactions.len();

        let mut fluxes = DVector::zeros(n_r);
        let mut enzyme_sensitivity = DVector::zeros(n_r);
        let mut flux_jacobian = DMatrix::zeros(n_r, self.balanced.len());

        for (j, reaction) in self.reactions.iter().enumerate() {
            let s = reaction.operands.substrate_concentrations(concentrations);
            let p = reaction.operands.product_concentrations(concentrations);
            let factor = reaction.law.velocity_with_partials(&s, &p);

            let capacity = self.scale * reaction.kcat;
            fluxes[j] = capacity * enzymes[j] * factor.value;
            enzyme_sensitivity[j] = capacity * factor.value;

            let substrate_terms = reaction
                .operands
                .substrates
                .iter()
                .zip(&factor.d_substrates)
                .filter_map(|((i, _), d)| i.map(|i| (i, *d)));
            let product_terms = reaction
                .operands
                .products
                .iter()
                .map(|(i, _)| *i)
                .zip(factor.d_products.iter().copied());

            for (i, d) in substrate_terms.chain(product_terms) {
                if let Some(k) = self.state_position[i] {
                    flux_jacobian[(j, k)] += capacity * enzymes[j] * d;
                }
            }
        }

        let jacobian = &self.balance * &flux_jacobian;

        Linearization {
            fluxes,
            flux_jacobian,
            enzyme_sensitivity,
            jacobian,
        }
    }
}

/// Rate law of reaction `id` must cover exactly the operands of its column.
fn check_rate_law(id: &str, law: &RateLaw, operands: &RateLawOperands) -> Result<(), EnsembleError> {
    law.validate().map_err(|source| EnsembleError::InvalidRateLaw {
        reaction: id.to_string(),
        source,
    })?;

    let expected_products = if law.reversible {
        operands.products.len()
    } else {
        0
    };
    let sides = [
        ("substrates", operands.substrates.len(), law.substrate_coefficients.len()),
        ("products", expected_products, law.product_coefficients.len()),
    ];
    for (side, expected, found) in sides {
        if expected != found {
            return Err(EnsembleError::DimensionMismatch {
                what: format!("rate-law {side} of reaction {id}"),
                expected,
                found,
            });
        }
    }
    Ok(())
}
