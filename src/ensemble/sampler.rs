//! Sampling of kinetic parameter sets consistent with the reference state.
//!
//! Every member draws its affinity and equilibrium constants log-uniformly within
//! their bounds and then back-solves the catalytic rate constants so that the
//! reference concentrations and enzyme levels carry exactly the reference flux.
//!
//! Members are seeded independently from the ensemble seed and their index, so a
//! member's draws never depend on other members or on the number of threads.

use log::{debug, info, warn};
use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::constants::{
    DEFAULT_KEQ_REL_BOUNDS, DEFAULT_KM, DEFAULT_KM_REL_BOUNDS, SECONDS_PER_HOUR,
};
use crate::kinetics::error::KineticsError;
use crate::kinetics::rate_law::{gibbs_energy, RateLaw};
use crate::network::reaction::{KineticBound, Network};
use crate::network::reference::ReferenceState;
use crate::network::stoich::RateLawOperands;

use super::error::EnsembleError;
use super::params::{Ensemble, KineticParameterSet, ReactionKinetics};
use super::setup::EnsembleSetup;

/// Log-uniform distribution on `[lower, upper]`.
///
/// Samples are `10^(log10(lower) + (log10(upper) - log10(lower)) · u)` with
/// `u ~ U(0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogUniform {
    log_lower: f64,
    log_upper: f64,
}

impl LogUniform {
    pub fn new(lower: f64, upper: f64) -> Result<Self, EnsembleError> {
        if !(lower > 0.0 && lower <= upper && upper.is_finite()) {
            return Err(EnsembleError::InvalidSamplingRange { lower, upper });
        }
        Ok(Self {
            log_lower: lower.log10(),
            log_upper: upper.log10(),
        })
    }

    pub fn from_bound(bound: &KineticBound) -> Result<Self, EnsembleError> {
        Self::new(bound.lower, bound.upper)
    }
}

impl Distribution<f64> for LogUniform {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let u: f64 = rng.gen();
        10f64.powf(self.log_lower + (self.log_upper - self.log_lower) * u)
    }
}

/// Everything needed to sample one reaction, resolved once per ensemble.
#[derive(Debug, Clone)]
struct ReactionTemplate {
    id: String,
    reversible: bool,
    operands: RateLawOperands,
    substrate_kms: Vec<LogUniform>,
    product_kms: Vec<LogUniform>,
    keq: Option<LogUniform>,
    log_substrates: Vec<f64>,
    log_products: Vec<f64>,
    flux: f64,
    enzyme: f64,
}

/// Draws ensemble members for a network at a fixed reference state.
///
/// In relative mode every affinity is drawn from the default relative range and
/// every equilibrium constant from `[1, 10]`. In calibrated mode the per-reaction
/// bounds of the network apply, pseudo-reactions use the absolute default range
/// around 0.2 mM, and catalytic rates are converted from per-hour fluxes to
/// per-second turnover.
#[derive(Debug, Clone)]
pub struct EnsembleGenerator {
    templates: Vec<ReactionTemplate>,
    unit_scale: f64,
}

impl EnsembleGenerator {
    /// Resolves sampling ranges and reference concentrations for every reaction.
    ///
    /// # Errors
    ///
    /// Returns an [`EnsembleError`] if the reference state does not match the
    /// network or a sampling range is invalid.
    pub fn new(network: &Network, reference: &ReferenceState) -> Result<Self, EnsembleError> {
        let stoich = network.stoich();
        if reference.fluxes().len() != network.n_reactions() {
            return Err(EnsembleError::DimensionMismatch {
                what: "reference fluxes".to_string(),
                expected: network.n_reactions(),
                found: reference.fluxes().len(),
            });
        }
        if reference.concentrations().len() != network.n_metabolites() {
            return Err(EnsembleError::DimensionMismatch {
                what: "reference concentrations".to_string(),
                expected: network.n_metabolites(),
                found: reference.concentrations().len(),
            });
        }

        let calibrated = reference.is_calibrated();
        let concentrations = reference.concentrations().as_slice();
        let relative_km = KineticBound::relative(DEFAULT_KM_REL_BOUNDS);
        let absolute_km = KineticBound::with_default_bounds(DEFAULT_KM, DEFAULT_KM_REL_BOUNDS);

        let mut templates = Vec::with_capacity(network.n_reactions());
        for (j, id) in stoich.reactions().iter().enumerate() {
            let info = network.reaction_info(j);
            let operands = stoich.rate_law_operands(j);
            let pseudo = network.reaction_kind(j).is_pseudo();

            let substrate_kms = operands
                .substrates
                .iter()
                .map(|(i, _)| {
                    let bound = match (calibrated, i) {
                        (false, _) => relative_km,
                        (true, Some(i)) if !pseudo => {
                            info.substrate_km_bound(&stoich.metabolites()[*i])
                        }
                        (true, _) => absolute_km,
                    };
                    LogUniform::from_bound(&bound)
                })
                .collect::<Result<Vec<_>, _>>()?;

            let (product_kms, keq) = if info.reversible {
                let product_kms = operands
                    .products
                    .iter()
                    .map(|(i, _)| {
                        let bound = if calibrated {
                            info.product_km_bound(&stoich.metabolites()[*i])
                        } else {
                            relative_km
                        };
                        LogUniform::from_bound(&bound)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let keq_bound = if calibrated {
                    info.keq
                } else {
                    KineticBound::relative(DEFAULT_KEQ_REL_BOUNDS)
                };
                (product_kms, Some(LogUniform::from_bound(&keq_bound)?))
            } else {
                (Vec::new(), None)
            };

            let log_substrates = operands
                .substrate_concentrations(concentrations)
                .iter()
                .map(|c| c.ln())
                .collect();
            let log_products = operands
                .product_concentrations(concentrations)
                .iter()
                .map(|c| c.ln())
                .collect();

            templates.push(ReactionTemplate {
                id: id.clone(),
                reversible: info.reversible,
                operands,
                substrate_kms,
                product_kms,
                keq,
                log_substrates,
                log_products,
                flux: reference.fluxes()[j],
                enzyme: reference.enzymes()[j],
            });
        }

        Ok(Self {
            templates,
            unit_scale: if calibrated { SECONDS_PER_HOUR } else { 1.0 },
        })
    }

    /// Draws one member from the given random source.
    ///
    /// # Errors
    ///
    /// Returns a [`KineticsError`] if any reaction of the draw is thermodynamically
    /// infeasible at the reference state or yields an unusable catalytic rate.
    pub fn sample_member<R: Rng + ?Sized>(
        &self,
        member: usize,
        rng: &mut R,
    ) -> Result<KineticParameterSet, KineticsError> {
        let mut reactions = Vec::with_capacity(self.templates.len());

        for template in &self.templates {
            let substrate_kms: Vec<f64> =
                template.substrate_kms.iter().map(|d| d.sample(&mut *rng)).collect();

            let law = match template.keq {
                Some(keq) => {
                    let product_kms = template.product_kms.iter().map(|d| d.sample(&mut *rng)).collect();
                    RateLaw::reversible(
                        template.operands.substrate_coefficients(),
                        substrate_kms,
                        template.operands.product_coefficients(),
                        product_kms,
                        keq.sample(rng),
                    )
                }
                None => RateLaw::irreversible(template.operands.substrate_coefficients(), substrate_kms),
            };

            // Enzyme level needed at kcat = 1 is flux / f, hence kcat = E1 / Eref
            let unit_enzyme = law
                .required_enzyme(
                    &template.log_substrates,
                    &template.log_products,
                    template.flux,
                    1.0,
                    if template.reversible { gibbs_energy(law.keq) } else { 0.0 },
                )
                .inspect_err(|e| debug!("Member {member}: reaction {} rejected: {e}", template.id))?;
            let kcat = unit_enzyme / template.enzyme / self.unit_scale;

            if !(kcat.is_finite() && kcat > 0.0) {
                debug!("Member {member}: reaction {} got kcat {kcat}", template.id);
                return Err(KineticsError::NonFiniteVelocity);
            }

            reactions.push(ReactionKinetics { law, kcat });
        }

        Ok(KineticParameterSet { member, reactions })
    }

    /// Draws one member from its own seeded generator, applying the redraw policy.
    ///
    /// Returns `None` if every allowed draw was infeasible.
    pub fn draw_member(&self, member: usize, setup: &EnsembleSetup) -> Option<KineticParameterSet> {
        let mut rng = StdRng::seed_from_u64(member_seed(setup.seed, member));
        let max_attempts = setup.infeasible_draw.max_attempts();

        for attempt in 1..=max_attempts {
            match self.sample_member(member, &mut rng) {
                Ok(params) => {
                    if attempt > 1 {
                        debug!("Member {member} accepted after {attempt} draws");
                    }
                    return Some(params);
                }
                Err(e) if attempt == max_attempts => {
                    warn!("Member {member} discarded after {attempt} infeasible draws: {e}");
                }
                Err(_) => {}
            }
        }
        None
    }

    /// Generates the ensemble described by `setup`.
    ///
    /// # Errors
    ///
    /// Returns [`EnsembleError::NoFeasibleMembers`] if every member was discarded.
    pub fn generate(&self, setup: &EnsembleSetup) -> Result<Ensemble, EnsembleError> {
        setup.validate()?;

        let members: Vec<KineticParameterSet> = (0..setup.n_models)
            .filter_map(|i| self.draw_member(i, setup))
            .collect();

        if members.is_empty() {
            return Err(EnsembleError::NoFeasibleMembers(setup.n_models));
        }
        info!(
            "Sampled {} of {} ensemble members",
            members.len(),
            setup.n_models
        );

        Ok(Ensemble {
            n_requested: setup.n_models,
            seed: setup.seed,
            members,
        })
    }
}

/// Seed of the generator of one member.
///
/// The member index is spread by the golden-ratio increment, folded into the
/// ensemble seed and passed through the splitmix64 finalizer. Member `i` of
/// seed `s` and member `i - 1` of seed `s + 1` get unrelated streams.
pub(crate) fn member_seed(seed: u64, member: usize) -> u64 {
    let mut z = seed ^ (member as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Generates an ensemble for `network` at `reference`.
pub fn generate_ensemble(
    network: &Network,
    reference: &ReferenceState,
    setup: &EnsembleSetup,
) -> Result<Ensemble, EnsembleError> {
    EnsembleGenerator::new(network, reference)?.generate(setup)
}
