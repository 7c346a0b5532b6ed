//! Reference steady state of the network.
//!
//! The steady-state flux distribution is fixed across the whole ensemble. When
//! measured metabolite and enzyme concentrations are available the run is
//! calibrated to them; otherwise both are all-ones vectors and every quantity
//! derived from them is relative to the reference state.

use std::collections::HashMap;

use log::warn;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use super::error::NetworkError;
use super::reaction::Network;

/// Steady-state fluxes plus reference concentrations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceState {
    fluxes: DVector<f64>,
    concentrations: DVector<f64>,
    enzymes: DVector<f64>,
    calibrated: bool,
}

impl ReferenceState {
    /// Reference state in relative mode: unit concentrations and enzyme levels.
    ///
    /// # Arguments
    ///
    /// * `network` - The network the fluxes belong to
    /// * `fluxes` - One steady-state flux per reaction, in column order
    pub fn relative(network: &Network, fluxes: &[f64]) -> Result<Self, NetworkError> {
        validate_fluxes(network, fluxes)?;

        Ok(Self {
            fluxes: DVector::from_column_slice(fluxes),
            concentrations: DVector::from_element(network.n_metabolites(), 1.0),
            enzymes: DVector::from_element(network.n_reactions(), 1.0),
            calibrated: false,
        })
    }

    /// Reference state calibrated to measured concentrations.
    ///
    /// Every metabolite needs a concentration. Reactions without a measured
    /// enzyme concentration get the mean of the supplied ones. Identifiers
    /// that are not part of the network are ignored.
    ///
    /// # Arguments
    ///
    /// * `network` - The network the fluxes belong to
    /// * `fluxes` - One steady-state flux per reaction, mmol/gCDW/h
    /// * `concentrations` - Metabolite concentrations keyed by identifier, mM
    /// * `enzymes` - Enzyme concentrations keyed by reaction identifier, mmol/gCDW
    pub fn calibrated(
        network: &Network,
        fluxes: &[f64],
        concentrations: &HashMap<String, f64>,
        enzymes: &HashMap<String, f64>,
    ) -> Result<Self, NetworkError> {
        validate_fluxes(network, fluxes)?;
        let stoich = network.stoich();

        let concentrations = stoich
            .metabolites()
            .iter()
            .map(|id| {
                let value = *concentrations
                    .get(id)
                    .ok_or_else(|| NetworkError::MissingConcentration(id.clone()))?;
                positive("metabolite concentration", id, value)
            })
            .collect::<Result<Vec<_>, _>>()?;

        for id in enzymes.keys() {
            if stoich.reaction_index(id).is_none() {
                warn!("Ignoring enzyme concentration of unknown reaction {id}");
            }
        }

        let known: Vec<(&String, f64)> = stoich
            .reactions()
            .iter()
            .filter_map(|id| enzymes.get(id).map(|&e| (id, e)))
            .collect();
        if known.is_empty() {
            return Err(NetworkError::NoEnzymeConcentrations);
        }
        for (id, value) in &known {
            positive("enzyme concentration", id, *value)?;
        }
        let mean = known.iter().map(|(_, e)| e).sum::<f64>() / known.len() as f64;

        let enzymes = stoich
            .reactions()
            .iter()
            .map(|id| enzymes.get(id).copied().unwrap_or(mean))
            .collect::<Vec<_>>();

        Ok(Self {
            fluxes: DVector::from_column_slice(fluxes),
            concentrations: DVector::from_vec(concentrations),
            enzymes: DVector::from_vec(enzymes),
            calibrated: true,
        })
    }

    pub fn fluxes(&self) -> &DVector<f64> {
        &self.fluxes
    }

    pub fn concentrations(&self) -> &DVector<f64> {
        &self.concentrations
    }

    pub fn enzymes(&self) -> &DVector<f64> {
        &self.enzymes
    }

    /// Whether concentrations are measured values rather than relative ones
    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }
}

fn positive(what: &str, id: &str, value: f64) -> Result<f64, NetworkError> {
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(NetworkError::NonPositiveReference {
            what: what.to_string(),
            id: id.to_string(),
            value,
        })
    }
}

fn validate_fluxes(network: &Network, fluxes: &[f64]) -> Result<(), NetworkError> {
    if fluxes.len() != network.n_reactions() {
        return Err(NetworkError::DimensionMismatch {
            what: "reference fluxes".to_string(),
            expected: network.n_reactions(),
            found: fluxes.len(),
        });
    }

    for (id, &flux) in network.stoich().reactions().iter().zip(fluxes.iter()) {
        if !flux.is_finite() {
            return Err(NetworkError::NonFiniteFlux(id.clone()));
        }
        if flux == 0.0 {
            return Err(NetworkError::ZeroFlux(id.clone()));
        }
        if flux < 0.0 {
            return Err(NetworkError::BackwardFlux {
                reaction: id.clone(),
                flux,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::stoich::{ReactionEquation, StoichiometricMatrix};
    use approx::assert_relative_eq;

    fn chain() -> Network {
        let stoich = StoichiometricMatrix::from_reactions(&[
            ReactionEquation::new("v_in", &[], &[("A", 1.0)]),
            ReactionEquation::new("v_mid", &[("A", 1.0)], &[("B", 1.0)]),
            ReactionEquation::new("v_out", &[("B", 1.0)], &[]),
        ])
        .unwrap();
        Network::new(stoich, HashMap::new()).unwrap()
    }

    #[test]
    fn test_relative_reference() {
        let reference = ReferenceState::relative(&chain(), &[1.0, 1.0, 1.0]).unwrap();
        assert!(!reference.is_calibrated());
        assert_eq!(reference.concentrations().len(), 2);
        assert!(reference.enzymes().iter().all(|&e| e == 1.0));
    }

    #[test]
    fn test_flux_validation() {
        let network = chain();
        assert_eq!(
            ReferenceState::relative(&network, &[1.0, f64::NAN, 1.0]),
            Err(NetworkError::NonFiniteFlux("v_mid".to_string()))
        );
        assert_eq!(
            ReferenceState::relative(&network, &[1.0, 0.0, 1.0]),
            Err(NetworkError::ZeroFlux("v_mid".to_string()))
        );
        assert!(matches!(
            ReferenceState::relative(&network, &[1.0, -1.0, 1.0]),
            Err(NetworkError::BackwardFlux { .. })
        ));
        assert!(matches!(
            ReferenceState::relative(&network, &[1.0, 1.0]),
            Err(NetworkError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_calibrated_reference_fills_missing_enzymes() {
        let network = chain();
        let concentrations = HashMap::from([("A".to_string(), 2.0), ("B".to_string(), 0.5)]);
        let enzymes = HashMap::from([
            ("v_in".to_string(), 1e-3),
            ("v_out".to_string(), 3e-3),
            ("unknown".to_string(), 1.0),
        ]);

        let reference =
            ReferenceState::calibrated(&network, &[1.0, 1.0, 1.0], &concentrations, &enzymes)
                .unwrap();

        assert!(reference.is_calibrated());
        assert_relative_eq!(reference.enzymes()[1], 2e-3);
        assert_relative_eq!(reference.concentrations()[0], 2.0);
    }

    #[test]
    fn test_calibrated_reference_requires_concentrations() {
        let network = chain();
        let concentrations = HashMap::from([("A".to_string(), 2.0)]);
        let enzymes = HashMap::from([("v_mid".to_string(), 1e-3)]);

        assert_eq!(
            ReferenceState::calibrated(&network, &[1.0, 1.0, 1.0], &concentrations, &enzymes),
            Err(NetworkError::MissingConcentration("B".to_string()))
        );
    }
}
