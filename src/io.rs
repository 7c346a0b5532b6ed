use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::continuation::trajectory::PerturbationResults;
use crate::ensemble::params::Ensemble;
use crate::ensemble::setup::EnsembleSetup;
use crate::network::reaction::Network;
use crate::network::reference::ReferenceState;
use crate::robustness::report::RobustnessReport;

/// Loads a reaction network from a JSON file.
///
/// # Errors
///
/// This function will return an error if:
/// * The file cannot be found or opened (`IOError::FileNotFound`)
/// * The file contents cannot be parsed as a network (`IOError::JsonParseError`)
pub fn load_network(path: impl Into<PathBuf>) -> Result<Network, IOError> {
    load_json(path)
}

pub fn save_network(path: impl Into<PathBuf>, network: &Network) -> Result<(), IOError> {
    save_json(path, network)
}

/// Loads a reference steady state from a JSON file.
pub fn load_reference(path: impl Into<PathBuf>) -> Result<ReferenceState, IOError> {
    load_json(path)
}

pub fn save_reference(path: impl Into<PathBuf>, reference: &ReferenceState) -> Result<(), IOError> {
    save_json(path, reference)
}

/// Loads an ensemble setup from a JSON file and re-checks its knobs.
///
/// # Errors
///
/// Besides the file and JSON errors, returns `IOError::InvalidSetup` if the
/// stored setup would have been rejected by the builder.
pub fn load_setup(path: impl Into<PathBuf>) -> Result<EnsembleSetup, IOError> {
    let setup: EnsembleSetup = load_json(path)?;
    setup
        .validate()
        .map_err(|e| IOError::InvalidSetup(e.to_string()))?;
    Ok(setup)
}

pub fn save_setup(path: impl Into<PathBuf>, setup: &EnsembleSetup) -> Result<(), IOError> {
    save_json(path, setup)
}

/// Loads a sampled ensemble from a JSON file.
pub fn load_ensemble(path: impl Into<PathBuf>) -> Result<Ensemble, IOError> {
    load_json(path)
}

/// Saves a sampled ensemble to a JSON file.
///
/// # Arguments
///
/// * `path` - Destination of the JSON file
/// * `ensemble` - The ensemble to save
pub fn save_ensemble(path: impl Into<PathBuf>, ensemble: &Ensemble) -> Result<(), IOError> {
    save_json(path, ensemble)
}

pub fn load_results(path: impl Into<PathBuf>) -> Result<PerturbationResults, IOError> {
    load_json(path)
}

pub fn save_results(path: impl Into<PathBuf>, results: &PerturbationResults) -> Result<(), IOError> {
    save_json(path, results)
}

pub fn load_report(path: impl Into<PathBuf>) -> Result<RobustnessReport, IOError> {
    load_json(path)
}

/// Saves a robustness report to a pretty-printed JSON file.
pub fn save_report(path: impl Into<PathBuf>, report: &RobustnessReport) -> Result<(), IOError> {
    save_json(path, report)
}

fn load_json<T: DeserializeOwned>(path: impl Into<PathBuf>) -> Result<T, IOError> {
    let path = path.into();
    let file = std::fs::File::open(path).map_err(IOError::FileNotFound)?;
    serde_json::from_reader(std::io::BufReader::new(file)).map_err(IOError::JsonParseError)
}

fn save_json<T: Serialize>(path: impl Into<PathBuf>, value: &T) -> Result<(), IOError> {
    let path = path.into();
    let file = std::fs::File::create(path).map_err(IOError::FileNotFound)?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), value)
        .map_err(IOError::JsonParseError)
}

/// Errors raised while reading or writing JSON files.
#[derive(Error, Debug)]
pub enum IOError {
    /// The file could not be found, opened or created.
    #[error("File not found: {0}")]
    FileNotFound(#[from] std::io::Error),

    /// The file contents could not be parsed or written as JSON.
    #[error("Failed to parse JSON: {0}")]
    JsonParseError(#[from] serde_json::Error),

    #[error("Stored ensemble setup is invalid: {0}")]
    InvalidSetup(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use crate::ensemble::setup::EnsembleSetupBuilder;
    use crate::network::stoich::{ReactionEquation, StoichiometricMatrix};

    fn chain() -> Network {
        let stoich = StoichiometricMatrix::from_reactions(&[
            ReactionEquation::new("v_in", &[], &[("A", 1.0)]),
            ReactionEquation::new("v1", &[("A", 1.0)], &[("B", 1.0)]),
            ReactionEquation::new("v_out", &[("B", 1.0)], &[]),
        ])
        .unwrap();
        Network::new(stoich, HashMap::new()).unwrap()
    }

    #[test]
    fn test_network_and_reference_survive_a_file() {
        let dir = tempdir().unwrap();
        let network = chain();
        let reference = ReferenceState::relative(&network, &[1.0, 1.0, 1.0]).unwrap();

        save_network(dir.path().join("network.json"), &network).unwrap();
        save_reference(dir.path().join("reference.json"), &reference).unwrap();

        assert_eq!(load_network(dir.path().join("network.json")).unwrap(), network);
        assert_eq!(
            load_reference(dir.path().join("reference.json")).unwrap(),
            reference
        );
    }

    #[test]
    fn test_setup_is_validated_on_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("setup.json");

        let setup = EnsembleSetupBuilder::default()
            .n_models(7)
            .seed(42)
            .build()
            .unwrap();
        save_setup(&path, &setup).unwrap();
        assert_eq!(load_setup(&path).unwrap(), setup);

        let mut broken = serde_json::to_value(&setup).unwrap();
        broken["n_steps"] = serde_json::json!(0);
        std::fs::write(&path, broken.to_string()).unwrap();
        assert!(matches!(load_setup(&path), Err(IOError::InvalidSetup(_))));
    }

    #[test]
    fn test_missing_file_and_bad_json() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            load_ensemble(dir.path().join("missing.json")),
            Err(IOError::FileNotFound(_))
        ));

        let path = dir.path().join("garbage.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_report(&path), Err(IOError::JsonParseError(_))));
    }
}
