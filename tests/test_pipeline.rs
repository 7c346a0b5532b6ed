#[cfg(test)]
mod test_pipeline {
    use std::collections::HashMap;

    use approx::assert_relative_eq;
    use kinetic_ensemble::prelude::*;
    use kinetic_ensemble::sensitivity::system::SensitivitySystem;
    use pretty_assertions::assert_eq;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    /// A → B → C with the boundary metabolites A and C held constant
    fn open_chain() -> Network {
        let stoich = StoichiometricMatrix::from_reactions(&[
            ReactionEquation::new("R1", &[("A", 1.0)], &[("B", 1.0)]),
            ReactionEquation::new("R2", &[("B", 1.0)], &[("C", 1.0)]),
        ])
        .unwrap()
        .exclude_from_balance(&["A", "C"])
        .unwrap();
        Network::new(stoich, HashMap::new()).unwrap()
    }

    fn setup(n_models: usize, n_steps: usize, seed: u64) -> EnsembleSetup {
        EnsembleSetupBuilder::default()
            .n_models(n_models)
            .n_steps(n_steps)
            .seed(seed)
            .build()
            .unwrap()
    }

    /// A ⇌ B → C with A and C held constant. B inhibits its own supply through
    /// the reversible first step, so the chain flux is shared between both
    /// enzymes and only the continuation knows how B settles.
    fn reversible_head_chain() -> Network {
        let stoich = StoichiometricMatrix::from_reactions(&[
            ReactionEquation::new("R1", &[("A", 1.0)], &[("B", 1.0)]),
            ReactionEquation::new("R2", &[("B", 1.0)], &[("C", 1.0)]),
        ])
        .unwrap()
        .exclude_from_balance(&["A", "C"])
        .unwrap();
        let info = HashMap::from([(
            "R1".to_string(),
            ReactionInfoBuilder::default().reversible(true).build().unwrap(),
        )]);
        Network::new(stoich, info).unwrap()
    }

    /// Sweeping the second enzyme of a chain down must lower its own flux at
    /// every recorded step while B builds up and stays positive.
    #[test]
    fn test_downward_sweep_lowers_own_flux() {
        // ARRANGE
        init_logger();
        let network = reversible_head_chain();
        let reference = ReferenceState::relative(&network, &[1.0, 1.0]).unwrap();
        let setup = setup(10, 100, 3);

        // ACT
        let ensemble = generate_ensemble(&network, &reference, &setup).unwrap();
        let results = simulate_perturbations(&network, &reference, &ensemble, &setup).unwrap();

        // ASSERT
        assert!(results.unstable.is_empty());
        assert_eq!(results.n_retained(), ensemble.len());
        assert_eq!(results.enzymes, vec![0, 1]);

        for member in &results.members {
            let params = ensemble.member(member.member).unwrap();
            let system = SensitivitySystem::new(&network, &reference, params).unwrap();
            let down = &member.response(1).unwrap().down;
            assert!(down.points.len() > 1);

            let fluxes: Vec<f64> = down
                .points
                .iter()
                .map(|p| system.fluxes(&system.enzymes_with(1, p.enzyme_level), &p.concentrations)[1])
                .collect();

            assert_relative_eq!(fluxes[0], 1.0, epsilon = 1e-9);
            for pair in fluxes.windows(2) {
                assert!(pair[1] < pair[0]);
            }
            // the drop is damped by the rise of B, never proportional to the enzyme
            let last = down.points.last().unwrap();
            assert!(*fluxes.last().unwrap() > last.enzyme_level);
            for pair in down.points.windows(2) {
                assert!(pair[1].concentrations[0] > pair[0].concentrations[0]);
            }
            for point in &down.points {
                assert!(point.concentrations.iter().all(|&x| x > 0.0));
            }
        }
    }

    /// An autocatalytic loop `A → B → 2A` amplifies any excess of A; every
    /// member must fail the stability screen and contribute nothing.
    #[test]
    fn test_unstable_loop_is_discarded() {
        // ARRANGE
        init_logger();
        let stoich = StoichiometricMatrix::from_reactions(&[
            ReactionEquation::new("R1", &[("A", 1.0)], &[("B", 1.0)]),
            ReactionEquation::new("R2", &[("B", 1.0)], &[("A", 2.0)]),
        ])
        .unwrap();
        let network = Network::new(stoich, HashMap::new()).unwrap();
        let reference = ReferenceState::relative(&network, &[1.0, 1.0]).unwrap();
        let setup = setup(5, 10, 11);

        // ACT
        let run = run(&network, &reference, &setup).unwrap();

        // ASSERT
        assert_eq!(run.ensemble.len(), 5);
        assert_eq!(run.results.n_retained(), 0);
        assert_eq!(run.results.unstable, vec![0, 1, 2, 3, 4]);

        assert_eq!(run.report.n_retained, 0);
        assert_eq!(run.report.enzymes.len(), 2);
        for enzyme in &run.report.enzymes {
            assert_eq!(enzyme.robustness_index, None);
            assert!(enzyme.failure.probabilities.iter().all(Option::is_none));
            assert!(enzyme.fold_change.observed.iter().all(|&n| n == 0));
            assert!(enzyme.control.down.is_empty() && enzyme.control.up.is_empty());
        }
    }

    #[test]
    fn test_same_seed_same_run() {
        // ARRANGE
        let network = open_chain();
        let reference = ReferenceState::relative(&network, &[1.0, 1.0]).unwrap();

        // ACT
        let first = run(&network, &reference, &setup(8, 20, 5)).unwrap();
        let second = run(&network, &reference, &setup(8, 20, 5)).unwrap();
        let other = run(&network, &reference, &setup(8, 20, 6)).unwrap();

        // ASSERT
        assert_eq!(first, second);
        assert_ne!(first.ensemble, other.ensemble);
    }

    #[test]
    fn test_structural_errors_are_fatal() {
        let network = open_chain();
        assert!(matches!(
            ReferenceState::relative(&network, &[1.0, f64::NAN]),
            Err(NetworkError::NonFiniteFlux(_))
        ));
        assert!(ReferenceState::relative(&network, &[1.0]).is_err());
        assert!(StoichiometricMatrix::from_reactions(&[]).is_err());
    }
}
