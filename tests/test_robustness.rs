#[cfg(test)]
mod test_robustness {
    use std::collections::HashMap;

    use approx::assert_relative_eq;
    use kinetic_ensemble::prelude::*;
    use kinetic_ensemble::robustness::fold_change::flux_fold_change;
    use tempfile::tempdir;

    /// A → B → C → D with the pathway ends A and D held constant
    fn three_step_chain() -> (Network, ReferenceState) {
        let stoich = StoichiometricMatrix::from_reactions(&[
            ReactionEquation::new("R1", &[("A", 1.0)], &[("B", 1.0)]),
            ReactionEquation::new("R2", &[("B", 1.0)], &[("C", 1.0)]),
            ReactionEquation::new("R3", &[("C", 1.0)], &[("D", 1.0)]),
        ])
        .unwrap()
        .exclude_from_balance(&["A", "D"])
        .unwrap();
        let network = Network::new(stoich, HashMap::new()).unwrap();
        let reference = ReferenceState::relative(&network, &[1.0, 1.0, 1.0]).unwrap();
        (network, reference)
    }

    /// Lowering the middle enzyme pushes B towards a saturation pole: the
    /// relaxation rate of B vanishes, so with a stability margin of 0.05 every
    /// member loses stability before the enzyme reaches a tenth of its level.
    #[test]
    fn test_failure_probability_grows_as_enzyme_drops() {
        // ARRANGE
        let _ = env_logger::builder().is_test(true).try_init();
        let (network, reference) = three_step_chain();
        let setup = EnsembleSetupBuilder::default()
            .n_models(50)
            .n_steps(50)
            .eig_threshold(-0.05)
            .seed(2024)
            .build()
            .unwrap();

        // ACT
        let run = run(&network, &reference, &setup).unwrap();

        // ASSERT
        assert_eq!(run.results.n_retained(), 50);
        let middle = run.report.enzyme("R2").unwrap();
        let curve = &middle.failure;
        assert_eq!(curve.levels.len(), 2 * setup.n_steps + 1);

        let reference_column = setup.n_steps;
        assert_eq!(curve.levels[reference_column], 1.0);
        assert_eq!(curve.probabilities[reference_column], Some(0.0));

        // from the reference level down to enzyme_lower
        let down: Vec<f64> = curve.probabilities[..=reference_column]
            .iter()
            .rev()
            .map(|p| p.unwrap())
            .collect();
        // from the reference level up to enzyme_upper
        let up: Vec<f64> = curve.probabilities[reference_column..]
            .iter()
            .map(|p| p.unwrap())
            .collect();

        for half in [&down, &up] {
            assert_eq!(half.len(), setup.n_steps + 1);
            for pair in half.windows(2) {
                assert!(pair[1] >= pair[0]);
            }
            assert!(half.iter().all(|p| (0.0..=1.0).contains(p)));
        }

        let at_lower = *down.last().unwrap();
        assert_eq!(curve.levels[0], setup.enzyme_lower);
        assert!(at_lower > 0.0, "no sweep failed at enzyme_lower");
        assert!(at_lower > *up.last().unwrap());
    }

    /// A rate law over the wrong number of substrates must be rejected, not
    /// silently truncated, even when it comes from a file.
    #[test]
    fn test_mismatched_rate_law_from_file_is_rejected() {
        // ARRANGE
        let (network, reference) = three_step_chain();
        let setup = EnsembleSetupBuilder::default()
            .n_models(3)
            .n_steps(5)
            .build()
            .unwrap();
        let ensemble = generate_ensemble(&network, &reference, &setup).unwrap();

        let dir = tempdir().unwrap();
        let path = dir.path().join("ensemble.json");
        save_ensemble(&path, &ensemble).unwrap();

        let mut raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let law = &mut raw["members"][0]["reactions"][0]["law"];
        law["substrate_coefficients"] = serde_json::json!([1.0, 1.0, 1.0]);
        law["substrate_kms"] = serde_json::json!([0.5, 0.5, 0.5]);
        std::fs::write(&path, serde_json::to_string(&raw).unwrap()).unwrap();

        // ACT
        let loaded = load_ensemble(&path).unwrap();
        let result = simulate_perturbations(&network, &reference, &loaded, &setup);

        // ASSERT
        assert!(matches!(
            result,
            Err(EnsembleError::DimensionMismatch { expected: 1, found: 3, .. })
        ));
    }

    #[test]
    fn test_report_metrics_are_bounded() {
        // ARRANGE
        let (network, reference) = three_step_chain();
        let setup = EnsembleSetupBuilder::default()
            .n_models(20)
            .n_steps(30)
            .seed(9)
            .build()
            .unwrap();

        // ACT
        let run = run(&network, &reference, &setup).unwrap();

        // ASSERT
        let max_score = (-1.0f64).exp();
        assert_eq!(run.report.enzymes.len(), 3);
        for enzyme in &run.report.enzymes {
            let index = enzyme.robustness_index.unwrap();
            assert!((0.0..=max_score).contains(&index));

            let table = &enzyme.fold_change;
            assert_eq!(table.n_bins(), setup.n_windows);
            assert_eq!(table.n_levels(), 2 * setup.n_steps + 1);
            for level in 0..table.n_levels() {
                let binned: usize = table.counts.column(level).sum();
                assert!(binned <= table.observed[level]);
            }
            assert!(enzyme.control.down.iter().all(|c| c.is_finite()));
            assert!(enzyme.control.up.iter().all(|c| c.is_finite()));
        }
        assert_eq!(
            run.report.robustness_indices().keys().cloned().collect::<Vec<_>>(),
            vec!["R1", "R2", "R3"]
        );
    }

    #[test]
    fn test_fold_change_of_selected_enzymes() {
        let (network, reference) = three_step_chain();
        let setup = EnsembleSetupBuilder::default()
            .n_models(6)
            .n_steps(10)
            .build()
            .unwrap();
        let ensemble = generate_ensemble(&network, &reference, &setup).unwrap();
        let results = simulate_perturbations(&network, &reference, &ensemble, &setup).unwrap();

        let tables = flux_fold_change()
            .network(&network)
            .reference(&reference)
            .ensemble(&ensemble)
            .results(&results)
            .setup(&setup)
            .enzymes(vec![2, 0])
            .call()
            .unwrap();
        assert_eq!(tables.iter().map(|t| t.enzyme).collect::<Vec<_>>(), vec![2, 0]);

        // every member sits exactly at the reference flux at level 1
        let reference_column = setup.n_steps;
        let at_reference = tables[0].column(reference_column).unwrap();
        assert_eq!(at_reference.sum(), results.n_retained());

        let mismatched = EnsembleSetupBuilder::default().n_steps(11).build().unwrap();
        assert!(flux_fold_change()
            .network(&network)
            .reference(&reference)
            .ensemble(&ensemble)
            .results(&results)
            .setup(&mismatched)
            .call()
            .is_err());
    }

    #[test]
    fn test_run_survives_a_file() {
        let (network, reference) = three_step_chain();
        let setup = EnsembleSetupBuilder::default()
            .n_models(4)
            .n_steps(8)
            .build()
            .unwrap();
        let run = run(&network, &reference, &setup).unwrap();

        let dir = tempdir().unwrap();
        save_ensemble(dir.path().join("ensemble.json"), &run.ensemble).unwrap();
        save_results(dir.path().join("results.json"), &run.results).unwrap();
        save_report(dir.path().join("report.json"), &run.report).unwrap();

        let ensemble = load_ensemble(dir.path().join("ensemble.json")).unwrap();
        assert_eq!(ensemble.len(), run.ensemble.len());
        for (loaded, original) in ensemble.members().iter().zip(run.ensemble.members()) {
            assert_eq!(loaded.member, original.member);
            for (a, b) in loaded.kcats().iter().zip(original.kcats()) {
                assert_relative_eq!(*a, b, max_relative = 1e-12);
            }
        }

        let report = load_report(dir.path().join("report.json")).unwrap();
        assert_eq!(report.enzymes.len(), run.report.enzymes.len());
        for (loaded, original) in report.enzymes.iter().zip(&run.report.enzymes) {
            assert_eq!(loaded.reaction, original.reaction);
            assert_eq!(loaded.fold_change.counts, original.fold_change.counts);
            assert_relative_eq!(
                loaded.robustness_index.unwrap(),
                original.robustness_index.unwrap(),
                max_relative = 1e-12
            );
        }
        assert_eq!(
            load_results(dir.path().join("results.json")).unwrap().n_retained(),
            run.results.n_retained()
        );
    }
}
