//! Robustness index.
//!
//! The enzyme level of a cell is modeled as `ln(E) ~ N(ln(Eref), σ²)`. For each
//! member, the probability `p` that the level falls inside the feasible range
//! found by the sweeps scores the member as `-p ln p`; the index of an enzyme is
//! the mean score over all retained members.

use statrs::distribution::{ContinuousCDF, LogNormal};

use crate::constants::{PROBABILITY_FLOOR, ROBUSTNESS_SIGMA};
use crate::continuation::trajectory::EnzymeResponse;
use crate::ensemble::error::EnsembleError;

/// Probability that a log-normal enzyme level around `reference` lies in `[lower, upper]`.
pub fn survival_probability(reference: f64, lower: f64, upper: f64) -> Result<f64, EnsembleError> {
    let dist = LogNormal::new(reference.ln(), ROBUSTNESS_SIGMA)
        .map_err(|e| EnsembleError::Statistics(e.to_string()))?;
    Ok(dist.cdf(upper) - dist.cdf(lower))
}

/// `-p ln p`, with non-positive `p` replaced by a small floor.
///
/// The score lies in `[0, 1/e]` for every `p ≤ 1`.
pub fn stability_score(p: f64) -> f64 {
    let p = if p > 0.0 { p.min(1.0) } else { PROBABILITY_FLOOR };
    -p * p.ln()
}

/// Mean stability score of one enzyme over the retained members.
///
/// Returns `None` if no member responses are available.
pub fn robustness_index(responses: &[&EnzymeResponse]) -> Result<Option<f64>, EnsembleError> {
    if responses.is_empty() {
        return Ok(None);
    }

    let mut total = 0.0;
    for response in responses {
        let (Some(reference), Some(lower), Some(upper)) = (
            response.down.reference_level(),
            response.down.final_level(),
            response.up.final_level(),
        ) else {
            return Err(EnsembleError::DimensionMismatch {
                what: "trajectory points".to_string(),
                expected: 1,
                found: 0,
            });
        };
        total += stability_score(survival_probability(reference, lower, upper)?);
    }

    Ok(Some(total / responses.len() as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::DVector;

    use crate::continuation::trajectory::{Direction, Trajectory, TrajectoryPoint};

    fn response(lower: f64, upper: f64) -> EnzymeResponse {
        let point = |level: f64| TrajectoryPoint {
            enzyme_level: level,
            concentrations: DVector::from_element(1, 1.0),
        };
        let mut down = Trajectory::new(0, Direction::Down, point(1.0));
        down.push(point(lower));
        let mut up = Trajectory::new(0, Direction::Up, point(1.0));
        up.push(point(upper));
        EnzymeResponse { enzyme: 0, down, up }
    }

    #[test]
    fn test_score_bounds() {
        let max = (-1.0f64).exp();
        for i in 0..=100 {
            let score = stability_score(i as f64 / 100.0);
            assert!((0.0..=max + 1e-15).contains(&score));
        }
        assert_relative_eq!(stability_score(max), max, epsilon = 1e-15);
        assert_relative_eq!(stability_score(1.0), 0.0);
        assert_relative_eq!(stability_score(-0.3), -1e-4 * (1e-4f64).ln());
    }

    #[test]
    fn test_symmetric_interval_probability() {
        // ln(E) ~ N(0, 0.5): P(|ln E| < 0.5) = P(|Z| < 1)
        let p = survival_probability(1.0, (-0.5f64).exp(), 0.5f64.exp()).unwrap();
        assert_relative_eq!(p, 0.682_689_492, epsilon = 1e-6);
    }

    #[test]
    fn test_index_is_mean_score() {
        let wide = response(0.01, 100.0);
        let narrow = response(0.99, 1.01);
        let index = robustness_index(&[&wide, &narrow]).unwrap().unwrap();

        let expected = (stability_score(survival_probability(1.0, 0.01, 100.0).unwrap())
            + stability_score(survival_probability(1.0, 0.99, 1.01).unwrap()))
            / 2.0;
        assert_relative_eq!(index, expected, epsilon = 1e-12);
        assert!(index <= (-1.0f64).exp());

        assert_eq!(robustness_index(&[]).unwrap(), None);
    }
}
