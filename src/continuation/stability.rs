//! Eigenvalue screen of the system Jacobian.

use nalgebra::DMatrix;

/// Iteration cap of the Schur decomposition
const MAX_SCHUR_ITERATIONS: usize = 10_000;

/// Largest real part among the eigenvalues of `jacobian`.
///
/// Returns `None` if the matrix has non-finite entries or the decomposition
/// does not converge. An empty Jacobian has no eigenvalues and yields
/// negative infinity.
pub fn max_real_eigenvalue(jacobian: &DMatrix<f64>) -> Option<f64> {
    if jacobian.is_empty() {
        return Some(f64::NEG_INFINITY);
    }
    if jacobian.iter().any(|x| !x.is_finite()) {
        return None;
    }

    let schur = jacobian
        .clone()
        .try_schur(f64::EPSILON, MAX_SCHUR_ITERATIONS)?;
    let eigenvalues = schur.complex_eigenvalues();

    eigenvalues
        .iter()
        .map(|z| z.re)
        .try_fold(f64::NEG_INFINITY, |max, re| {
            re.is_finite().then_some(max.max(re))
        })
}

/// Whether every eigenvalue of `jacobian` has a real part below `threshold`.
///
/// A decomposition failure counts as unstable.
pub fn is_stable(jacobian: &DMatrix<f64>, threshold: f64) -> bool {
    max_real_eigenvalue(jacobian).is_some_and(|max| max < threshold)
}
