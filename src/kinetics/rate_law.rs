//! Generalized saturation rate law.
//!
//! The flux through reaction `r` is `kcat · E · f(S, P)` where the kinetic factor
//! `f` is
//!
//! - irreversible: `Π (s/Km)^c / Π (1 + s/Km)^c`
//! - reversible:   `Π (1/Km)^c · (Π s^c - Π p^c / Keq) / (Π (1 + s/Km)^c + Π (1 + p/Kp)^c - 1)`
//!
//! Partial derivatives of `f` are closed-form, so the Jacobians needed by the
//! continuation solver can be evaluated directly at every step.

use serde::{Deserialize, Serialize};

use crate::constants::{MIN_DRIVING_FORCE, R, T};

use super::error::KineticsError;

/// Kinetic factor of one reaction together with its partial derivatives.
#[derive(Debug, Clone, PartialEq)]
pub struct KineticFactor {
    pub value: f64,
    /// ∂f/∂s for every substrate, in substrate order
    pub d_substrates: Vec<f64>,
    /// ∂f/∂p for every product, in product order (all zero if irreversible)
    pub d_products: Vec<f64>,
}

/// Coefficients and constants of the generalized rate law for one reaction.
///
/// Substrate and product vectors are matched by position: the i-th affinity
/// belongs to the i-th coefficient. Irreversible reactions carry no product
/// affinities and an equilibrium constant of 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLaw {
    pub reversible: bool,
    pub substrate_coefficients: Vec<f64>,
    pub substrate_kms: Vec<f64>,
    pub product_coefficients: Vec<f64>,
    pub product_kms: Vec<f64>,
    pub keq: f64,
}

impl RateLaw {
    /// Irreversible rate law over the given substrates
    pub fn irreversible(substrate_coefficients: Vec<f64>, substrate_kms: Vec<f64>) -> Self {
        Self {
            reversible: false,
            substrate_coefficients,
            substrate_kms,
            product_coefficients: Vec::new(),
            product_kms: Vec::new(),
            keq: 0.0,
        }
    }

    /// Reversible rate law
    pub fn reversible(
        substrate_coefficients: Vec<f64>,
        substrate_kms: Vec<f64>,
        product_coefficients: Vec<f64>,
        product_kms: Vec<f64>,
        keq: f64,
    ) -> Self {
        Self {
            reversible: true,
            substrate_coefficients,
            substrate_kms,
            product_coefficients,
            product_kms,
            keq,
        }
    }

    /// Checks that affinities match coefficients on both sides.
    pub fn validate(&self) -> Result<(), KineticsError> {
        if self.substrate_kms.len() != self.substrate_coefficients.len() {
            return Err(KineticsError::ShapeMismatch {
                what: "substrate affinities",
                expected: self.substrate_coefficients.len(),
                found: self.substrate_kms.len(),
            });
        }
        let expected_products = if self.reversible {
            self.product_coefficients.len()
        } else {
            0
        };
        if self.product_kms.len() != expected_products {
            return Err(KineticsError::ShapeMismatch {
                what: "product affinities",
                expected: expected_products,
                found: self.product_kms.len(),
            });
        }
        Ok(())
    }

    /// Evaluates the kinetic factor at the given concentrations.
    ///
    /// Multiplying the result by `kcat · E` gives the reaction flux.
    ///
    /// # Arguments
    ///
    /// * `substrates` - Substrate concentrations, matched to the substrate coefficients
    /// * `products` - Product concentrations, ignored for irreversible reactions
    pub fn velocity(&self, substrates: &[f64], products: &[f64]) -> f64 {
        if self.reversible {
            let (numerator, denominator) = self.reversible_terms(substrates, products);
            self.affinity_prefactor() * numerator / denominator
        } else {
            self.substrate_coefficients
                .iter()
                .zip(&self.substrate_kms)
                .zip(substrates)
                .map(|((&c, &km), &s)| ((s / km) / (1.0 + s / km)).powf(c))
                .product()
        }
    }

    /// Evaluates the kinetic factor and its concentration derivatives.
    ///
    /// Concentrations must be positive; the derivatives of the irreversible
    /// form are expressed through `f` itself.
    pub fn velocity_with_partials(&self, substrates: &[f64], products: &[f64]) -> KineticFactor {
        if self.reversible {
            self.reversible_partials(substrates, products)
        } else {
            let value = self.velocity(substrates, products);
            let d_substrates = self
                .substrate_coefficients
                .iter()
                .zip(&self.substrate_kms)
                .zip(substrates)
                .map(|((&c, &km), &s)| value * c * km / (s * (km + s)))
                .collect();

            KineticFactor {
                value,
                d_substrates,
                d_products: vec![0.0; products.len()],
            }
        }
    }

    /// The driving-force term `1 - exp(ΔG'm/RT + Σ c_p ln p - Σ c_s ln s)`.
    ///
    /// Lies strictly between 0 and 1 for a reaction that can carry flux in its
    /// written direction.
    pub fn driving_force(&self, log_substrates: &[f64], log_products: &[f64], delta_g: f64) -> f64 {
        let sub: f64 = weighted_sum(&self.substrate_coefficients, log_substrates);
        let pro: f64 = weighted_sum(&self.product_coefficients, log_products);
        1.0 - (delta_g / R / T + pro - sub).exp()
    }

    /// Driving force at the given concentrations using this law's own `Keq`
    pub fn driving_force_at(&self, substrates: &[f64], products: &[f64]) -> f64 {
        let log_s: Vec<f64> = substrates.iter().map(|s| s.ln()).collect();
        let log_p: Vec<f64> = products.iter().map(|p| p.ln()).collect();
        self.driving_force(&log_s, &log_p, gibbs_energy(self.keq))
    }

    /// Fails if a reversible reaction cannot run forward at these concentrations.
    pub fn check_feasible(&self, substrates: &[f64], products: &[f64]) -> Result<(), KineticsError> {
        if !self.reversible {
            return Ok(());
        }
        let driving_force = self.driving_force_at(substrates, products);
        if driving_force > MIN_DRIVING_FORCE && driving_force < 1.0 {
            Ok(())
        } else {
            Err(KineticsError::ThermodynamicallyInfeasible { driving_force })
        }
    }

    /// Back-solves the enzyme level that carries `flux` at the given concentrations.
    ///
    /// This is the algebraic inverse of [`RateLaw::velocity`]:
    /// `velocity(s, p) · kcat · required_enzyme(ln s, ln p, flux, kcat, ΔG) == flux`
    /// whenever `ΔG = -RT ln Keq`.
    ///
    /// # Arguments
    ///
    /// * `log_substrates` - Natural logarithms of substrate concentrations
    /// * `log_products` - Natural logarithms of product concentrations
    /// * `flux` - Target flux
    /// * `kcat` - Catalytic rate constant
    /// * `delta_g` - Standard free energy ΔG'm in kJ/mol (ignored if irreversible)
    ///
    /// # Errors
    ///
    /// Returns [`KineticsError::ThermodynamicallyInfeasible`] when the driving
    /// force of a reversible reaction is not strictly inside (0, 1); the
    /// division is never attempted in that case.
    pub fn required_enzyme(
        &self,
        log_substrates: &[f64],
        log_products: &[f64],
        flux: f64,
        kcat: f64,
        delta_g: f64,
    ) -> Result<f64, KineticsError> {
        // Π (1 + Km/s)^c, i.e. the reciprocal of the irreversible factor
        let inverse_saturation = |coefficients: &[f64], kms: &[f64], logs: &[f64]| -> f64 {
            coefficients
                .iter()
                .zip(kms)
                .zip(logs)
                .map(|((&c, &km), &ln_s)| (1.0 + (km.ln() - ln_s).exp()).powf(c))
                .product()
        };

        let enzyme = if self.reversible {
            let driving_force = self.driving_force(log_substrates, log_products, delta_g);
            if !(driving_force > MIN_DRIVING_FORCE && driving_force < 1.0) {
                return Err(KineticsError::ThermodynamicallyInfeasible { driving_force });
            }

            // Π (s/Km)^c
            let saturation = weighted_sum(
                &self.substrate_coefficients,
                &log_differences(log_substrates, &self.substrate_kms),
            )
            .exp();
            let substrate_term: f64 = self
                .substrate_coefficients
                .iter()
                .zip(&self.substrate_kms)
                .zip(log_substrates)
                .map(|((&c, &km), &ln_s)| (1.0 + (ln_s - km.ln()).exp()).powf(c))
                .product();
            let product_term: f64 = self
                .product_coefficients
                .iter()
                .zip(&self.product_kms)
                .zip(log_products)
                .map(|((&c, &km), &ln_p)| (1.0 + (ln_p - km.ln()).exp()).powf(c))
                .product();

            flux / kcat * (substrate_term + product_term - 1.0) / (saturation * driving_force)
        } else {
            flux / kcat
                * inverse_saturation(
                    &self.substrate_coefficients,
                    &self.substrate_kms,
                    log_substrates,
                )
        };

        if enzyme.is_finite() {
            Ok(enzyme)
        } else {
            Err(KineticsError::NonFiniteVelocity)
        }
    }

    /// Π (1/Km)^c over substrates
    fn affinity_prefactor(&self) -> f64 {
        self.substrate_coefficients
            .iter()
            .zip(&self.substrate_kms)
            .map(|(&c, &km)| km.powf(-c))
            .product()
    }

    /// Numerator `Π s^c - Π p^c / Keq` and denominator of the reversible form
    fn reversible_terms(&self, substrates: &[f64], products: &[f64]) -> (f64, f64) {
        let (sub_mass, sub_sat) = mass_and_saturation(
            &self.substrate_coefficients,
            &self.substrate_kms,
            substrates,
        );
        let (pro_mass, pro_sat) =
            mass_and_saturation(&self.product_coefficients, &self.product_kms, products);
        (sub_mass - pro_mass / self.keq, sub_sat + pro_sat - 1.0)
    }

    fn reversible_partials(&self, substrates: &[f64], products: &[f64]) -> KineticFactor {
        let prefactor = self.affinity_prefactor();
        let (sub_mass, sub_sat) = mass_and_saturation(
            &self.substrate_coefficients,
            &self.substrate_kms,
            substrates,
        );
        let (pro_mass, pro_sat) =
            mass_and_saturation(&self.product_coefficients, &self.product_kms, products);

        let numerator = sub_mass - pro_mass / self.keq;
        let denominator = sub_sat + pro_sat - 1.0;
        let value = prefactor * numerator / denominator;

        // quotient rule: A (N' D - N D') / D²
        let quotient = |d_num: f64, d_den: f64| -> f64 {
            prefactor * (d_num * denominator - numerator * d_den) / (denominator * denominator)
        };

        let d_substrates = self
            .substrate_coefficients
            .iter()
            .zip(&self.substrate_kms)
            .zip(substrates)
            .map(|((&c, &km), &s)| quotient(c * sub_mass / s, sub_sat * c / (km + s)))
            .collect();
        let d_products = self
            .product_coefficients
            .iter()
            .zip(&self.product_kms)
            .zip(products)
            .map(|((&c, &km), &p)| quotient(-c * pro_mass / (p * self.keq), pro_sat * c / (km + p)))
            .collect();

        KineticFactor {
            value,
            d_substrates,
            d_products,
        }
    }
}

/// Standard free energy ΔG'm = -RT ln Keq, kJ/mol
pub fn gibbs_energy(keq: f64) -> f64 {
    -R * T * keq.ln()
}

/// Returns `(Π x^c, Π (1 + x/K)^c)`
fn mass_and_saturation(coefficients: &[f64], kms: &[f64], concentrations: &[f64]) -> (f64, f64) {
    coefficients.iter().zip(kms).zip(concentrations).fold(
        (1.0, 1.0),
        |(mass, saturation), ((&c, &km), &x)| {
            (mass * x.powf(c), saturation * (1.0 + x / km).powf(c))
        },
    )
}

fn weighted_sum(coefficients: &[f64], values: &[f64]) -> f64 {
    coefficients.iter().zip(values).map(|(c, v)| c * v).sum()
}

fn log_differences(logs: &[f64], kms: &[f64]) -> Vec<f64> {
    logs.iter().zip(kms).map(|(l, km)| l - km.ln()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ln(values: &[f64]) -> Vec<f64> {
        values.iter().map(|v| v.ln()).collect()
    }

    /// Central finite difference of the kinetic factor with respect to one concentration
    fn numeric_partial(law: &RateLaw, s: &[f64], p: &[f64], substrate: bool, i: usize) -> f64 {
        let h = 1e-6;
        let (mut s_hi, mut s_lo, mut p_hi, mut p_lo) = (s.to_vec(), s.to_vec(), p.to_vec(), p.to_vec());
        if substrate {
            s_hi[i] += h;
            s_lo[i] -= h;
        } else {
            p_hi[i] += h;
            p_lo[i] -= h;
        }
        (law.velocity(&s_hi, &p_hi) - law.velocity(&s_lo, &p_lo)) / (2.0 * h)
    }

    #[test]
    fn test_irreversible_michaelis_menten() {
        let law = RateLaw::irreversible(vec![1.0], vec![0.5]);
        // s / (Km + s)
        assert_relative_eq!(law.velocity(&[2.0], &[]), 2.0 / 2.5, epsilon = 1e-12);
    }

    #[test]
    fn test_irreversible_inverse() {
        let law = RateLaw::irreversible(vec![1.0, 2.0], vec![0.3, 1.7]);
        let s = [0.8, 2.5];
        let (flux, kcat) = (3.2, 45.0);

        let enzyme = law.required_enzyme(&ln(&s), &[], flux, kcat, 0.0).unwrap();
        assert_relative_eq!(law.velocity(&s, &[]) * kcat * enzyme, flux, epsilon = 1e-10);
    }

    #[test]
    fn test_reversible_inverse() {
        let law = RateLaw::reversible(vec![1.0, 1.0], vec![0.2, 0.9], vec![2.0], vec![1.1], 25.0);
        let (s, p) = ([1.5, 0.7], [0.4]);
        let (flux, kcat) = (0.9, 12.0);

        let enzyme = law
            .required_enzyme(&ln(&s), &ln(&p), flux, kcat, gibbs_energy(law.keq))
            .unwrap();
        assert_relative_eq!(law.velocity(&s, &p) * kcat * enzyme, flux, epsilon = 1e-10);
    }

    #[test]
    fn test_zero_velocity_at_equilibrium() {
        // A + B <-> 2C with Keq = 4: equilibrium at [C]^2 / ([A][B]) = 4
        let law = RateLaw::reversible(vec![1.0, 1.0], vec![0.5, 0.5], vec![2.0], vec![0.5], 4.0);
        let (s, p) = ([1.0, 4.0], [4.0]);
        assert_eq!(law.velocity(&s, &p), 0.0);
    }

    #[test]
    fn test_infeasible_driving_force() {
        let law = RateLaw::reversible(vec![1.0], vec![1.0], vec![1.0], vec![1.0], 2.0);

        // Q = p/s = 3 > Keq: the reaction would run backwards
        let result = law.required_enzyme(&ln(&[1.0]), &ln(&[3.0]), 1.0, 1.0, gibbs_energy(2.0));
        assert!(matches!(
            result,
            Err(KineticsError::ThermodynamicallyInfeasible { driving_force }) if driving_force < 0.0
        ));
        assert!(law.check_feasible(&[1.0], &[3.0]).is_err());
        assert!(law.check_feasible(&[1.0], &[1.0]).is_ok());

        // At equilibrium the driving force is zero
        assert!(law.check_feasible(&[1.0], &[2.0]).is_err());
    }

    #[test]
    fn test_partials_match_finite_differences() {
        let laws = [
            RateLaw::irreversible(vec![1.0, 2.0], vec![0.4, 1.3]),
            RateLaw::reversible(vec![1.0, 1.0], vec![0.2, 0.9], vec![2.0, 1.0], vec![1.1, 0.3], 7.0),
        ];
        let (s, p) = ([1.2, 0.6], [0.5, 0.8]);

        for law in laws {
            let factor = law.velocity_with_partials(&s, &p);
            assert_relative_eq!(factor.value, law.velocity(&s, &p), epsilon = 1e-14);

            for i in 0..s.len() {
                assert_relative_eq!(
                    factor.d_substrates[i],
                    numeric_partial(&law, &s, &p, true, i),
                    epsilon = 1e-6
                );
            }
            for i in 0..p.len() {
                assert_relative_eq!(
                    factor.d_products[i],
                    numeric_partial(&law, &s, &p, false, i),
                    epsilon = 1e-6
                );
            }
        }
    }

    #[test]
    fn test_validate_shapes() {
        let law = RateLaw::irreversible(vec![1.0, 1.0], vec![0.2]);
        assert!(matches!(
            law.validate(),
            Err(KineticsError::ShapeMismatch { .. })
        ));
        assert!(RateLaw::irreversible(vec![1.0], vec![0.2]).validate().is_ok());
    }
}
