//! Cox-Ross-Rubinstein step parameters and probability checks.
//!
//! `u = exp(vol * sqrt(dt))`, `d = 1 / u`, `p = (exp(b * dt) - d) / (u - d)`
//! with cost of carry `b = r - q` (Hull 11th ed. Eq. 13.15-13.16).

use crate::core::PricingError;

/// Probability tolerance used when no engine override is configured.
pub const DEFAULT_PROBABILITY_TOLERANCE: f64 = 1.0e-10;

/// Up/down multipliers for one lattice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrrStep {
    pub dt: f64,
    pub up: f64,
    pub down: f64,
}

impl CrrStep {
    /// Derives `dt`, `u`, and `d` for `steps` steps over `expiry` years.
    ///
    /// # Errors
    /// [`PricingError::NumericalInstability`] when `u == d` (zero volatility)
    /// or the factors are not finite.
    pub fn new(vol: f64, expiry: f64, steps: usize) -> Result<Self, PricingError> {
        if steps == 0 {
            return Err(PricingError::invalid("lattice steps must be > 0"));
        }
        let dt = expiry / steps as f64;
        let up = (vol * dt.sqrt()).exp();
        let down = 1.0 / up;
        if !up.is_finite() || !down.is_finite() || down <= 0.0 {
            return Err(PricingError::unstable("CRR up/down factors are not finite"));
        }
        if up - down <= f64::EPSILON {
            return Err(PricingError::unstable(
                "degenerate CRR tree: up == down (zero volatility)",
            ));
        }
        Ok(Self { dt, up, down })
    }

    /// Risk-neutral up probability for a per-step carry `b`.
    pub fn probability(&self, carry: f64, tolerance: f64) -> Result<f64, PricingError> {
        let growth = (carry * self.dt).exp();
        let p = (growth - self.down) / (self.up - self.down);
        checked_probability("CRR up", p, tolerance)
    }
}

/// Validates a probability, absorbing rounding noise up to `tolerance`.
///
/// Values inside `[-tolerance, 1 + tolerance]` are clamped to `[0, 1]`;
/// anything else is a numerical instability, never silently clamped.
pub fn checked_probability(name: &str, p: f64, tolerance: f64) -> Result<f64, PricingError> {
    if !p.is_finite() || p < -tolerance || p > 1.0 + tolerance {
        return Err(PricingError::unstable(format!(
            "{name} probability {p} is outside [0, 1]"
        )));
    }
    if !(0.0..=1.0).contains(&p) {
        tracing::warn!(name, p, "clamping probability rounding noise into [0, 1]");
    }
    Ok(p.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn crr_factors_are_reciprocal() {
        let step = CrrStep::new(0.2, 1.0, 100).unwrap();
        assert_relative_eq!(step.dt, 0.01, epsilon = 1e-15);
        assert_relative_eq!(step.up, (0.02_f64).exp(), epsilon = 1e-14);
        assert_relative_eq!(step.up * step.down, 1.0, epsilon = 1e-15);
        let p = step.probability(0.05, DEFAULT_PROBABILITY_TOLERANCE).unwrap();
        assert!(p > 0.5 && p < 0.6);
    }

    #[test]
    fn zero_volatility_is_a_numerical_instability() {
        assert!(matches!(
            CrrStep::new(0.0, 1.0, 50),
            Err(PricingError::NumericalInstability(_))
        ));
    }

    #[test]
    fn large_carry_pushes_probability_out_of_range() {
        // exp(b * dt) > u when the drift per step outruns the vol step.
        let step = CrrStep::new(0.01, 1.0, 4).unwrap();
        assert!(matches!(
            step.probability(0.5, DEFAULT_PROBABILITY_TOLERANCE),
            Err(PricingError::NumericalInstability(_))
        ));
    }

    #[test]
    fn rounding_noise_is_clamped() {
        assert_eq!(checked_probability("p", -1e-13, 1e-10), Ok(0.0));
        assert_eq!(checked_probability("p", 1.0 + 1e-13, 1e-10), Ok(1.0));
        assert!(checked_probability("p", f64::NAN, 1e-10).is_err());
    }
}
