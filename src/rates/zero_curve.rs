use serde::{Deserialize, Serialize};

use crate::core::{PricingError, ensure_finite};

/// Zero-rate term structure consumed by lattice step index.
///
/// Rates are continuously compounded. A curve is either already laid out on
/// the lattice (`PerStep`, one rate per time step `0..=N`) or given as
/// `(tenor, rate)` pillars that are linearly interpolated onto the step times
/// `i * dt`, with flat extrapolation on both ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ZeroCurve {
    /// One rate per lattice step; must cover at least `steps + 1` entries.
    PerStep(Vec<f64>),
    /// Sorted `(tenor, rate)` pillars in year fractions.
    Pillars(Vec<(f64, f64)>),
}

impl ZeroCurve {
    /// Creates a curve from rates already aligned with lattice steps.
    pub fn per_step(rates: Vec<f64>) -> Self {
        Self::PerStep(rates)
    }

    /// Creates a curve from unsorted `(tenor, rate)` pillars.
    ///
    /// # Errors
    /// Returns [`PricingError::InvalidParameter`] for an empty pillar set,
    /// negative tenors, duplicate tenors, or non-finite values.
    ///
    /// # Examples
    /// ```
    /// use openlattice::rates::ZeroCurve;
    ///
    /// let curve = ZeroCurve::from_pillars(vec![(2.0, 0.04), (1.0, 0.03)]).unwrap();
    /// let rates = curve.step_rates(4, 0.75).unwrap();
    /// assert_eq!(rates[0], 0.03);
    /// assert!((rates[2] - 0.035).abs() < 1e-12);
    /// assert_eq!(rates[4], 0.04);
    /// ```
    pub fn from_pillars(mut pillars: Vec<(f64, f64)>) -> Result<Self, PricingError> {
        pillars.sort_by(|a, b| a.0.total_cmp(&b.0));
        let curve = Self::Pillars(pillars);
        curve.validate()?;
        Ok(curve)
    }

    /// Checks rates are finite and pillars are non-empty with strictly
    /// increasing, non-negative tenors.
    pub fn validate(&self) -> Result<(), PricingError> {
        match self {
            Self::PerStep(rates) => {
                for &r in rates {
                    ensure_finite("zero curve rate", r)?;
                }
            }
            Self::Pillars(points) => {
                if points.is_empty() {
                    return Err(PricingError::invalid("zero curve needs at least one pillar"));
                }
                for &(tenor, rate) in points {
                    ensure_finite("zero curve tenor", tenor)?;
                    ensure_finite("zero curve rate", rate)?;
                    if tenor < 0.0 {
                        return Err(PricingError::invalid("zero curve tenors must be >= 0"));
                    }
                }
                if points.windows(2).any(|w| w[0].0 >= w[1].0) {
                    return Err(PricingError::invalid(
                        "zero curve tenors must be distinct and sorted ascending",
                    ));
                }
            }
        }
        Ok(())
    }

    /// Resolves one rate per lattice step `0..=steps` with step size `dt`.
    ///
    /// # Errors
    /// Returns [`PricingError::InvalidParameter`] when the curve fails
    /// [`ZeroCurve::validate`] or a per-step curve is shorter than `steps + 1`.
    pub fn step_rates(&self, steps: usize, dt: f64) -> Result<Vec<f64>, PricingError> {
        self.validate()?;
        match self {
            Self::PerStep(rates) => {
                if rates.len() < steps + 1 {
                    return Err(PricingError::invalid(format!(
                        "zero curve has {} rates but the lattice needs {}",
                        rates.len(),
                        steps + 1
                    )));
                }
                Ok(rates[..=steps].to_vec())
            }
            Self::Pillars(points) => Ok((0..=steps)
                .map(|i| interpolate_rate(points, i as f64 * dt))
                .collect()),
        }
    }
}

fn interpolate_rate(points: &[(f64, f64)], t: f64) -> f64 {
    let Some(&(t_first, r_first)) = points.first() else {
        return 0.0;
    };
    if t <= t_first {
        return r_first;
    }
    for window in points.windows(2) {
        let (t0, r0) = window[0];
        let (t1, r1) = window[1];
        if t <= t1 {
            let w = (t - t0) / (t1 - t0);
            return r0 + w * (r1 - r0);
        }
    }
    points[points.len() - 1].1
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn pillars_interpolate_onto_step_times() {
        let curve = ZeroCurve::from_pillars(vec![(0.0, 0.02), (1.0, 0.04)]).unwrap();
        let rates = curve.step_rates(4, 0.25).unwrap();
        let expected = [0.02, 0.025, 0.03, 0.035, 0.04];
        for (got, want) in rates.iter().zip(expected) {
            assert_relative_eq!(*got, want, epsilon = 1e-14);
        }
    }

    #[test]
    fn per_step_curve_is_truncated_to_the_lattice() {
        let curve = ZeroCurve::per_step(vec![0.01, 0.02, 0.03, 0.04]);
        assert_eq!(curve.step_rates(2, 0.5).unwrap(), vec![0.01, 0.02, 0.03]);
    }

    #[test]
    fn short_per_step_curve_is_rejected() {
        let curve = ZeroCurve::per_step(vec![0.01, 0.02]);
        assert!(matches!(
            curve.step_rates(2, 0.5),
            Err(PricingError::InvalidParameter(_))
        ));
    }

    #[test]
    fn bad_pillars_are_rejected() {
        assert!(ZeroCurve::from_pillars(vec![]).is_err());
        assert!(ZeroCurve::from_pillars(vec![(-1.0, 0.02)]).is_err());
        assert!(ZeroCurve::from_pillars(vec![(1.0, 0.02), (1.0, 0.03)]).is_err());
        assert!(ZeroCurve::from_pillars(vec![(1.0, f64::NAN)]).is_err());
    }

    #[test]
    fn unsorted_pillars_built_directly_are_rejected() {
        let curve = ZeroCurve::Pillars(vec![(2.0, 0.04), (1.0, 0.03)]);
        assert!(matches!(
            curve.step_rates(4, 0.5),
            Err(PricingError::InvalidParameter(_))
        ));

        let decoded: ZeroCurve =
            toml::from_str::<Wrapper>("curve = { Pillars = [[1.0, 0.03], [1.0, 0.05]] }")
                .unwrap()
                .curve;
        assert!(decoded.step_rates(4, 0.5).is_err());
        assert!(ZeroCurve::Pillars(vec![]).validate().is_err());
    }

    #[derive(serde::Deserialize)]
    struct Wrapper {
        curve: ZeroCurve,
    }
}
