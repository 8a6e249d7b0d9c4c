//! Two-asset log-binomial lattice for spread options.
//!
//! Each node branches into four states `(uu, ud, du, dd)`. Log steps are
//! `dx_k = vol_k * sqrt(dt)` and the joint probabilities match the drifts
//! `mu_k = r - q_k - vol_k^2 / 2` and the covariance `rho * vol1 * vol2`
//! (Hull 11th ed. Ch. 21; Boyle-Evnine-Gibbs 1989; Clewlow-Strickland Ch. 2).
//!
//! Layer `i` holds `(i + 1)^2` values indexed `a * (i + 1) + b`, where `a` and
//! `b` count up-moves of asset 1 and asset 2. Layers are double-buffered so
//! rows of the earlier layer can be filled concurrently.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::crr::{DEFAULT_PROBABILITY_TOLERANCE, checked_probability};
use super::grid::LogLattice;
use crate::config::{LatticeConfig, MAX_TWO_ASSET_STEPS};
use crate::core::{DiagKey, Diagnostics, PricingEngine, PricingError, PricingResult};
use crate::instruments::spread::SpreadOption;
use crate::market::Market;

/// Two-asset binomial tree engine.
#[derive(Debug, Clone)]
pub struct TwoAssetTreeEngine {
    /// Number of tree steps.
    pub steps: usize,
    /// Rounding slack accepted on the joint probabilities.
    pub probability_tolerance: f64,
}

impl Default for TwoAssetTreeEngine {
    fn default() -> Self {
        Self {
            steps: 100,
            probability_tolerance: DEFAULT_PROBABILITY_TOLERANCE,
        }
    }
}

impl TwoAssetTreeEngine {
    /// Creates a two-asset engine with the given number of steps.
    pub fn new(steps: usize) -> Self {
        Self {
            steps,
            ..Self::default()
        }
    }

    /// Creates an engine from shared lattice settings.
    pub fn from_config(config: &LatticeConfig) -> Self {
        Self {
            steps: config.two_asset_steps,
            probability_tolerance: config.probability_tolerance,
        }
    }
}

/// Four-branch transition probabilities of the two-asset lattice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointProbabilities {
    /// Both assets move up.
    pub uu: f64,
    /// Asset 1 up, asset 2 down.
    pub ud: f64,
    /// Asset 1 down, asset 2 up.
    pub du: f64,
    /// Both assets move down.
    pub dd: f64,
}

impl JointProbabilities {
    /// Derives the joint probabilities for one step of length `dt`.
    ///
    /// # Errors
    /// [`PricingError::NumericalInstability`] if either volatility is zero, a
    /// probability leaves `[0, 1]` by more than `tolerance`, or the four do not
    /// sum to one within `tolerance`.
    pub fn new(
        mu1: f64,
        mu2: f64,
        vol1: f64,
        vol2: f64,
        rho: f64,
        dt: f64,
        tolerance: f64,
    ) -> Result<Self, PricingError> {
        let dx1 = vol1 * dt.sqrt();
        let dx2 = vol2 * dt.sqrt();
        if !(dx1 > 0.0 && dx2 > 0.0) || !dx1.is_finite() || !dx2.is_finite() {
            return Err(PricingError::unstable(
                "degenerate two-asset tree: zero log step (zero volatility)",
            ));
        }

        let denom = 4.0 * dx1 * dx2;
        let base = dx1 * dx2;
        let cov = rho * vol1 * vol2;
        let raw_uu = (base + (dx2 * mu1 + dx1 * mu2 + cov) * dt) / denom;
        let raw_ud = (base + (dx2 * mu1 - dx1 * mu2 - cov) * dt) / denom;
        let raw_du = (base + (-dx2 * mu1 + dx1 * mu2 - cov) * dt) / denom;
        let raw_dd = (base + (-dx2 * mu1 - dx1 * mu2 + cov) * dt) / denom;

        let sum = raw_uu + raw_ud + raw_du + raw_dd;
        if !sum.is_finite() || (sum - 1.0).abs() > tolerance.max(f64::EPSILON * 8.0) {
            return Err(PricingError::unstable(format!(
                "two-asset joint probabilities sum to {sum}, not 1"
            )));
        }

        Ok(Self {
            uu: checked_probability("two-asset uu", raw_uu, tolerance)?,
            ud: checked_probability("two-asset ud", raw_ud, tolerance)?,
            du: checked_probability("two-asset du", raw_du, tolerance)?,
            dd: checked_probability("two-asset dd", raw_dd, tolerance)?,
        })
    }

    #[inline]
    pub fn sum(&self) -> f64 {
        self.uu + self.ud + self.du + self.dd
    }
}

/// Fills one row (`a` fixed) of the earlier layer from the later layer.
#[inline]
#[allow(clippy::too_many_arguments)]
fn fill_row(
    row: &mut [f64],
    a: usize,
    step: usize,
    later: &[f64],
    weights: &JointProbabilities,
    disc: f64,
    exercise: Option<(&SpreadOption, &LogLattice, &LogLattice)>,
) {
    let width = step + 2;
    let up_row = &later[(a + 1) * width..(a + 2) * width];
    let down_row = &later[a * width..(a + 1) * width];

    for (b, value) in row.iter_mut().enumerate() {
        let continuation = disc
            * (weights.uu * up_row[b + 1]
                + weights.ud * up_row[b]
                + weights.du * down_row[b + 1]
                + weights.dd * down_row[b]);
        *value = match exercise {
            Some((option, lattice1, lattice2)) => continuation.max(
                option.payoff(lattice1.at_node(step, a), lattice2.at_node(step, b)),
            ),
            None => continuation,
        };
    }
}

impl PricingEngine<SpreadOption> for TwoAssetTreeEngine {
    fn price(
        &self,
        instrument: &SpreadOption,
        _market: &Market,
    ) -> Result<PricingResult, PricingError> {
        instrument.validate()?;

        if self.steps == 0 {
            return Err(PricingError::invalid("two-asset tree steps must be > 0"));
        }
        if self.steps > MAX_TWO_ASSET_STEPS {
            return Err(PricingError::invalid(format!(
                "two-asset tree steps must be <= {MAX_TWO_ASSET_STEPS}"
            )));
        }

        let n = self.steps;
        let dt = instrument.t / n as f64;
        let mu1 = instrument.r - instrument.q1 - 0.5 * instrument.vol1 * instrument.vol1;
        let mu2 = instrument.r - instrument.q2 - 0.5 * instrument.vol2 * instrument.vol2;
        let weights = JointProbabilities::new(
            mu1,
            mu2,
            instrument.vol1,
            instrument.vol2,
            instrument.rho,
            dt,
            self.probability_tolerance,
        )?;
        let disc = (-instrument.r * dt).exp();

        tracing::debug!(
            steps = n,
            dt,
            p_uu = weights.uu,
            p_ud = weights.ud,
            p_du = weights.du,
            p_dd = weights.dd,
            "pricing spread option on two-asset lattice"
        );

        let lattice1 = LogLattice::new(instrument.s1, instrument.vol1 * dt.sqrt(), n);
        let lattice2 = LogLattice::new(instrument.s2, instrument.vol2 * dt.sqrt(), n);

        let width = n + 1;
        let mut later = vec![0.0_f64; width * width];
        let mut earlier = vec![0.0_f64; width * width];

        for (a, row) in later.chunks_mut(width).enumerate() {
            let s1 = lattice1.at_node(n, a);
            for (b, value) in row.iter_mut().enumerate() {
                *value = instrument.payoff(s1, lattice2.at_node(n, b));
            }
        }

        let exercise = instrument
            .exercise
            .allows_early_exercise()
            .then_some((instrument, &lattice1, &lattice2));

        for step in (0..n).rev() {
            let m = step + 1;
            let source = &later[..(m + 1) * (m + 1)];
            let target = &mut earlier[..m * m];

            #[cfg(feature = "parallel")]
            target.par_chunks_mut(m).enumerate().for_each(|(a, row)| {
                fill_row(row, a, step, source, &weights, disc, exercise);
            });

            #[cfg(not(feature = "parallel"))]
            target.chunks_mut(m).enumerate().for_each(|(a, row)| {
                fill_row(row, a, step, source, &weights, disc, exercise);
            });

            std::mem::swap(&mut later, &mut earlier);
        }

        let mut diagnostics = Diagnostics::new();
        diagnostics.insert_key(DiagKey::NumSteps, n as f64);
        diagnostics.insert_key(DiagKey::Puu, weights.uu);
        diagnostics.insert_key(DiagKey::Pud, weights.ud);
        diagnostics.insert_key(DiagKey::Pdu, weights.du);
        diagnostics.insert_key(DiagKey::Pdd, weights.dd);

        Ok(PricingResult {
            price: later[0],
            greeks: None,
            diagnostics,
        })
    }
}
