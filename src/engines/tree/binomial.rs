//! Module `engines::tree::binomial`.
//!
//! Cox-Ross-Rubinstein lattice for European and American vanilla options.
//!
//! References: Hull (11th ed.) Ch. 13 and 21, Cox-Ross-Rubinstein (1979), and the
//! backward-induction recursion around Eq. (13.10). Delta, gamma, and theta are
//! read off the first two tree layers (Hull Eq. 21.6-21.8).
//!
//! Numerical considerations: the CRR price oscillates between even and odd step
//! counts with an error of order `1/N`; the optional Black-Scholes control
//! variate removes most of that error for American exercise.
use std::sync::{Arc, Mutex};

use super::crr::{CrrStep, DEFAULT_PROBABILITY_TOLERANCE};
use super::grid::TriangularGrid;
use crate::config::LatticeConfig;
use crate::core::{
    DiagKey, Diagnostics, Greeks, OptionType, PricingEngine, PricingError, PricingResult,
};
use crate::engines::analytic::bs_price;
use crate::instruments::vanilla::VanillaOption;
use crate::market::Market;
use crate::math::arena::PricingArena;

/// Cox-Ross-Rubinstein binomial tree engine.
#[derive(Debug, Clone)]
pub struct BinomialTreeEngine {
    /// Number of tree steps.
    pub steps: usize,
    /// Apply the Black-Scholes control variate to American prices.
    pub control_variate: bool,
    /// Rounding slack accepted on the risk-neutral probability.
    pub probability_tolerance: f64,
    arena: Option<Arc<Mutex<PricingArena>>>,
}

impl Default for BinomialTreeEngine {
    fn default() -> Self {
        Self {
            steps: 500,
            control_variate: false,
            probability_tolerance: DEFAULT_PROBABILITY_TOLERANCE,
            arena: None,
        }
    }
}

impl BinomialTreeEngine {
    /// Creates a tree engine with the given number of steps.
    pub fn new(steps: usize) -> Self {
        Self {
            steps,
            ..Self::default()
        }
    }

    /// Creates an engine from shared lattice settings.
    pub fn from_config(config: &LatticeConfig) -> Self {
        Self {
            steps: config.binomial_steps,
            control_variate: config.control_variate,
            probability_tolerance: config.probability_tolerance,
            arena: None,
        }
    }

    /// Enables or disables the Black-Scholes control variate.
    pub fn with_control_variate(mut self, enabled: bool) -> Self {
        self.control_variate = enabled;
        self
    }

    /// Reuses a caller-owned rollback buffer instead of allocating per call.
    pub fn with_arena(mut self, arena: Arc<Mutex<PricingArena>>) -> Self {
        self.arena = Some(arena);
        self
    }
}

/// Node values of the first tree layers, captured during rollback.
#[derive(Debug, Clone, Copy, Default)]
struct EarlyLayers {
    step1: [f64; 2],
    step2: [f64; 3],
}

fn rollback(
    values: &mut [f64],
    grid: &TriangularGrid,
    option_type: OptionType,
    strike: f64,
    early_exercise: bool,
    p: f64,
    disc: f64,
) -> (f64, EarlyLayers) {
    let steps = grid.steps();
    debug_assert!(values.len() > steps);

    let disc_p = disc * p;
    let disc_1mp = disc * (1.0 - p);

    for (value, &s) in values.iter_mut().zip(grid.layer(steps)) {
        *value = option_type.intrinsic(s, strike);
    }

    let mut early = EarlyLayers::default();
    match steps {
        1 => early.step1.copy_from_slice(&values[..2]),
        2 => early.step2.copy_from_slice(&values[..3]),
        _ => {}
    }

    for i in (0..steps).rev() {
        if early_exercise {
            let layer = grid.layer(i);
            for j in 0..=i {
                let continuation = disc_p.mul_add(values[j + 1], disc_1mp * values[j]);
                values[j] = continuation.max(option_type.intrinsic(layer[j], strike));
            }
        } else {
            for j in 0..=i {
                values[j] = disc_p.mul_add(values[j + 1], disc_1mp * values[j]);
            }
        }

        match i {
            2 => early.step2.copy_from_slice(&values[..3]),
            1 => early.step1.copy_from_slice(&values[..2]),
            _ => {}
        }
    }

    (values[0], early)
}

fn tree_greeks(grid: &TriangularGrid, early: &EarlyLayers, root: f64, dt: f64) -> Option<Greeks> {
    if grid.steps() < 2 {
        return None;
    }
    let [f10, f11] = early.step1;
    let [f20, f21, f22] = early.step2;
    let (s10, s11) = (grid.get(1, 0), grid.get(1, 1));
    let (s20, s21, s22) = (grid.get(2, 0), grid.get(2, 1), grid.get(2, 2));

    let delta = (f11 - f10) / (s11 - s10);
    let delta_up = (f22 - f21) / (s22 - s21);
    let delta_down = (f21 - f20) / (s21 - s20);
    let gamma = (delta_up - delta_down) / (0.5 * (s22 - s20));
    let theta = (f21 - root) / (2.0 * dt);

    Some(Greeks {
        delta,
        gamma,
        theta,
    })
}

impl PricingEngine<VanillaOption> for BinomialTreeEngine {
    fn price(
        &self,
        instrument: &VanillaOption,
        market: &Market,
    ) -> Result<PricingResult, PricingError> {
        instrument.validate()?;
        market.validate()?;

        if self.steps == 0 {
            return Err(PricingError::invalid("binomial steps must be > 0"));
        }

        let vol = market.vol_for(instrument.strike, instrument.expiry)?;
        let step = CrrStep::new(vol, instrument.expiry, self.steps)?;
        let p = step.probability(
            market.rate - market.dividend_yield,
            self.probability_tolerance,
        )?;
        let disc = (-market.rate * step.dt).exp();
        let early_exercise = instrument.exercise.allows_early_exercise();

        tracing::debug!(
            steps = self.steps,
            dt = step.dt,
            up = step.up,
            p,
            american = early_exercise,
            "pricing vanilla option on CRR lattice"
        );

        let grid = TriangularGrid::crr(market.spot, step.up, step.down, self.steps);
        let run = |values: &mut [f64], early: bool| {
            rollback(
                values,
                &grid,
                instrument.option_type,
                instrument.strike,
                early,
                p,
                disc,
            )
        };

        let apply_control_variate = self.control_variate && early_exercise;
        let ((mut price, early), european) = if let Some(arena) = &self.arena {
            let mut guard = arena.lock().unwrap_or_else(|poison| poison.into_inner());
            let values = guard.value_slice(self.steps + 1);
            let american = run(&mut *values, early_exercise);
            let european = apply_control_variate.then(|| run(&mut *values, false).0);
            (american, european)
        } else {
            let mut values = vec![0.0_f64; self.steps + 1];
            let american = run(&mut values, early_exercise);
            let european = apply_control_variate.then(|| run(&mut values, false).0);
            (american, european)
        };

        let mut diagnostics = Diagnostics::new();
        diagnostics.insert_key(DiagKey::NumSteps, self.steps as f64);
        diagnostics.insert_key(DiagKey::Vol, vol);
        diagnostics.insert_key(DiagKey::U, step.up);
        diagnostics.insert_key(DiagKey::Pu, p);

        let greeks = tree_greeks(&grid, &early, price, step.dt);

        if let Some(european_tree) = european {
            let analytic = bs_price(
                instrument.option_type,
                market.spot,
                instrument.strike,
                market.rate,
                market.dividend_yield,
                vol,
                instrument.expiry,
            );
            let adjustment = analytic - european_tree;
            price = (price + adjustment).max(instrument.option_type.intrinsic(
                market.spot,
                instrument.strike,
            ));
            diagnostics.insert_key(DiagKey::ControlVariate, adjustment);
        }

        Ok(PricingResult {
            price,
            greeks,
            diagnostics,
        })
    }
}
