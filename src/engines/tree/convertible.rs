//! Module `engines::tree::convertible`.
//!
//! Convertible bond valuation on a CRR stock lattice with conversion-probability
//! weighted credit discounting.
//!
//! References: Goldman Sachs (1994) "Valuing Convertible Bonds as Derivatives";
//! Tsiveriotis and Fernandes (1998); Hull (11th ed.) Ch. 26.
//!
//! At every node the holding value is discounted at
//! `cp * r_i + (1 - cp) * debt_rate`, where `cp` is the probability that the
//! bond ends up converted. Converted value is equity risk and earns the
//! riskless rate; unconverted value is issuer debt and carries the credit rate.
//! The issuer call caps the holding value at the call price plus accrued coupon.
//!
//! Terminal nodes carry a 0/1 conversion indicator; [`ConversionBlending`]
//! decides how interior nodes combine their children.
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use super::crr::{CrrStep, DEFAULT_PROBABILITY_TOLERANCE};
use super::grid::TriangularGrid;
use crate::config::LatticeConfig;
use crate::core::{DiagKey, Diagnostics, Greeks, PricingEngine, PricingError, PricingResult};
use crate::instruments::convertible::ConvertibleBond;
use crate::market::Market;
use crate::math::arena::PricingArena;

/// Rate applied to the unconverted (debt) share of a node's value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebtDiscounting {
    /// The credit spread is the whole debt rate.
    ///
    /// Value is non-decreasing in the conversion ratio only while the credit
    /// spread is at least the zero rate. Below that, converted value is
    /// discounted harder than debt and a larger ratio can lower the price.
    #[default]
    AllIn,
    /// The credit spread is added on top of the step's zero rate.
    OverCurve,
}

impl DebtDiscounting {
    #[inline]
    fn debt_rate(self, zero_rate: f64, credit_spread: f64) -> f64 {
        match self {
            Self::AllIn => credit_spread,
            Self::OverCurve => zero_rate + credit_spread,
        }
    }
}

/// How a node's conversion probability is formed from its two children.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionBlending {
    /// Plain average `(cp_up + cp_down) / 2`, never overridden at interior nodes.
    #[default]
    ChildAverage,
    /// Risk-neutral average `p * cp_up + (1 - p) * cp_down`, reset to 1 where
    /// the holder converts and to 0 where the issuer call binds.
    RiskNeutral,
}

impl ConversionBlending {
    #[inline]
    fn blend(self, p: f64, up: f64, down: f64) -> f64 {
        match self {
            Self::ChildAverage => 0.5 * (up + down),
            Self::RiskNeutral => p * up + (1.0 - p) * down,
        }
    }

    #[inline]
    fn node_probability(self, blended: f64, converted: bool, called: bool) -> f64 {
        match self {
            Self::ChildAverage => blended,
            Self::RiskNeutral if converted => 1.0,
            Self::RiskNeutral if called => 0.0,
            Self::RiskNeutral => blended,
        }
    }
}

/// CRR-style binomial engine for callable convertible bonds.
#[derive(Debug, Clone)]
pub struct ConvertibleTreeEngine {
    /// Number of time steps.
    pub steps: usize,
    /// Issuer credit spread.
    pub credit_spread: f64,
    /// How the credit spread enters the debt discount rate.
    pub debt_discounting: DebtDiscounting,
    /// How conversion probabilities roll back through the tree.
    pub conversion_blending: ConversionBlending,
    /// Rounding slack accepted on the risk-neutral probability.
    pub probability_tolerance: f64,
    arena: Option<Arc<Mutex<PricingArena>>>,
}

impl Default for ConvertibleTreeEngine {
    fn default() -> Self {
        Self {
            steps: 200,
            credit_spread: 0.0,
            debt_discounting: DebtDiscounting::default(),
            conversion_blending: ConversionBlending::default(),
            probability_tolerance: DEFAULT_PROBABILITY_TOLERANCE,
            arena: None,
        }
    }
}

impl ConvertibleTreeEngine {
    /// Creates an engine with the provided credit spread and default steps.
    pub fn new(credit_spread: f64) -> Self {
        Self {
            credit_spread,
            ..Self::default()
        }
    }

    /// Creates an engine from shared lattice settings.
    pub fn from_config(config: &LatticeConfig, credit_spread: f64) -> Self {
        Self {
            steps: config.convertible_steps,
            credit_spread,
            debt_discounting: config.debt_discounting,
            conversion_blending: config.conversion_blending,
            probability_tolerance: config.probability_tolerance,
            arena: None,
        }
    }

    /// Sets the number of tree steps.
    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    /// Sets the debt discounting policy.
    pub fn with_debt_discounting(mut self, policy: DebtDiscounting) -> Self {
        self.debt_discounting = policy;
        self
    }

    /// Sets the conversion-probability blending rule.
    pub fn with_conversion_blending(mut self, blending: ConversionBlending) -> Self {
        self.conversion_blending = blending;
        self
    }

    /// Reuses caller-owned value and conversion-probability buffers.
    pub fn with_arena(mut self, arena: Arc<Mutex<PricingArena>>) -> Self {
        self.arena = Some(arena);
        self
    }
}

/// Per-valuation inputs of the backward recursion.
struct Lattice<'a> {
    bond: &'a ConvertibleBond,
    grid: TriangularGrid,
    dt: f64,
    rates: Vec<f64>,
    probabilities: Vec<f64>,
    paid: Vec<f64>,
    accrued: Vec<f64>,
    credit_spread: f64,
    policy: DebtDiscounting,
    blending: ConversionBlending,
}

struct Rollback {
    root: f64,
    root_conversion_probability: f64,
    step1: [f64; 2],
}

impl Lattice<'_> {
    /// Holder conversion against the call-capped holding value.
    ///
    /// Returns the node value and whether the holder converts.
    #[inline]
    fn decide(&self, spot: f64, held: f64) -> (f64, bool) {
        if spot >= self.bond.conversion_price {
            let conversion = self.bond.conversion_ratio * spot;
            if conversion >= held {
                return (conversion, true);
            }
        }
        (held, false)
    }

    fn rollback(&self, values: &mut [f64], conversion: &mut [f64]) -> Rollback {
        let n = self.grid.steps();
        let payment = self.bond.principal + self.paid[n];

        for ((value, cp), &spot) in values
            .iter_mut()
            .zip(conversion.iter_mut())
            .zip(self.grid.layer(n))
        {
            let (terminal, converted) = self.decide(spot, payment);
            *value = terminal;
            *cp = if converted { 1.0 } else { 0.0 };
        }

        let mut step1 = [values[0], values[n.min(1)]];

        for i in (0..n).rev() {
            let p = self.probabilities[i];
            let zero_rate = self.rates[i];
            let debt_rate = self.policy.debt_rate(zero_rate, self.credit_spread);
            // Terminal values already include the final coupon.
            let coupon = if i + 1 < n { self.paid[i + 1] } else { 0.0 };
            let cap = self.bond.call_schedule.call_price(i) + self.accrued[i];
            let layer = self.grid.layer(i);

            for j in 0..=i {
                let cp = self.blending.blend(p, conversion[j + 1], conversion[j]);
                let rate = cp * zero_rate + (1.0 - cp) * debt_rate;
                let df = (-rate * self.dt).exp();
                let hold = df * (p * (values[j + 1] + coupon) + (1.0 - p) * (values[j] + coupon));
                let called = hold > cap;
                let (value, converted) = self.decide(layer[j], hold.min(cap));
                values[j] = value;
                conversion[j] = self.blending.node_probability(cp, converted, called);
            }

            if i == 1 {
                step1 = [values[0], values[1]];
            }
        }

        Rollback {
            root: values[0],
            root_conversion_probability: conversion[0],
            step1,
        }
    }
}

impl PricingEngine<ConvertibleBond> for ConvertibleTreeEngine {
    fn price(
        &self,
        instrument: &ConvertibleBond,
        market: &Market,
    ) -> Result<PricingResult, PricingError> {
        instrument.validate()?;
        market.validate()?;

        if self.steps == 0 {
            return Err(PricingError::invalid("convertible binomial steps must be > 0"));
        }
        if !self.credit_spread.is_finite() || self.credit_spread < 0.0 {
            return Err(PricingError::invalid(
                "convertible credit_spread must be finite and >= 0",
            ));
        }

        let vol = market.vol_for(instrument.conversion_price, instrument.maturity)?;
        let step = CrrStep::new(vol, instrument.maturity, self.steps)?;
        let rates = market.step_rates(self.steps, step.dt)?;
        let probabilities = rates[..self.steps]
            .iter()
            .map(|&r| step.probability(r - market.dividend_yield, self.probability_tolerance))
            .collect::<Result<Vec<_>, _>>()?;
        let flows = instrument.coupon_flows(self.steps);

        tracing::debug!(
            steps = self.steps,
            dt = step.dt,
            up = step.up,
            p0 = probabilities[0],
            credit_spread = self.credit_spread,
            policy = ?self.debt_discounting,
            blending = ?self.conversion_blending,
            "pricing convertible bond on CRR lattice"
        );

        let lattice = Lattice {
            bond: instrument,
            grid: TriangularGrid::crr(market.spot, step.up, step.down, self.steps),
            dt: step.dt,
            rates,
            probabilities,
            paid: flows.paid,
            accrued: flows.accrued,
            credit_spread: self.credit_spread,
            policy: self.debt_discounting,
            blending: self.conversion_blending,
        };

        let rolled = if let Some(arena) = &self.arena {
            let mut guard = arena.lock().unwrap_or_else(|poison| poison.into_inner());
            let (values, conversion) = guard.value_and_state_slices(self.steps + 1);
            lattice.rollback(values, conversion)
        } else {
            let mut values = vec![0.0_f64; self.steps + 1];
            let mut conversion = vec![0.0_f64; self.steps + 1];
            lattice.rollback(&mut values, &mut conversion)
        };

        let s_up = lattice.grid.get(1, 1);
        let s_down = lattice.grid.get(1, 0);
        let delta = (rolled.step1[1] - rolled.step1[0]) / (s_up - s_down);
        let conversion_value = instrument.conversion_ratio * market.spot;

        let mut diagnostics = Diagnostics::new();
        diagnostics.insert_key(DiagKey::NumSteps, self.steps as f64);
        diagnostics.insert_key(DiagKey::Vol, vol);
        diagnostics.insert_key(DiagKey::ConversionValue, conversion_value);
        diagnostics.insert_key(DiagKey::CreditSpread, self.credit_spread);
        diagnostics.insert_key(
            DiagKey::ConversionProbability,
            rolled.root_conversion_probability,
        );
        diagnostics.insert_key(DiagKey::Delta, delta);

        Ok(PricingResult {
            price: rolled.root,
            greeks: Some(Greeks {
                delta,
                ..Greeks::default()
            }),
            diagnostics,
        })
    }
}
