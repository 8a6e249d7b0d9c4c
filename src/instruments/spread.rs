//! Two-asset spread option contract.
//!
//! Payoff is `max(S1 - S2 - K, 0)` for a call and `max(K - S1 + S2, 0)` for a
//! put. Both underlyings, their dividend yields, volatilities, and correlation
//! travel with the contract, so the two-asset engine needs no market snapshot.

use serde::{Deserialize, Serialize};

use crate::core::{ExerciseStyle, Instrument, OptionType, PricingError, ensure_finite};

/// Two-asset spread option input bundle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpreadOption {
    pub s1: f64,
    pub s2: f64,
    pub k: f64,
    pub vol1: f64,
    pub vol2: f64,
    pub rho: f64,
    pub q1: f64,
    pub q2: f64,
    pub r: f64,
    pub t: f64,
    pub option_type: OptionType,
    pub exercise: ExerciseStyle,
}

impl SpreadOption {
    /// Spread payoff for the two terminal (or exercise-time) prices.
    #[inline(always)]
    pub fn payoff(&self, s1: f64, s2: f64) -> f64 {
        self.option_type.intrinsic(s1 - s2, self.k)
    }

    /// Validates spread option fields.
    pub fn validate(&self) -> Result<(), PricingError> {
        for (name, value) in [
            ("spread s1", self.s1),
            ("spread s2", self.s2),
            ("spread strike k", self.k),
            ("spread vol1", self.vol1),
            ("spread vol2", self.vol2),
            ("spread rho", self.rho),
            ("spread q1", self.q1),
            ("spread q2", self.q2),
            ("spread rate r", self.r),
            ("spread maturity t", self.t),
        ] {
            ensure_finite(name, value)?;
        }

        if self.s1 <= 0.0 || self.s2 <= 0.0 {
            return Err(PricingError::invalid("spread spots s1 and s2 must be > 0"));
        }
        if self.k <= 0.0 {
            return Err(PricingError::invalid("spread strike k must be > 0"));
        }
        if self.vol1 < 0.0 || self.vol2 < 0.0 {
            return Err(PricingError::invalid(
                "spread volatilities vol1 and vol2 must be >= 0",
            ));
        }
        if !(-1.0..=1.0).contains(&self.rho) {
            return Err(PricingError::invalid(
                "spread correlation rho must be in [-1, 1]",
            ));
        }
        if self.q1 < 0.0 || self.q2 < 0.0 {
            return Err(PricingError::invalid(
                "spread dividend yields q1 and q2 must be >= 0",
            ));
        }
        if self.t <= 0.0 {
            return Err(PricingError::invalid("spread maturity t must be > 0"));
        }

        Ok(())
    }
}

impl Instrument for SpreadOption {
    fn instrument_type(&self) -> &str {
        "SpreadOption"
    }
}
