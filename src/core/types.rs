use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::PricingError;

/// Plain-vanilla option side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionType {
    /// Call option payoff profile.
    Call,
    /// Put option payoff profile.
    Put,
}

impl OptionType {
    /// Intrinsic value `max(sign * (underlying - strike), 0)`.
    #[inline(always)]
    pub fn intrinsic(self, underlying: f64, strike: f64) -> f64 {
        match self {
            Self::Call => (underlying - strike).max(0.0),
            Self::Put => (strike - underlying).max(0.0),
        }
    }
}

impl FromStr for OptionType {
    type Err = PricingError;

    /// Parses `C`/`call` and `P`/`put` tags, case-insensitively.
    ///
    /// # Examples
    /// ```
    /// use openlattice::core::OptionType;
    ///
    /// assert_eq!("C".parse::<OptionType>().unwrap(), OptionType::Call);
    /// assert_eq!("put".parse::<OptionType>().unwrap(), OptionType::Put);
    /// assert!("straddle".parse::<OptionType>().is_err());
    /// ```
    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "c" | "call" => Ok(Self::Call),
            "p" | "put" => Ok(Self::Put),
            other => Err(PricingError::InvalidParameter(format!(
                "unrecognized option type tag `{other}`"
            ))),
        }
    }
}

/// Exercise rights for an option contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExerciseStyle {
    /// Exercise only at expiry.
    #[default]
    European,
    /// Exercise at any lattice step up to expiry.
    American,
}

impl ExerciseStyle {
    /// Whether intrinsic value may override continuation before expiry.
    #[inline]
    pub fn allows_early_exercise(self) -> bool {
        matches!(self, Self::American)
    }
}

impl FromStr for ExerciseStyle {
    type Err = PricingError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "e" | "european" => Ok(Self::European),
            "a" | "american" => Ok(Self::American),
            other => Err(PricingError::InvalidParameter(format!(
                "unrecognized exercise style tag `{other}`"
            ))),
        }
    }
}
