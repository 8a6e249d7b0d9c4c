//! Plain-vanilla option contract priced by the single-asset lattice.
//!
//! [`VanillaOption`] stores side, strike, expiry, and exercise rights
//! ([`crate::core::ExerciseStyle`]: European/American).
//! References: Hull (11th ed.) Ch. 10-13 for payoff and exercise conventions.

use serde::{Deserialize, Serialize};

use crate::core::{ExerciseStyle, Instrument, OptionType, PricingError, ensure_finite};

/// Vanilla option contract.
///
/// # Examples
/// ```
/// use openlattice::core::{ExerciseStyle, OptionType};
/// use openlattice::instruments::VanillaOption;
///
/// let option = VanillaOption {
///     option_type: OptionType::Call,
///     strike: 100.0,
///     expiry: 1.0,
///     exercise: ExerciseStyle::European,
/// };
/// assert!(option.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VanillaOption {
    /// Call or put.
    pub option_type: OptionType,
    /// Strike level.
    pub strike: f64,
    /// Expiry in years.
    pub expiry: f64,
    /// Exercise style.
    pub exercise: ExerciseStyle,
}

impl VanillaOption {
    /// Builds a European call option.
    pub fn european_call(strike: f64, expiry: f64) -> Self {
        Self {
            option_type: OptionType::Call,
            strike,
            expiry,
            exercise: ExerciseStyle::European,
        }
    }

    /// Builds a European put option.
    pub fn european_put(strike: f64, expiry: f64) -> Self {
        Self {
            option_type: OptionType::Put,
            strike,
            expiry,
            exercise: ExerciseStyle::European,
        }
    }

    /// Builds an American call option.
    pub fn american_call(strike: f64, expiry: f64) -> Self {
        Self {
            option_type: OptionType::Call,
            strike,
            expiry,
            exercise: ExerciseStyle::American,
        }
    }

    /// Builds an American put option.
    ///
    /// # Examples
    /// ```
    /// use openlattice::core::ExerciseStyle;
    /// use openlattice::instruments::VanillaOption;
    ///
    /// let put = VanillaOption::american_put(100.0, 2.0);
    /// assert!(matches!(put.exercise, ExerciseStyle::American));
    /// ```
    pub fn american_put(strike: f64, expiry: f64) -> Self {
        Self {
            option_type: OptionType::Put,
            strike,
            expiry,
            exercise: ExerciseStyle::American,
        }
    }

    /// Same contract with a different exercise style.
    pub fn with_exercise(self, exercise: ExerciseStyle) -> Self {
        Self { exercise, ..self }
    }

    /// Validates instrument fields.
    ///
    /// # Errors
    /// Returns [`PricingError::InvalidParameter`] when `strike <= 0`,
    /// `expiry <= 0`, or either is non-finite.
    pub fn validate(&self) -> Result<(), PricingError> {
        ensure_finite("vanilla strike", self.strike)?;
        ensure_finite("vanilla expiry", self.expiry)?;
        if self.strike <= 0.0 {
            return Err(PricingError::invalid("vanilla strike must be > 0"));
        }
        if self.expiry <= 0.0 {
            return Err(PricingError::invalid("vanilla expiry must be > 0"));
        }
        Ok(())
    }
}

impl Instrument for VanillaOption {
    fn instrument_type(&self) -> &str {
        "VanillaOption"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_positive_terms_are_rejected() {
        assert!(VanillaOption::european_call(0.0, 1.0).validate().is_err());
        assert!(VanillaOption::european_call(100.0, 0.0).validate().is_err());
        assert!(VanillaOption::american_put(100.0, -1.0).validate().is_err());
        assert!(VanillaOption::american_put(f64::INFINITY, 1.0).validate().is_err());
    }

    #[test]
    fn with_exercise_keeps_other_terms() {
        let american = VanillaOption::european_put(95.0, 0.5).with_exercise(ExerciseStyle::American);
        assert_eq!(american, VanillaOption::american_put(95.0, 0.5));
    }
}
