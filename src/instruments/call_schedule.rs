//! Issuer call schedule keyed by lattice step.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::{PricingError, ensure_finite};

/// Call price reported for steps with no schedule entry.
///
/// An unscheduled step is non-callable: `min(hold, NOT_CALLABLE)` never binds.
pub const NOT_CALLABLE: f64 = f64::INFINITY;

/// Sparse mapping from lattice step index to issuer call price.
///
/// Step indices refer to the pricing engine's lattice (`0..=steps`), so a
/// schedule built with [`CallSchedule::from_times`] must use the same step
/// count as the engine that prices the bond.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallSchedule {
    prices: BTreeMap<usize, f64>,
}

impl CallSchedule {
    /// Empty schedule: the bond is never callable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a schedule from `(step, call_price)` entries.
    ///
    /// Later duplicates of a step replace earlier ones.
    ///
    /// # Errors
    /// Returns [`PricingError::InvalidParameter`] when a call price is
    /// non-positive or non-finite.
    pub fn from_steps<I>(entries: I) -> Result<Self, PricingError>
    where
        I: IntoIterator<Item = (usize, f64)>,
    {
        let mut prices = BTreeMap::new();
        for (step, price) in entries {
            validate_price(price)?;
            prices.insert(step, price);
        }
        Ok(Self { prices })
    }

    /// Builds a schedule from `(time, call_price)` entries snapped to the
    /// nearest step of a lattice with `steps` steps over `maturity` years.
    ///
    /// # Examples
    /// ```
    /// use openlattice::instruments::CallSchedule;
    ///
    /// let schedule = CallSchedule::from_times(&[(0.5, 105.0), (1.0, 102.0)], 2.0, 8).unwrap();
    /// assert_eq!(schedule.call_price(2), 105.0);
    /// assert_eq!(schedule.call_price(4), 102.0);
    /// assert!(schedule.call_price(3).is_infinite());
    /// ```
    pub fn from_times(
        entries: &[(f64, f64)],
        maturity: f64,
        steps: usize,
    ) -> Result<Self, PricingError> {
        ensure_finite("call schedule maturity", maturity)?;
        if maturity <= 0.0 || steps == 0 {
            return Err(PricingError::invalid(
                "call schedule needs maturity > 0 and steps > 0",
            ));
        }
        let mut prices = BTreeMap::new();
        for &(t, price) in entries {
            ensure_finite("call date", t)?;
            if !(0.0..=maturity).contains(&t) {
                return Err(PricingError::invalid(format!(
                    "call date {t} lies outside [0, {maturity}]"
                )));
            }
            validate_price(price)?;
            let step = ((t / maturity) * steps as f64).round() as usize;
            prices.insert(step.min(steps), price);
        }
        Ok(Self { prices })
    }

    /// Single call price applying on every step of `first_step..=last_step`.
    ///
    /// Steps before `first_step` form the call-protection period.
    pub fn callable_from(
        first_step: usize,
        last_step: usize,
        price: f64,
    ) -> Result<Self, PricingError> {
        if first_step > last_step {
            return Err(PricingError::invalid(
                "call window first_step must not exceed last_step",
            ));
        }
        Self::from_steps((first_step..=last_step).map(|step| (step, price)))
    }

    /// Call price at `step`, or [`NOT_CALLABLE`] when the step has no entry.
    #[inline]
    pub fn call_price(&self, step: usize) -> f64 {
        self.prices.get(&step).copied().unwrap_or(NOT_CALLABLE)
    }

    #[inline]
    pub fn is_callable(&self, step: usize) -> bool {
        self.prices.contains_key(&step)
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    /// Re-checks entries after deserialization.
    pub fn validate(&self) -> Result<(), PricingError> {
        self.prices.values().try_for_each(|&price| validate_price(price))
    }
}

fn validate_price(price: f64) -> Result<(), PricingError> {
    ensure_finite("call price", price)?;
    if price <= 0.0 {
        return Err(PricingError::invalid("call price must be > 0"));
    }
    Ok(())
}
