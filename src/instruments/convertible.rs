//! Convertible-bond contract schema (valuation lives in `engines::tree::convertible`).
//!
//! [`ConvertibleBond`] captures principal, coupon terms, maturity, conversion
//! terms, and the issuer [`CallSchedule`].
//! References: Tsiveriotis and Fernandes (1998); Hull (11th ed.) Ch. 26.
//! Coupon dates run back from maturity every `1 / coupon_frequency` years and
//! are snapped onto the pricing lattice by [`ConvertibleBond::coupon_flows`].

use serde::{Deserialize, Serialize};

use super::call_schedule::CallSchedule;
use crate::core::{Instrument, PricingError, ensure_finite};

/// Callable convertible bond.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertibleBond {
    /// Par amount repaid at maturity.
    pub principal: f64,
    /// Annual coupon rate.
    pub coupon_rate: f64,
    /// Coupon payments per year.
    pub coupon_frequency: u32,
    /// Maturity in years.
    pub maturity: f64,
    /// Shares received per bond when converted.
    pub conversion_ratio: f64,
    /// Stock price at or above which conversion is considered.
    pub conversion_price: f64,
    /// Issuer call prices by lattice step.
    pub call_schedule: CallSchedule,
}

/// Per-step coupon cash flows and accrued interest on a lattice.
#[derive(Debug, Clone, PartialEq)]
pub struct CouponFlows {
    /// Coupon paid at each step `0..=steps`; index 0 is always zero.
    pub paid: Vec<f64>,
    /// Interest accrued since the last coupon at each step `0..=steps`.
    pub accrued: Vec<f64>,
}

impl ConvertibleBond {
    /// Creates a non-callable convertible bond.
    pub fn new(
        principal: f64,
        coupon_rate: f64,
        coupon_frequency: u32,
        maturity: f64,
        conversion_ratio: f64,
        conversion_price: f64,
    ) -> Self {
        Self {
            principal,
            coupon_rate,
            coupon_frequency,
            maturity,
            conversion_ratio,
            conversion_price,
            call_schedule: CallSchedule::new(),
        }
    }

    /// Attaches an issuer call schedule.
    pub fn with_call_schedule(mut self, call_schedule: CallSchedule) -> Self {
        self.call_schedule = call_schedule;
        self
    }

    /// Coupon amount paid on each coupon date.
    #[inline]
    pub fn coupon_amount(&self) -> f64 {
        self.principal * self.coupon_rate / self.coupon_frequency as f64
    }

    /// Lays the coupon schedule onto a lattice with `steps` steps.
    ///
    /// Each coupon date is assigned to its nearest step (never step 0, which
    /// is the valuation date). Accrued interest resets to zero on coupon steps.
    ///
    /// # Examples
    /// ```
    /// use openlattice::instruments::ConvertibleBond;
    ///
    /// let bond = ConvertibleBond::new(100.0, 0.04, 2, 1.0, 1.0, 100.0);
    /// let flows = bond.coupon_flows(4);
    /// assert_eq!(flows.paid, vec![0.0, 0.0, 2.0, 0.0, 2.0]);
    /// assert!((flows.accrued[1] - 1.0).abs() < 1e-12);
    /// assert_eq!(flows.accrued[2], 0.0);
    /// ```
    pub fn coupon_flows(&self, steps: usize) -> CouponFlows {
        let mut paid = vec![0.0; steps + 1];
        let mut accrued = vec![0.0; steps + 1];
        if steps == 0 || self.coupon_frequency == 0 {
            return CouponFlows { paid, accrued };
        }

        let dt = self.maturity / steps as f64;
        let period = 1.0 / self.coupon_frequency as f64;
        let amount = self.coupon_amount();

        let mut k = 0usize;
        loop {
            let t = self.maturity - k as f64 * period;
            if t <= 1.0e-12 {
                break;
            }
            let step = ((t / dt).round() as usize).clamp(1, steps);
            paid[step] += amount;
            k += 1;
        }

        let first_coupon_step = paid.iter().position(|&c| c > 0.0).unwrap_or(steps);
        let mut last_coupon_time = first_coupon_step as f64 * dt - period;
        for (i, accrued_i) in accrued.iter_mut().enumerate() {
            let t = i as f64 * dt;
            if paid[i] > 0.0 {
                last_coupon_time = t;
            }
            *accrued_i = self.principal * self.coupon_rate * (t - last_coupon_time).max(0.0);
        }

        CouponFlows { paid, accrued }
    }

    /// Validates instrument fields.
    pub fn validate(&self) -> Result<(), PricingError> {
        for (name, value) in [
            ("convertible principal", self.principal),
            ("convertible coupon_rate", self.coupon_rate),
            ("convertible maturity", self.maturity),
            ("convertible conversion_ratio", self.conversion_ratio),
            ("convertible conversion_price", self.conversion_price),
        ] {
            ensure_finite(name, value)?;
        }

        if self.principal <= 0.0 {
            return Err(PricingError::invalid("convertible principal must be > 0"));
        }
        if self.coupon_rate < 0.0 {
            return Err(PricingError::invalid("convertible coupon_rate must be >= 0"));
        }
        if self.coupon_frequency == 0 {
            return Err(PricingError::invalid(
                "convertible coupon_frequency must be >= 1",
            ));
        }
        if self.maturity <= 0.0 {
            return Err(PricingError::invalid("convertible maturity must be > 0"));
        }
        if self.conversion_ratio < 0.0 {
            return Err(PricingError::invalid(
                "convertible conversion_ratio must be >= 0",
            ));
        }
        if self.conversion_price <= 0.0 {
            return Err(PricingError::invalid(
                "convertible conversion_price must be > 0",
            ));
        }
        self.call_schedule.validate()
    }
}

impl Instrument for ConvertibleBond {
    fn instrument_type(&self) -> &str {
        "ConvertibleBond"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn per_step_coupons_match_step_accrual() {
        // Quarterly coupons on a quarterly lattice: one coupon per step.
        let bond = ConvertibleBond::new(100.0, 0.08, 4, 2.0, 1.0, 100.0);
        let flows = bond.coupon_flows(8);
        assert_eq!(flows.paid[0], 0.0);
        for &c in &flows.paid[1..] {
            assert_relative_eq!(c, 100.0 * 0.08 * 0.25, epsilon = 1e-12);
        }
        assert!(flows.accrued.iter().skip(1).all(|&a| a == 0.0));
    }

    #[test]
    fn total_coupon_matches_annual_rate() {
        let bond = ConvertibleBond::new(1000.0, 0.05, 2, 3.0, 10.0, 100.0);
        let flows = bond.coupon_flows(37);
        let total: f64 = flows.paid.iter().sum();
        assert_relative_eq!(total, 1000.0 * 0.05 * 3.0, epsilon = 1e-9);
    }

    #[test]
    fn accrual_before_first_coupon_counts_from_prior_period() {
        // Annual coupon on a 1.5y bond: the first coupon falls at t = 0.5,
        // so half a year has already accrued at the valuation date.
        let bond = ConvertibleBond::new(100.0, 0.06, 1, 1.5, 1.0, 100.0);
        let flows = bond.coupon_flows(3);
        assert_eq!(flows.paid, vec![0.0, 6.0, 0.0, 6.0]);
        assert_relative_eq!(flows.accrued[0], 3.0, epsilon = 1e-12);
        assert_relative_eq!(flows.accrued[2], 3.0, epsilon = 1e-12);
    }

    #[test]
    fn validation_rejects_bad_terms() {
        let good = ConvertibleBond::new(100.0, 0.05, 2, 5.0, 1.0, 100.0);
        assert!(good.validate().is_ok());
        assert!(ConvertibleBond { principal: 0.0, ..good.clone() }.validate().is_err());
        assert!(ConvertibleBond { coupon_frequency: 0, ..good.clone() }.validate().is_err());
        assert!(ConvertibleBond { maturity: 0.0, ..good.clone() }.validate().is_err());
        assert!(ConvertibleBond { conversion_ratio: -1.0, ..good.clone() }.validate().is_err());
        assert!(ConvertibleBond { conversion_price: 0.0, ..good }.validate().is_err());
    }
}
