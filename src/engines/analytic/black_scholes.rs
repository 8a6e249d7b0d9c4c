//! Closed-form Black-Scholes-Merton price for European vanillas.
//!
//! Consumed by the binomial engine's control variate and by convergence checks;
//! no engine wrapper or Greeks live here.

use crate::core::OptionType;
use crate::math::normal_cdf;

#[inline]
fn d1_d2(
    spot: f64,
    strike: f64,
    rate: f64,
    dividend_yield: f64,
    vol: f64,
    expiry: f64,
) -> (f64, f64) {
    let sig_sqrt_t = vol * expiry.sqrt();
    let d1 =
        ((spot / strike).ln() + (rate - dividend_yield + 0.5 * vol * vol) * expiry) / sig_sqrt_t;
    (d1, d1 - sig_sqrt_t)
}

/// Black-Scholes-Merton price with continuous dividend yield.
///
/// Returns intrinsic value for `expiry <= 0` and the discounted forward
/// intrinsic for `vol <= 0`.
///
/// # Examples
/// ```rust
/// use openlattice::core::OptionType;
/// use openlattice::engines::analytic::bs_price;
///
/// let call = bs_price(OptionType::Call, 100.0, 100.0, 0.05, 0.0, 0.20, 1.0);
/// assert!((call - 10.4506).abs() < 1e-3);
/// ```
#[inline]
pub fn bs_price(
    option_type: OptionType,
    spot: f64,
    strike: f64,
    rate: f64,
    dividend_yield: f64,
    vol: f64,
    expiry: f64,
) -> f64 {
    if expiry <= 0.0 {
        return option_type.intrinsic(spot, strike);
    }
    let df_r = (-rate * expiry).exp();
    let df_q = (-dividend_yield * expiry).exp();
    if vol <= 0.0 {
        return option_type.intrinsic(spot * df_q, strike * df_r);
    }

    let (d1, d2) = d1_d2(spot, strike, rate, dividend_yield, vol, expiry);
    match option_type {
        OptionType::Call => spot * df_q * normal_cdf(d1) - strike * df_r * normal_cdf(d2),
        OptionType::Put => strike * df_r * normal_cdf(-d2) - spot * df_q * normal_cdf(-d1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn hull_reference_values() {
        // Hull Example 15.6: S=42, K=40, r=10%, vol=20%, T=0.5.
        let call = bs_price(OptionType::Call, 42.0, 40.0, 0.10, 0.0, 0.20, 0.5);
        let put = bs_price(OptionType::Put, 42.0, 40.0, 0.10, 0.0, 0.20, 0.5);
        assert_abs_diff_eq!(call, 4.76, epsilon = 5e-3);
        assert_abs_diff_eq!(put, 0.81, epsilon = 5e-3);
    }

    #[test]
    fn parity_holds_with_dividends() {
        let (s, k, r, q, vol, t) = (100.0, 95.0, 0.03, 0.02, 0.3, 2.0);
        let call = bs_price(OptionType::Call, s, k, r, q, vol, t);
        let put = bs_price(OptionType::Put, s, k, r, q, vol, t);
        let forward_gap = s * (-q * t).exp() - k * (-r * t).exp();
        assert_abs_diff_eq!(call - put, forward_gap, epsilon = 1e-6);
    }

    #[test]
    fn degenerate_inputs_fall_back_to_intrinsic() {
        assert_eq!(bs_price(OptionType::Put, 90.0, 100.0, 0.05, 0.0, 0.2, 0.0), 10.0);
        let zero_vol = bs_price(OptionType::Call, 100.0, 100.0, 0.05, 0.0, 0.0, 1.0);
        assert_abs_diff_eq!(zero_vol, 100.0 - 100.0 * (-0.05_f64).exp(), epsilon = 1e-12);
    }
}
