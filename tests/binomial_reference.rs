//! CRR binomial engine reference tests.
//!
//! Sources:
//! - Hull (11th ed.) Example 15.6 and Ch. 21 for European/American values
//! - Barone-Adesi & Whaley (1987) via Haug "Option Pricing Formulas" (1998), pp. 24
//! - Ju (1999) short-dated American puts, as tabulated in QuantLib americanoption.cpp

use approx::assert_abs_diff_eq;
use openlattice::core::{ExerciseStyle, OptionType, PricingEngine, PricingError};
use openlattice::engines::analytic::bs_price;
use openlattice::engines::tree::BinomialTreeEngine;
use openlattice::instruments::VanillaOption;
use openlattice::market::Market;

fn make_market(spot: f64, rate: f64, dividend_yield: f64, vol: f64) -> Market {
    Market::builder()
        .spot(spot)
        .rate(rate)
        .dividend_yield(dividend_yield)
        .flat_vol(vol)
        .build()
        .expect("market build failed")
}

#[allow(clippy::too_many_arguments)]
fn tree_price(
    option_type: OptionType,
    exercise: ExerciseStyle,
    spot: f64,
    strike: f64,
    rate: f64,
    q: f64,
    vol: f64,
    t: f64,
    steps: usize,
) -> f64 {
    let option = VanillaOption {
        option_type,
        strike,
        expiry: t,
        exercise,
    };
    BinomialTreeEngine::new(steps)
        .price(&option, &make_market(spot, rate, q, vol))
        .expect("pricing failed")
        .price
}

#[test]
fn european_call_scenario_matches_black_scholes() {
    let price = tree_price(
        OptionType::Call,
        ExerciseStyle::European,
        100.0,
        100.0,
        0.05,
        0.0,
        0.2,
        1.0,
        500,
    );
    assert!((price - 10.4506).abs() < 0.01, "got {price}");
}

#[test]
fn european_error_shrinks_like_one_over_n() {
    let analytic = bs_price(OptionType::Put, 100.0, 105.0, 0.03, 0.01, 0.25, 1.5);
    for steps in [25, 50, 100, 200, 400, 800] {
        let price = tree_price(
            OptionType::Put,
            ExerciseStyle::European,
            100.0,
            105.0,
            0.03,
            0.01,
            0.25,
            1.5,
            steps,
        );
        let err = (price - analytic).abs();
        assert!(err < 5.0 / steps as f64, "N={steps}: err={err}");
    }
}

#[test]
fn american_call_without_dividends_has_no_early_exercise_value() {
    for (spot, strike) in [(90.0, 100.0), (100.0, 100.0), (120.0, 100.0)] {
        let american = tree_price(
            OptionType::Call,
            ExerciseStyle::American,
            spot,
            strike,
            0.05,
            0.0,
            0.3,
            2.0,
            300,
        );
        let european = tree_price(
            OptionType::Call,
            ExerciseStyle::European,
            spot,
            strike,
            0.05,
            0.0,
            0.3,
            2.0,
            300,
        );
        assert_abs_diff_eq!(american, european, epsilon = 1e-9);
    }
}

#[test]
fn put_call_parity_without_carry() {
    let call = tree_price(
        OptionType::Call,
        ExerciseStyle::European,
        100.0,
        95.0,
        0.0,
        0.0,
        0.2,
        1.0,
        400,
    );
    let put = tree_price(
        OptionType::Put,
        ExerciseStyle::European,
        100.0,
        95.0,
        0.0,
        0.0,
        0.2,
        1.0,
        400,
    );
    assert_abs_diff_eq!(call - put, 100.0 - 95.0, epsilon = 1e-9);
}

#[test]
fn zero_volatility_is_rejected_for_every_style() {
    for option in [
        VanillaOption::european_call(100.0, 1.0),
        VanillaOption::american_put(100.0, 1.0),
    ] {
        let err = BinomialTreeEngine::new(100)
            .price(&option, &make_market(100.0, 0.05, 0.0, 0.0))
            .unwrap_err();
        assert!(matches!(err, PricingError::NumericalInstability(_)));
    }
}

struct BawCase {
    option_type: OptionType,
    spot: f64,
    t: f64,
    vol: f64,
    expected: f64,
}

// K=100, q=0.10, r=0.10. BAW is an approximation, so the tolerance is wide.
const BAW_CASES: &[BawCase] = &[
    BawCase { option_type: OptionType::Call, spot: 90.0, t: 0.10, vol: 0.15, expected: 0.0206 },
    BawCase { option_type: OptionType::Call, spot: 100.0, t: 0.10, vol: 0.25, expected: 3.1280 },
    BawCase { option_type: OptionType::Call, spot: 110.0, t: 0.50, vol: 0.35, expected: 15.5689 },
    BawCase { option_type: OptionType::Put, spot: 90.0, t: 0.10, vol: 0.15, expected: 10.0000 },
    BawCase { option_type: OptionType::Put, spot: 100.0, t: 0.50, vol: 0.25, expected: 6.8014 },
    BawCase { option_type: OptionType::Put, spot: 110.0, t: 0.50, vol: 0.35, expected: 5.8823 },
];

#[test]
fn baw_reference_values() {
    for (i, case) in BAW_CASES.iter().enumerate() {
        let price = tree_price(
            case.option_type,
            ExerciseStyle::American,
            case.spot,
            100.0,
            0.10,
            0.10,
            case.vol,
            case.t,
            1000,
        );
        let err = (price - case.expected).abs();
        assert!(
            err < 0.15,
            "BAW #{i}: S={}, T={}, vol={}: got {price}, expected {}, err={err}",
            case.spot, case.t, case.vol, case.expected
        );
    }
}

struct JuCase {
    strike: f64,
    t: f64,
    vol: f64,
    expected: f64,
}

// S=40, q=0, r=0.0488.
const JU_PUTS: &[JuCase] = &[
    JuCase { strike: 35.0, t: 0.3333, vol: 0.20, expected: 0.201 },
    JuCase { strike: 40.0, t: 0.5833, vol: 0.20, expected: 1.984 },
    JuCase { strike: 45.0, t: 0.3333, vol: 0.20, expected: 5.084 },
    JuCase { strike: 40.0, t: 0.3333, vol: 0.30, expected: 2.477 },
    JuCase { strike: 45.0, t: 0.5833, vol: 0.30, expected: 6.231 },
    JuCase { strike: 35.0, t: 0.5833, vol: 0.40, expected: 2.150 },
    JuCase { strike: 40.0, t: 0.0833, vol: 0.40, expected: 1.767 },
];

#[test]
fn ju_american_puts() {
    let plain = BinomialTreeEngine::new(1000);
    let corrected = BinomialTreeEngine::new(1000).with_control_variate(true);
    for (i, case) in JU_PUTS.iter().enumerate() {
        let option = VanillaOption::american_put(case.strike, case.t);
        let market = make_market(40.0, 0.0488, 0.0, case.vol);
        for engine in [&plain, &corrected] {
            let price = engine.price(&option, &market).expect("pricing failed").price;
            let err = (price - case.expected).abs();
            assert!(
                err < 0.02,
                "Ju put #{i}: K={}, T={}, vol={}: got {price}, expected {}, err={err}",
                case.strike, case.t, case.vol, case.expected
            );
        }
    }
}
