//! OpenLattice prices options and convertible bonds on recombining trees.
//!
//! Three lattice engines share one layout (build grid, terminal condition,
//! backward recursion with exercise or call overrides):
//! - [`BinomialTreeEngine`](engines::tree::BinomialTreeEngine): Cox-Ross-Rubinstein tree for
//!   European and American vanillas, with lattice Greeks and an optional
//!   Black-Scholes control variate.
//! - [`TwoAssetTreeEngine`](engines::tree::TwoAssetTreeEngine): four-branch log lattice over two
//!   correlated underlyings for European and American spread options.
//! - [`ConvertibleTreeEngine`](engines::tree::ConvertibleTreeEngine): CRR stock tree with coupon
//!   accrual, conversion-probability weighted credit discounting, and an issuer call schedule.
//!
//! References used across modules include:
//! - Hull, *Options, Futures, and Other Derivatives* (11th ed.), Ch. 13, 21, 26.
//! - Cox, Ross and Rubinstein (1979) for the binomial lattice.
//! - Tsiveriotis and Fernandes (1998) for credit-adjusted convertible valuation.
//!
//! Numerical considerations:
//! - CRR prices converge at order `1/N` with an even/odd oscillation.
//! - The two-asset lattice costs `O(N^3)`; keep `N` in the low hundreds.
//! - Probabilities outside `[0, 1]` beyond a small rounding tolerance are
//!   reported as [`PricingError::NumericalInstability`](core::PricingError), never clamped.
//!
//! # Feature Flags
//! - `parallel`: enables Rayon-powered two-asset layer recursion and batch pricing.
//!
//! # Quick Start
//! Price an American put:
//! ```rust
//! use openlattice::core::PricingEngine;
//! use openlattice::engines::tree::BinomialTreeEngine;
//! use openlattice::instruments::VanillaOption;
//! use openlattice::market::Market;
//!
//! let market = Market::builder()
//!     .spot(100.0)
//!     .rate(0.05)
//!     .flat_vol(0.20)
//!     .build()
//!     .unwrap();
//! let put = VanillaOption::american_put(100.0, 1.0);
//! let result = BinomialTreeEngine::new(500).price(&put, &market).unwrap();
//! assert!(result.price > 6.0 && result.price < 6.2);
//! assert!(result.greeks.unwrap().delta < 0.0);
//! ```
//!
//! Value a callable convertible:
//! ```rust
//! use openlattice::core::PricingEngine;
//! use openlattice::engines::tree::ConvertibleTreeEngine;
//! use openlattice::instruments::{CallSchedule, ConvertibleBond};
//! use openlattice::market::Market;
//!
//! let market = Market::builder()
//!     .spot(50.0)
//!     .rate(0.04)
//!     .flat_vol(0.30)
//!     .build()
//!     .unwrap();
//! let bond = ConvertibleBond::new(100.0, 0.03, 2, 5.0, 2.0, 50.0)
//!     .with_call_schedule(CallSchedule::callable_from(80, 200, 110.0).unwrap());
//! let pv = ConvertibleTreeEngine::new(0.02)
//!     .with_steps(200)
//!     .price(&bond, &market)
//!     .unwrap()
//!     .price;
//! assert!(pv >= 100.0);
//! ```

pub mod config;
pub mod core;
pub mod engines;
pub mod instruments;
pub mod market;
pub mod math;
pub mod rates;

/// Common imports for ergonomic usage.
pub mod prelude {
    pub use crate::config::LatticeConfig;
    pub use crate::core::*;
    pub use crate::engines::price_batch;
    pub use crate::engines::tree::{
        BinomialTreeEngine, ConversionBlending, ConvertibleTreeEngine, DebtDiscounting,
        TwoAssetTreeEngine,
    };
    pub use crate::instruments::*;
    pub use crate::market::*;
    pub use crate::rates::ZeroCurve;
}
