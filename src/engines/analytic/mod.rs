//! Closed-form reference prices used alongside the lattice engines.

pub mod black_scholes;

pub use black_scholes::bs_price;
