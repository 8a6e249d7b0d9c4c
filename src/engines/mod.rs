//! Pricing engine implementations.

pub mod analytic;
pub mod batch;
pub mod tree;

pub use batch::price_batch;
