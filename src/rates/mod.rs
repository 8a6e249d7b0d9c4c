//! Rate term structures consumed by the lattice engines.

pub mod zero_curve;

pub use zero_curve::ZeroCurve;
