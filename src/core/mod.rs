//! Core traits, common domain types, and library-wide result/error structures.

pub mod engine;
pub mod types;

pub use engine::*;
pub use types::*;

/// Rejects NaN and infinite scalar inputs with a named message.
pub(crate) fn ensure_finite(name: &str, value: f64) -> Result<(), PricingError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(PricingError::invalid(format!("{name} must be finite")))
    }
}
