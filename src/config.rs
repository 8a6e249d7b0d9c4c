//! Shared lattice settings.
//!
//! [`LatticeConfig`] collects the knobs every tree engine reads: default step
//! counts per engine, the probability rounding tolerance, the control-variate
//! toggle, and the convertible discounting and blending policies. It can be
//! built in code or loaded from TOML; missing keys fall back to
//! [`LatticeConfig::default`].

use serde::{Deserialize, Serialize};

use crate::core::PricingError;
use crate::engines::tree::{ConversionBlending, DebtDiscounting};
use crate::engines::tree::crr::DEFAULT_PROBABILITY_TOLERANCE;

/// Largest step count accepted for the two-asset lattice (cost is cubic in N).
pub const MAX_TWO_ASSET_STEPS: usize = 2_000;

/// Settings shared by the lattice engines.
///
/// # Examples
///
/// ```rust
/// use openlattice::config::LatticeConfig;
///
/// let config = LatticeConfig::from_toml_str(
///     r#"
///     binomial_steps = 800
///     control_variate = true
///     "#,
/// )
/// .unwrap();
///
/// assert_eq!(config.binomial_steps, 800);
/// assert_eq!(config.two_asset_steps, 100);
/// assert!(config.control_variate);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatticeConfig {
    /// Steps for the single-asset CRR tree.
    pub binomial_steps: usize,
    /// Steps for the two-asset tree.
    pub two_asset_steps: usize,
    /// Steps for the convertible bond tree.
    pub convertible_steps: usize,
    /// Rounding slack accepted on risk-neutral probabilities before clamping.
    pub probability_tolerance: f64,
    /// Apply the Black-Scholes control variate to American vanillas.
    pub control_variate: bool,
    /// Discount rate applied to the debt leg of a convertible.
    pub debt_discounting: DebtDiscounting,
    /// Conversion-probability rollback rule for convertibles.
    pub conversion_blending: ConversionBlending,
}

impl Default for LatticeConfig {
    fn default() -> Self {
        Self {
            binomial_steps: 500,
            two_asset_steps: 100,
            convertible_steps: 200,
            probability_tolerance: DEFAULT_PROBABILITY_TOLERANCE,
            control_variate: false,
            debt_discounting: DebtDiscounting::default(),
            conversion_blending: ConversionBlending::default(),
        }
    }
}

impl LatticeConfig {
    /// Creates a new configuration builder.
    #[inline]
    pub fn builder() -> LatticeConfigBuilder {
        LatticeConfigBuilder::default()
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    /// [`PricingError::InvalidParameter`] on malformed TOML or invalid values.
    pub fn from_toml_str(source: &str) -> Result<Self, PricingError> {
        let config: Self = toml::from_str(source)
            .map_err(|e| PricingError::invalid(format!("lattice config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration to TOML.
    pub fn to_toml_string(&self) -> Result<String, PricingError> {
        toml::to_string(self).map_err(|e| PricingError::invalid(format!("lattice config: {e}")))
    }

    /// Validates step counts and the probability tolerance.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::InvalidParameter`] if:
    /// - any step count is 0
    /// - `two_asset_steps` exceeds [`MAX_TWO_ASSET_STEPS`]
    /// - `probability_tolerance` is negative, non-finite, or at least `1e-3`
    pub fn validate(&self) -> Result<(), PricingError> {
        for (name, steps) in [
            ("binomial_steps", self.binomial_steps),
            ("two_asset_steps", self.two_asset_steps),
            ("convertible_steps", self.convertible_steps),
        ] {
            if steps == 0 {
                return Err(PricingError::invalid(format!("{name} must be > 0")));
            }
        }
        if self.two_asset_steps > MAX_TWO_ASSET_STEPS {
            return Err(PricingError::invalid(format!(
                "two_asset_steps must be <= {MAX_TWO_ASSET_STEPS}"
            )));
        }
        if !self.probability_tolerance.is_finite()
            || !(0.0..1.0e-3).contains(&self.probability_tolerance)
        {
            return Err(PricingError::invalid(
                "probability_tolerance must be in [0, 1e-3)",
            ));
        }
        Ok(())
    }
}

/// Builder for [`LatticeConfig`], validated at build time.
#[derive(Debug, Clone, Default)]
pub struct LatticeConfigBuilder {
    config: LatticeConfig,
}

impl LatticeConfigBuilder {
    #[inline]
    pub fn binomial_steps(mut self, steps: usize) -> Self {
        self.config.binomial_steps = steps;
        self
    }

    #[inline]
    pub fn two_asset_steps(mut self, steps: usize) -> Self {
        self.config.two_asset_steps = steps;
        self
    }

    #[inline]
    pub fn convertible_steps(mut self, steps: usize) -> Self {
        self.config.convertible_steps = steps;
        self
    }

    #[inline]
    pub fn probability_tolerance(mut self, tolerance: f64) -> Self {
        self.config.probability_tolerance = tolerance;
        self
    }

    #[inline]
    pub fn control_variate(mut self, enabled: bool) -> Self {
        self.config.control_variate = enabled;
        self
    }

    #[inline]
    pub fn debt_discounting(mut self, policy: DebtDiscounting) -> Self {
        self.config.debt_discounting = policy;
        self
    }

    #[inline]
    pub fn conversion_blending(mut self, blending: ConversionBlending) -> Self {
        self.config.conversion_blending = blending;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    /// See [`LatticeConfig::validate`].
    pub fn build(self) -> Result<LatticeConfig, PricingError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
