//! Engine traits, result payloads, and the library-wide error type.

use crate::market::Market;

/// Standardized Greeks container used by engine results.
///
/// Lattice engines read these off the first tree layers, so fields an engine
/// cannot observe on its grid are reported as `0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Greeks {
    /// First derivative to spot.
    pub delta: f64,
    /// Second derivative to spot.
    pub gamma: f64,
    /// First derivative to calendar time (per year).
    pub theta: f64,
}

/// Common trait implemented by every priceable instrument.
pub trait Instrument: std::fmt::Debug {
    /// Returns a short type identifier for diagnostics and logging.
    fn instrument_type(&self) -> &str;
}

/// Pricing engine abstraction over an instrument type.
pub trait PricingEngine<I: Instrument> {
    /// Prices an instrument under the provided market state.
    fn price(&self, instrument: &I, market: &Market) -> Result<PricingResult, PricingError>;
}

/// Compact key set for engine diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagKey {
    ControlVariate,
    ConversionProbability,
    ConversionValue,
    CreditSpread,
    Delta,
    NumSteps,
    Pdd,
    Pdu,
    Pu,
    Pud,
    Puu,
    U,
    Vol,
}

impl DiagKey {
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ControlVariate => "control_variate",
            Self::ConversionProbability => "conversion_probability",
            Self::ConversionValue => "conversion_value",
            Self::CreditSpread => "credit_spread",
            Self::Delta => "delta",
            Self::NumSteps => "num_steps",
            Self::Pdd => "p_dd",
            Self::Pdu => "p_du",
            Self::Pu => "pu",
            Self::Pud => "p_ud",
            Self::Puu => "p_uu",
            Self::U => "u",
            Self::Vol => "vol",
        }
    }
}

impl std::str::FromStr for DiagKey {
    type Err = ();

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        match key {
            "control_variate" => Ok(Self::ControlVariate),
            "conversion_probability" => Ok(Self::ConversionProbability),
            "conversion_value" => Ok(Self::ConversionValue),
            "credit_spread" => Ok(Self::CreditSpread),
            "delta" => Ok(Self::Delta),
            "num_steps" => Ok(Self::NumSteps),
            "p_dd" => Ok(Self::Pdd),
            "p_du" => Ok(Self::Pdu),
            "pu" => Ok(Self::Pu),
            "p_ud" => Ok(Self::Pud),
            "p_uu" => Ok(Self::Puu),
            "u" => Ok(Self::U),
            "vol" => Ok(Self::Vol),
            _ => Err(()),
        }
    }
}

/// Inline diagnostics storage used in [`PricingResult`].
///
/// Holds at most [`Diagnostics::CAPACITY`] entries; inserting a new key into a
/// full store drops it and returns `false`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    entries: [Option<(DiagKey, f64)>; 8],
}

impl Diagnostics {
    pub const CAPACITY: usize = 8;

    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.iter().flatten().count()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries[0].is_none()
    }

    /// Inserts or overwrites a diagnostic value.
    #[inline]
    pub fn insert_key(&mut self, key: DiagKey, value: f64) -> bool {
        for (entry_key, existing) in self.entries.iter_mut().flatten() {
            if *entry_key == key {
                *existing = value;
                return true;
            }
        }

        for entry in &mut self.entries {
            if entry.is_none() {
                *entry = Some((key, value));
                return true;
            }
        }

        false
    }

    #[inline]
    fn iter_entries(&self) -> impl Iterator<Item = &(DiagKey, f64)> {
        self.entries.iter().filter_map(Option::as_ref)
    }

    #[inline]
    pub fn get_key(&self, key: DiagKey) -> Option<f64> {
        self.iter_entries()
            .find_map(|(entry_key, value)| (*entry_key == key).then_some(*value))
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<f64> {
        let key: DiagKey = key.parse().ok()?;
        self.get_key(key)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.iter_entries().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Unified engine result payload.
#[derive(Debug, Clone)]
pub struct PricingResult {
    /// Present value.
    pub price: f64,
    /// Greeks when available from the engine.
    pub greeks: Option<Greeks>,
    /// Engine-specific scalar diagnostics.
    pub diagnostics: Diagnostics,
}

/// Engine and model errors surfaced by the API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PricingError {
    /// Contract, market, or engine input rejected before any computation.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// Lattice parameters that would produce invalid probabilities or a
    /// degenerate tree.
    #[error("numerical instability: {0}")]
    NumericalInstability(String),
}

impl PricingError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    pub(crate) fn unstable(msg: impl Into<String>) -> Self {
        Self::NumericalInstability(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_overwrite_and_capacity() {
        let mut diagnostics = Diagnostics::new();
        assert!(diagnostics.is_empty());

        assert!(diagnostics.insert_key(DiagKey::NumSteps, 100.0));
        assert!(diagnostics.insert_key(DiagKey::NumSteps, 200.0));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics.get("num_steps"), Some(200.0));

        let keys = [
            DiagKey::Vol,
            DiagKey::U,
            DiagKey::Pu,
            DiagKey::Puu,
            DiagKey::Pud,
            DiagKey::Pdu,
            DiagKey::Pdd,
        ];
        for key in keys {
            assert!(diagnostics.insert_key(key, 0.25));
        }
        assert_eq!(diagnostics.len(), Diagnostics::CAPACITY);
        assert!(!diagnostics.insert_key(DiagKey::Delta, 0.5));
        assert_eq!(diagnostics.get_key(DiagKey::Delta), None);
    }

    #[test]
    fn diag_key_names_round_trip() {
        for key in [DiagKey::ConversionProbability, DiagKey::Pud, DiagKey::ControlVariate] {
            assert_eq!(key.as_str().parse::<DiagKey>(), Ok(key));
        }
        assert!("bogus".parse::<DiagKey>().is_err());
    }

    #[test]
    fn errors_render_their_category() {
        let err = PricingError::invalid("steps must be > 0");
        assert_eq!(err.to_string(), "invalid parameter: steps must be > 0");
        let err = PricingError::unstable("p outside [0, 1]");
        assert!(err.to_string().starts_with("numerical instability"));
    }
}
