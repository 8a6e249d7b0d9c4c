//! Market data container and volatility source abstractions.

use crate::core::{PricingError, ensure_finite};
use crate::rates::ZeroCurve;

/// Clone support for boxed volatility surface trait objects.
pub trait VolSurfaceClone {
    /// Clones the concrete surface behind the trait object.
    fn clone_box(&self) -> Box<dyn VolSurface>;
}

impl<T> VolSurfaceClone for T
where
    T: 'static + VolSurface + Clone,
{
    fn clone_box(&self) -> Box<dyn VolSurface> {
        Box::new(self.clone())
    }
}

/// Volatility surface abstraction used by pricing engines.
pub trait VolSurface: std::fmt::Debug + Send + Sync + VolSurfaceClone {
    /// Returns Black volatility for a given strike and expiry.
    ///
    /// `strike` is in underlying price units, `expiry` is a year fraction.
    /// Engines reject negative or non-finite outputs.
    fn vol(&self, strike: f64, expiry: f64) -> f64;
}

impl Clone for Box<dyn VolSurface> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Volatility source for a market snapshot.
#[derive(Debug, Clone)]
pub enum VolSource {
    /// Constant volatility.
    Flat(f64),
    /// Dynamic surface lookup.
    Surface(Box<dyn VolSurface>),
}

impl VolSource {
    /// Returns a volatility value for the requested strike and expiry.
    ///
    /// # Examples
    /// ```
    /// use openlattice::market::VolSource;
    ///
    /// let vol = VolSource::Flat(0.25);
    /// assert_eq!(vol.vol(100.0, 1.0), 0.25);
    /// ```
    pub fn vol(&self, strike: f64, expiry: f64) -> f64 {
        match self {
            Self::Flat(v) => *v,
            Self::Surface(surface) => surface.vol(strike, expiry),
        }
    }
}

/// Market snapshot used by the single-asset and convertible engines.
///
/// The two-asset engine reads both underlyings from its instrument and ignores
/// the market argument.
#[derive(Debug, Clone)]
pub struct Market {
    /// Spot price.
    pub spot: f64,
    /// Continuously compounded flat risk-free rate.
    pub rate: f64,
    /// Continuously compounded dividend yield.
    pub dividend_yield: f64,
    /// Volatility source.
    pub vol: VolSource,
    /// Optional zero curve; engines fall back to `rate` when absent.
    pub zero_curve: Option<ZeroCurve>,
}

impl Market {
    /// Starts a market builder.
    ///
    /// # Examples
    /// ```
    /// use openlattice::market::Market;
    ///
    /// let market = Market::builder()
    ///     .spot(100.0)
    ///     .rate(0.03)
    ///     .dividend_yield(0.01)
    ///     .flat_vol(0.20)
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(market.spot, 100.0);
    /// ```
    #[inline]
    pub fn builder() -> MarketBuilder {
        MarketBuilder::default()
    }

    /// Checks the scalar inputs and the attached zero curve.
    ///
    /// Engines call this before building a lattice, so a `Market` assembled
    /// as a struct literal gets the same checks as [`MarketBuilder::build`].
    ///
    /// # Errors
    /// Returns [`PricingError::InvalidParameter`] when spot is non-positive,
    /// the dividend yield or a flat volatility is negative, any scalar is
    /// non-finite, or the zero curve is malformed.
    pub fn validate(&self) -> Result<(), PricingError> {
        ensure_finite("market spot", self.spot)?;
        if self.spot <= 0.0 {
            return Err(PricingError::invalid("market spot must be > 0"));
        }
        ensure_finite("market rate", self.rate)?;
        ensure_finite("market dividend_yield", self.dividend_yield)?;
        if self.dividend_yield < 0.0 {
            return Err(PricingError::invalid("market dividend_yield must be >= 0"));
        }
        if let VolSource::Flat(vol) = self.vol {
            ensure_finite("market flat_vol", vol)?;
            if vol < 0.0 {
                return Err(PricingError::invalid("market flat_vol must be >= 0"));
            }
        }
        if let Some(curve) = &self.zero_curve {
            curve.validate()?;
        }
        Ok(())
    }

    /// Resolves volatility for a strike/expiry pair and checks it is usable.
    ///
    /// A negative or non-finite lookup is an invalid parameter. Zero is passed
    /// through: the lattice engines report it as a degenerate tree.
    pub fn vol_for(&self, strike: f64, expiry: f64) -> Result<f64, PricingError> {
        let vol = self.vol.vol(strike, expiry);
        if !vol.is_finite() || vol < 0.0 {
            return Err(PricingError::invalid(format!(
                "volatility must be finite and >= 0, got {vol}"
            )));
        }
        Ok(vol)
    }

    /// Continuously compounded rate for each lattice step `0..=steps`.
    ///
    /// Uses the zero curve when present, otherwise repeats the flat rate.
    pub fn step_rates(&self, steps: usize, dt: f64) -> Result<Vec<f64>, PricingError> {
        match &self.zero_curve {
            Some(curve) => curve.step_rates(steps, dt),
            None => Ok(vec![self.rate; steps + 1]),
        }
    }
}

/// Builder for [`Market`].
#[derive(Debug, Clone, Default)]
pub struct MarketBuilder {
    spot: Option<f64>,
    rate: Option<f64>,
    dividend_yield: Option<f64>,
    flat_vol: Option<f64>,
    surface: Option<Box<dyn VolSurface>>,
    zero_curve: Option<ZeroCurve>,
}

impl MarketBuilder {
    /// Sets the spot price.
    #[inline]
    pub fn spot(mut self, spot: f64) -> Self {
        self.spot = Some(spot);
        self
    }

    /// Sets the flat risk-free rate.
    #[inline]
    pub fn rate(mut self, rate: f64) -> Self {
        self.rate = Some(rate);
        self
    }

    /// Sets the continuous dividend yield.
    #[inline]
    pub fn dividend_yield(mut self, dividend_yield: f64) -> Self {
        self.dividend_yield = Some(dividend_yield);
        self
    }

    /// Sets a flat volatility source.
    #[inline]
    pub fn flat_vol(mut self, vol: f64) -> Self {
        self.flat_vol = Some(vol);
        self.surface = None;
        self
    }

    /// Sets a surface volatility source.
    ///
    /// This overrides any previously configured flat volatility.
    ///
    /// # Examples
    /// ```
    /// use openlattice::market::{Market, VolSurface};
    ///
    /// #[derive(Debug, Clone)]
    /// struct FlatSurface(f64);
    ///
    /// impl VolSurface for FlatSurface {
    ///     fn vol(&self, _strike: f64, _expiry: f64) -> f64 {
    ///         self.0
    ///     }
    /// }
    ///
    /// let market = Market::builder()
    ///     .spot(100.0)
    ///     .rate(0.02)
    ///     .vol_surface(Box::new(FlatSurface(0.18)))
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(market.vol_for(90.0, 2.0).unwrap(), 0.18);
    /// ```
    pub fn vol_surface(mut self, surface: Box<dyn VolSurface>) -> Self {
        self.surface = Some(surface);
        self.flat_vol = None;
        self
    }

    /// Attaches a zero curve used for per-step discounting.
    pub fn zero_curve(mut self, curve: ZeroCurve) -> Self {
        self.zero_curve = Some(curve);
        self
    }

    /// Validates and builds a [`Market`].
    ///
    /// # Errors
    /// Returns [`PricingError::InvalidParameter`] when spot is missing or
    /// non-positive, when the dividend yield or flat volatility is negative,
    /// or when any scalar is non-finite.
    pub fn build(self) -> Result<Market, PricingError> {
        let spot = self
            .spot
            .ok_or_else(|| PricingError::invalid("market spot is required"))?;

        let vol = if let Some(surface) = self.surface {
            VolSource::Surface(surface)
        } else {
            VolSource::Flat(self.flat_vol.ok_or_else(|| {
                PricingError::invalid("either market flat_vol or vol_surface is required")
            })?)
        };

        let market = Market {
            spot,
            rate: self.rate.unwrap_or(0.0),
            dividend_yield: self.dividend_yield.unwrap_or(0.0),
            vol,
            zero_curve: self.zero_curve,
        };
        market.validate()?;
        Ok(market)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_rejects_bad_inputs() {
        assert!(Market::builder().flat_vol(0.2).build().is_err());
        assert!(Market::builder().spot(-1.0).flat_vol(0.2).build().is_err());
        assert!(Market::builder().spot(100.0).build().is_err());
        assert!(Market::builder().spot(100.0).flat_vol(-0.1).build().is_err());
        assert!(
            Market::builder()
                .spot(100.0)
                .dividend_yield(-0.01)
                .flat_vol(0.2)
                .build()
                .is_err()
        );
        assert!(
            Market::builder()
                .spot(f64::NAN)
                .flat_vol(0.2)
                .build()
                .is_err()
        );
    }

    #[test]
    fn validate_catches_struct_literal_markets() {
        let good = Market {
            spot: 100.0,
            rate: 0.05,
            dividend_yield: 0.0,
            vol: VolSource::Flat(0.2),
            zero_curve: None,
        };
        assert!(good.validate().is_ok());

        for bad in [
            Market { spot: f64::NAN, ..good.clone() },
            Market { spot: 0.0, ..good.clone() },
            Market { spot: -50.0, ..good.clone() },
            Market { rate: f64::INFINITY, ..good.clone() },
            Market { dividend_yield: -0.5, ..good.clone() },
            Market { vol: VolSource::Flat(f64::NAN), ..good.clone() },
            Market {
                zero_curve: Some(ZeroCurve::Pillars(vec![(2.0, 0.04), (1.0, 0.03)])),
                ..good.clone()
            },
        ] {
            assert!(
                matches!(bad.validate(), Err(PricingError::InvalidParameter(_))),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn zero_flat_vol_is_accepted_by_the_builder() {
        let market = Market::builder().spot(100.0).flat_vol(0.0).build().unwrap();
        assert_eq!(market.vol_for(100.0, 1.0), Ok(0.0));
    }

    #[test]
    fn step_rates_fall_back_to_flat_rate() {
        let market = Market::builder()
            .spot(100.0)
            .rate(0.04)
            .flat_vol(0.2)
            .build()
            .unwrap();
        assert_eq!(market.step_rates(3, 0.25).unwrap(), vec![0.04; 4]);
    }

    #[test]
    fn step_rates_use_attached_curve() {
        let market = Market::builder()
            .spot(100.0)
            .rate(0.04)
            .flat_vol(0.2)
            .zero_curve(ZeroCurve::per_step(vec![0.01, 0.02, 0.03]))
            .build()
            .unwrap();
        assert_eq!(market.step_rates(2, 0.5).unwrap(), vec![0.01, 0.02, 0.03]);
        assert!(market.step_rates(3, 0.5).is_err());
    }
}
