//! Batch valuation of many instruments against one market snapshot.
//!
//! With the `parallel` feature the batch is spread over the Rayon pool; each
//! valuation owns its grids, so no state is shared between workers. Engines
//! holding a [`PricingArena`](crate::math::PricingArena) serialize on its mutex.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::core::{Instrument, PricingEngine, PricingError, PricingResult};
use crate::market::Market;

/// Prices every instrument with `engine`, preserving input order.
///
/// A failing instrument yields its own `Err` without aborting the batch.
///
/// # Examples
/// ```rust
/// use openlattice::engines::price_batch;
/// use openlattice::engines::tree::BinomialTreeEngine;
/// use openlattice::instruments::VanillaOption;
/// use openlattice::market::Market;
///
/// let market = Market::builder().spot(100.0).rate(0.05).flat_vol(0.2).build().unwrap();
/// let book = [
///     VanillaOption::american_put(90.0, 1.0),
///     VanillaOption::american_put(100.0, 1.0),
///     VanillaOption::american_put(-1.0, 1.0),
/// ];
/// let results = price_batch(&BinomialTreeEngine::new(200), &book, &market);
/// assert!(results[0].as_ref().unwrap().price < results[1].as_ref().unwrap().price);
/// assert!(results[2].is_err());
/// ```
pub fn price_batch<I, E>(
    engine: &E,
    instruments: &[I],
    market: &Market,
) -> Vec<Result<PricingResult, PricingError>>
where
    I: Instrument + Sync,
    E: PricingEngine<I> + Sync,
{
    tracing::debug!(count = instruments.len(), "pricing instrument batch");

    #[cfg(feature = "parallel")]
    {
        instruments
            .par_iter()
            .map(|instrument| engine.price(instrument, market))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        instruments
            .iter()
            .map(|instrument| engine.price(instrument, market))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ExerciseStyle, OptionType};
    use crate::engines::tree::TwoAssetTreeEngine;
    use crate::instruments::SpreadOption;

    #[test]
    fn batch_matches_one_by_one() {
        let base = SpreadOption {
            s1: 100.0,
            s2: 95.0,
            k: 2.0,
            vol1: 0.25,
            vol2: 0.2,
            rho: 0.3,
            q1: 0.01,
            q2: 0.0,
            r: 0.03,
            t: 1.0,
            option_type: OptionType::Call,
            exercise: ExerciseStyle::American,
        };
        let book: Vec<_> = [1.0, 2.0, 5.0, 10.0]
            .into_iter()
            .map(|k| SpreadOption { k, ..base })
            .collect();
        let market = Market::builder().spot(1.0).flat_vol(0.2).build().unwrap();
        let engine = TwoAssetTreeEngine::new(30);

        let batch = price_batch(&engine, &book, &market);
        assert_eq!(batch.len(), book.len());
        for (result, option) in batch.iter().zip(&book) {
            let single = engine.price(option, &market).unwrap().price;
            assert_eq!(result.as_ref().unwrap().price, single);
        }
        assert!(batch.windows(2).all(|w| {
            w[0].as_ref().unwrap().price >= w[1].as_ref().unwrap().price
        }));
    }
}
