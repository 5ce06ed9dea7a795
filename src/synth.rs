//! Seeded synthetic OHLCV market for the demo pipeline.
//!
//! One factor drives everything cross-sectionally: each timestamp draws a
//! market-wide return shared by every entity, plus per-entity noise. That
//! gives the factor pipeline realistic co-movement to find without any
//! external data.

use panel::{PanelResult, PanelTable, Record};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, LogNormal, Normal};

/// Daily-ish volatility of the shared market return.
const MARKET_SIGMA: f64 = 0.01;
/// Volatility of each entity's idiosyncratic return.
const IDIO_SIGMA: f64 = 0.02;
/// Volatility of the overnight gap between close and next open.
const GAP_SIGMA: f64 = 0.004;
/// Scale of the intra-bar extension beyond the open/close span.
const RANGE_SIGMA: f64 = 0.005;
/// Log-space location and spread of traded volume.
const VOLUME_MU: f64 = 11.5;
const VOLUME_SIGMA: f64 = 0.6;

/// Build a dense `(timestamp, entity)` panel of synthetic OHLCV columns:
/// `close`, `open`, `high`, `low`, `volume`, `amount`.
///
/// Deterministic for a given `(entities, steps, seed)` triple. Prices stay
/// positive; per-step returns are clamped to ±20%.
pub fn market(entities: u32, steps: i64, seed: u64) -> PanelResult<PanelTable> {
    let mut rng = StdRng::seed_from_u64(seed);
    // constant parameters, so construction cannot fail
    let market_ret = Normal::new(0.0, MARKET_SIGMA).unwrap();
    let idio_ret = Normal::new(0.0, IDIO_SIGMA).unwrap();
    let gap = Normal::new(0.0, GAP_SIGMA).unwrap();
    let range = Normal::new(0.0, RANGE_SIGMA).unwrap();
    let volume_dist = LogNormal::new(VOLUME_MU, VOLUME_SIGMA).unwrap();

    let mut closes: Vec<f64> = (0..entities).map(|_| rng.gen_range(20.0..80.0)).collect();
    let mut records = Vec::with_capacity(entities as usize * steps.max(0) as usize);
    for t in 1..=steps {
        let shared = market_ret.sample(&mut rng);
        for (e, prev) in closes.iter_mut().enumerate() {
            let ret = (shared + idio_ret.sample(&mut rng)).clamp(-0.2, 0.2);
            let close = *prev * (1.0 + ret);
            let open = *prev * (1.0 + gap.sample(&mut rng));
            let stretch = range.sample(&mut rng).abs();
            let high = open.max(close) * (1.0 + stretch);
            let low = open.min(close) * (1.0 - stretch);
            let volume = volume_dist.sample(&mut rng);
            let typical = (open + high + low + close) / 4.0;
            records.push(
                Record::new(t, e as u32 + 1)
                    .field("close", close)
                    .field("open", open)
                    .field("high", high)
                    .field("low", low)
                    .field("volume", volume)
                    .field("amount", volume * typical),
            );
            *prev = close;
        }
    }
    PanelTable::from_records(records)
}
