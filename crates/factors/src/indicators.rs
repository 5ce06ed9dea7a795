//! EMA-family series helpers: exponentially weighted means, the DIF/DEA
//! pair behind MACD, and RSI.
//!
//! All helpers run over one entity's contiguous history (the grouped view's
//! `apply` feeds them) and return a same-length series. Warm-up cells and
//! cells whose inputs are missing come back as NaN.

use panel::window::RollingWindow;

/// Standard MACD spans.
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;

/// Exponentially weighted moving average with position-decayed weights.
///
/// The value at step `t` is the weighted mean of all finite observations so
/// far, observation `i` weighted `(1 - a)^(t - i)` with `a = 2/(span + 1)`.
/// Missing observations contribute no weight but still age the others.
/// Output is NaN until `min_periods` finite observations have been seen.
///
/// # Panics
/// Panics if `span` is zero.
pub fn ewma(series: &[f64], span: usize, min_periods: usize) -> Vec<f64> {
    assert!(span > 0, "ewma span must be > 0");
    let decay = 1.0 - 2.0 / (span as f64 + 1.0);
    let mut num = 0.0;
    let mut den = 0.0;
    let mut seen = 0usize;
    series
        .iter()
        .map(|&x| {
            num *= decay;
            den *= decay;
            if x.is_finite() {
                num += x;
                den += 1.0;
                seen += 1;
            }
            if seen >= min_periods && den > 0.0 {
                num / den
            } else {
                f64::NAN
            }
        })
        .collect()
}

/// DIF line: fast EMA minus slow EMA of the same series.
///
/// Each EMA warms up over `span - 1` observations, so DIF is NaN until the
/// slow side is defined. On a constant series DIF is exactly 0 once defined.
///
/// # Panics
/// Panics if `fast >= slow` or either span is zero.
pub fn dif(series: &[f64], fast: usize, slow: usize) -> Vec<f64> {
    assert!(fast < slow, "DIF fast span must be < slow span");
    let fast_ema = ewma(series, fast, fast - 1);
    let slow_ema = ewma(series, slow, slow - 1);
    fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| f - s)
        .collect()
}

/// DEA line: signal EMA over a DIF series (which starts with warm-up NaNs).
pub fn dea(dif_series: &[f64], signal: usize) -> Vec<f64> {
    ewma(dif_series, signal, signal - 1)
}

/// RSI over simple trailing means of gains and losses.
///
/// One-step differences are split into gains and losses, each averaged over
/// a strict `period`-window. `RSI = 100 - 100/(1 + gain/loss)`. A window
/// with no losses but some gain pins at 100; a completely flat window has
/// no relative strength and stays NaN, as does any window touching a
/// missing observation.
///
/// # Panics
/// Panics if `period` is zero.
pub fn rsi(series: &[f64], period: usize) -> Vec<f64> {
    assert!(period > 0, "RSI period must be > 0");
    let mut out = vec![f64::NAN; series.len()];
    let mut gains = RollingWindow::new(period);
    let mut losses = RollingWindow::new(period);
    for i in 0..series.len() {
        let delta = if i == 0 {
            f64::NAN
        } else {
            series[i] - series[i - 1]
        };
        if delta.is_finite() {
            gains.push(delta.max(0.0));
            losses.push((-delta).max(0.0));
        } else {
            gains.push(f64::NAN);
            losses.push(f64::NAN);
        }
        if let (Some(avg_gain), Some(avg_loss)) = (gains.mean(), losses.mean()) {
            out[i] = if avg_loss > 0.0 {
                100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
            } else if avg_gain > 0.0 {
                100.0
            } else {
                f64::NAN
            };
        }
    }
    out
}
