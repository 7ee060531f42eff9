//! Average True Range — Wilder-smoothed true range, used by the `atr` envelope
//! mode and by the coordinator's risk-level classification.

use crate::domain::Bar;

/// True range series: `TR[0] = high[0] - low[0]`, `TR[t] = max(h-l, |h-pc|, |l-pc|)`.
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let mut prev_close: Option<f64> = None;
    bars.iter()
        .map(|b| {
            let tr = b.true_range(prev_close);
            prev_close = Some(b.close);
            tr
        })
        .collect()
}

/// Simple moving average of the trailing `period` true-range values, `NaN`
/// until `period` values are available. This matches §4.C.2's "mean of last
/// N TRs" definition (a plain SMA, not Wilder smoothing, for the envelope's
/// ATR mode).
pub fn atr_sma(bars: &[Bar], period: usize) -> Vec<f64> {
    let tr = true_range(bars);
    let n = tr.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 {
        return out;
    }
    let mut window_sum = 0.0;
    for i in 0..n {
        window_sum += tr[i];
        if i >= period {
            window_sum -= tr[i - period];
        }
        if i + 1 >= period {
            out[i] = window_sum / period as f64;
        }
    }
    out
}
