//! PLdot projection (§4.C.1).
//!
//! For bar index `i >= 2`, PLdot is the mean of the typical prices of bars
//! `i-2, i-1, i`, projected forward `displacement` bars. The first two bars
//! never produce output — there is no lookahead, only lookback.

use crate::domain::{Bar, PldotPoint};

/// Compute the PLdot series for a bar sequence. Output has the same length
/// as `bars`; indices `0` and `1` are `None` (insufficient history).
pub fn compute(bars: &[Bar], displacement: u32) -> Vec<Option<PldotPoint>> {
    let n = bars.len();
    let mut out = vec![None; n];
    if n < 3 {
        return out;
    }
    for i in 2..n {
        let value = (bars[i - 2].typical_price() + bars[i - 1].typical_price() + bars[i].typical_price()) / 3.0;
        let period = bars[i].interval.duration();
        let projection_timestamp = bars[i].timestamp + period * displacement as i32;
        out[i] = Some(PldotPoint {
            symbol: bars[i].symbol.clone(),
            interval: bars[i].interval,
            source_timestamp: bars[i].timestamp,
            projection_timestamp,
            value,
            is_projected: projection_timestamp > bars[i].timestamp,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::test_support::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn pldot_three_bar_scenario_from_spec() {
        // (h,l,c): (102,98,100), (103,99,101), (104,100,102)
        let bars = make_bars(&[
            (100.0, 102.0, 98.0, 100.0),
            (101.0, 103.0, 99.0, 101.0),
            (102.0, 104.0, 100.0, 102.0),
        ]);
        let series = compute(&bars, 1);
        assert!(series[0].is_none());
        assert!(series[1].is_none());
        let p = series[2].as_ref().unwrap();
        assert_approx(p.value, 101.0, DEFAULT_EPSILON);
        assert!(p.is_projected);
        assert_eq!(p.projection_timestamp, bars[2].timestamp + chrono::Duration::minutes(5));
    }

    #[test]
    fn short_series_yields_no_points() {
        let bars = make_bars(&[(100.0, 102.0, 98.0, 100.0), (101.0, 103.0, 99.0, 101.0)]);
        let series = compute(&bars, 1);
        assert!(series.iter().all(|p| p.is_none()));
    }

    #[test]
    fn larger_displacement_multiplies_time_offset() {
        let bars = make_bars(&[
            (100.0, 102.0, 98.0, 100.0),
            (101.0, 103.0, 99.0, 101.0),
            (102.0, 104.0, 100.0, 102.0),
        ]);
        let series = compute(&bars, 3);
        let p = series[2].as_ref().unwrap();
        assert_eq!(p.projection_timestamp, bars[2].timestamp + chrono::Duration::minutes(15));
    }
}
