//! Window statistics over raw value slices. NaN values are skipped and do
//! not count towards `min_periods`.

/// Quantile of the finite values in the trailing `window` observations,
/// linearly interpolated between order statistics.
pub fn rolling_quantile(values: &[f64], window: usize, min_periods: usize, q: f64) -> Vec<f64> {
    let window = window.max(1);
    let mut out = Vec::with_capacity(values.len());
    let mut buf: Vec<f64> = Vec::with_capacity(window);

    for i in 0..values.len() {
        let start = (i + 1).saturating_sub(window);
        buf.clear();
        buf.extend(values[start..=i].iter().copied().filter(|v| !v.is_nan()));
        if buf.len() < min_periods.max(1) {
            out.push(f64::NAN);
            continue;
        }
        buf.sort_by(f64::total_cmp);
        out.push(quantile_sorted(&buf, q));
    }

    out
}

/// Linear-interpolation quantile of an ascending, non-empty slice.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Mean of all finite values seen so far.
pub fn expanding_mean(values: &[f64], min_periods: usize) -> Vec<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    values
        .iter()
        .map(|&v| {
            if !v.is_nan() {
                sum += v;
                count += 1;
            }
            if count >= min_periods.max(1) {
                sum / count as f64
            } else {
                f64::NAN
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantile_interpolates() {
        let s = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(quantile_sorted(&s, 0.0), 1.0);
        assert_eq!(quantile_sorted(&s, 0.5), 3.0);
        assert_eq!(quantile_sorted(&s, 1.0), 5.0);
        assert!((quantile_sorted(&s, 0.05) - 1.2).abs() < 1e-12);
    }

    #[test]
    fn rolling_quantile_respects_window_and_min_periods() {
        let v = [5.0, 1.0, 3.0, f64::NAN, 2.0];
        let out = rolling_quantile(&v, 3, 2, 0.0);
        assert!(out[0].is_nan());
        assert_eq!(out[1], 1.0);
        assert_eq!(out[2], 1.0);
        // window [1, 3, NaN] → min of finite
        assert_eq!(out[3], 1.0);
        // window [3, NaN, 2]
        assert_eq!(out[4], 2.0);
    }

    #[test]
    fn expanding_mean_skips_nan() {
        let out = expanding_mean(&[f64::NAN, 2.0, 4.0, f64::NAN], 2);
        assert!(out[0].is_nan());
        assert!(out[1].is_nan());
        assert_eq!(out[2], 3.0);
        assert_eq!(out[3], 3.0);
    }
}
