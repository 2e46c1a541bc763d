//! Exponentially weighted statistics.
//!
//! Convention (unadjusted recursion): `alpha = 2 / (span + 1)`,
//! `y[first] = x[first]`, `y[t] = alpha * x[t] + (1 - alpha) * y[t-1]`.
//! There is no bias correction for short history: the first defined value
//! is exactly the first valid input sample.
//!
//! NaN inputs before the first valid sample produce NaN. A NaN input after
//! that carries the previous output forward unchanged.

/// Smoothing factor for a span. Spans below 1 are treated as 1.
pub fn alpha(span: usize) -> f64 {
    2.0 / (span.max(1) as f64 + 1.0)
}

/// Exponentially weighted moving average over `values`.
pub fn ewma(values: &[f64], span: usize) -> Vec<f64> {
    let a = alpha(span);
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;

    for &x in values {
        let next = match (prev, x.is_nan()) {
            (None, true) => None,
            (None, false) => Some(x),
            (Some(p), true) => Some(p),
            (Some(p), false) => Some(a * x + (1.0 - a) * p),
        };
        out.push(next.unwrap_or(f64::NAN));
        prev = next;
    }

    out
}

/// Exponentially weighted standard deviation.
///
/// Recursive form: on each valid sample `delta = x - mean`,
/// `mean += alpha * delta`, `var = (1 - alpha) * (var + alpha * delta^2)`;
/// the first valid sample seeds `mean = x, var = 0`. Output is `sqrt(var)`
/// once `min_periods` valid samples have been seen, NaN before.
pub fn ewm_std(values: &[f64], span: usize, min_periods: usize) -> Vec<f64> {
    let a = alpha(span);
    let mut out = Vec::with_capacity(values.len());
    let mut mean = 0.0;
    let mut var = 0.0;
    let mut count = 0usize;

    for &x in values {
        if !x.is_nan() {
            if count == 0 {
                mean = x;
                var = 0.0;
            } else {
                let delta = x - mean;
                mean += a * delta;
                var = (1.0 - a) * (var + a * delta * delta);
            }
            count += 1;
        }
        out.push(if count >= min_periods.max(1) {
            var.sqrt()
        } else {
            f64::NAN
        });
    }

    out
}
