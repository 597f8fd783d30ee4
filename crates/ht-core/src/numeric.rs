use crate::{HtError, HtResult};

/// Floating point type used throughout the workspace
pub type Real = f64;

pub fn ensure_finite(v: Real, what: &'static str) -> HtResult<Real> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(HtError::NonFinite { what, value: v })
    }
}

/// Finite and strictly greater than zero.
pub fn ensure_positive(v: Real, what: &'static str) -> HtResult<Real> {
    let v = ensure_finite(v, what)?;
    if v > 0.0 {
        Ok(v)
    } else {
        Err(HtError::NotPositive { what, value: v })
    }
}

/// Piecewise-linear interpolation over ascending `xs`, holding the edge values
/// outside the table.
pub fn interp_clamped(xs: &[Real], ys: &[Real], x: Real) -> Option<Real> {
    if xs.is_empty() || xs.len() != ys.len() {
        return None;
    }
    let last = xs.len() - 1;
    if x <= xs[0] {
        return Some(ys[0]);
    }
    if x >= xs[last] {
        return Some(ys[last]);
    }
    // First index with xs[i] > x; guaranteed in 1..=last here.
    let i = xs.partition_point(|&xi| xi <= x);
    let (x0, x1) = (xs[i - 1], xs[i]);
    let (y0, y1) = (ys[i - 1], ys[i]);
    let w = (x - x0) / (x1 - x0);
    Some(y0 + w * (y1 - y0))
}

/// Time at which `values` first falls from above `level` to `level` or
/// below, interpolated linearly inside the crossing interval. A series that
/// starts at or below `level` only counts once it has been above it.
pub fn first_crossing_below(times: &[Real], values: &[Real], level: Real) -> Option<Real> {
    crossing_below_from(times, values, level, 0).map(|(t, _)| t)
}

/// Downward crossing search starting at sample `from`; also returns the index
/// of the first sample at or below `level`.
fn crossing_below_from(
    times: &[Real],
    values: &[Real],
    level: Real,
    from: usize,
) -> Option<(Real, usize)> {
    let n = times.len().min(values.len());
    (from.max(1)..n)
        .find(|&i| values[i - 1] > level && values[i] <= level)
        .map(|i| {
            let (v0, v1) = (values[i - 1], values[i]);
            let (t0, t1) = (times[i - 1], times[i]);
            let t = if (v0 - v1).abs() < Real::EPSILON {
                t1
            } else {
                t0 + (v0 - level) / (v0 - v1) * (t1 - t0)
            };
            (t, i)
        })
}

/// Elapsed time between the downward crossing of `upper` and the next
/// downward crossing of `lower` (e.g. t8/5 with 800 and 500 °C). `None` when
/// the series never cools through both levels in that order.
pub fn cooling_time(times: &[Real], values: &[Real], upper: Real, lower: Real) -> Option<Real> {
    let (t_upper, i) = crossing_below_from(times, values, upper, 0)?;
    // The upper crossing sample may already sit below `lower`.
    let (t_lower, _) = crossing_below_from(times, values, lower, i)?;
    Some(t_lower - t_upper)
}
