/// Linear interpolation between `a` and `b`.
pub(crate) fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Coordinates of `n` pixel centers spread evenly across `[start, end]`.
pub(crate) fn pixel_centers(start: f64, end: f64, n: u32) -> impl Iterator<Item = f64> {
    let nf = f64::from(n.max(1));
    (0..n).map(move |i| lerp(start, end, (f64::from(i) + 0.5) / nf))
}

/// Pick the value at fraction `q` of an ascending-sorted slice (index `floor(len * q)`).
///
/// Returns `None` for an empty slice.
pub(crate) fn percentile_sorted<T: Copy>(sorted: &[T], q: f64) -> Option<T> {
    if sorted.is_empty() {
        return None;
    }
    let idx = ((sorted.len() as f64) * q.clamp(0.0, 1.0)).floor() as usize;
    Some(sorted[idx.min(sorted.len() - 1)])
}
