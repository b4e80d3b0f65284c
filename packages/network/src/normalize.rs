//! Min-max normalization.

/// Value given to a component that cannot be normalized (no spread, or no
/// defined values).
pub const NEUTRAL_SCORE: f64 = 0.5;

/// Rescales the defined values to `[0, 1]`.
///
/// Undefined or non-finite inputs, and every input when the defined values
/// have zero range, map to [`NEUTRAL_SCORE`].
#[must_use]
pub fn min_max(values: &[Option<f64>]) -> Vec<f64> {
    let defined = values.iter().flatten().copied().filter(|v| v.is_finite());
    let Some((min, max)) = defined.fold(None, |acc: Option<(f64, f64)>, v| {
        Some(acc.map_or((v, v), |(lo, hi)| (lo.min(v), hi.max(v))))
    }) else {
        return vec![NEUTRAL_SCORE; values.len()];
    };

    let range = max - min;
    values
        .iter()
        .map(|value| match value {
            Some(v) if v.is_finite() && range > 0.0 => (v - min) / range,
            _ => NEUTRAL_SCORE,
        })
        .collect()
}
