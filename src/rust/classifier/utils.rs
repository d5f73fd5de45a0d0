/// Index and value of the highest score. Ties resolve to the lowest index and
/// NaN never wins; returns `None` for an empty slice or an all-NaN slice.
pub(crate) fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
    scores
        .iter()
        .enumerate()
        .fold(None, |best, (i, &val)| match best {
            _ if val.is_nan() => best,
            Some((_, max_val)) if val <= max_val => best,
            _ => Some((i, val)),
        })
}
