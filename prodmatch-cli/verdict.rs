/// Same product iff `distance < threshold`; a tie counts as different.
#[inline]
pub fn classify(distance: f64, threshold: f64) -> bool {
    distance < threshold
}
