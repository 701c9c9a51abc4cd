use crate::pipeline::{Landmark, Offset};

/// Offset of the captured landmark from the reference landmark.
///
/// Both landmarks live in normalized space, so photos of different
/// resolutions compare directly.
pub fn compute_offset(captured: &Landmark, reference: &Landmark) -> Offset {
    Offset::new(captured.x - reference.x, captured.y - reference.y)
}
