//! Maps a changed batch and an optional threshold to a notification class.

use spot_core::{Classification, Classified, InstancePrice, JudgedField};

/// Partition `changed` against `threshold` on `judged_by`.
///
/// Values at or above the threshold are "above". With no threshold the batch
/// is an unpartitioned [`Classification::OnceQuery`]. An empty batch
/// classifies as [`Classification::Recover`]; callers skip empty batches.
pub fn classify(
    changed: Vec<InstancePrice>,
    threshold: Option<f64>,
    judged_by: JudgedField,
) -> Classified {
    let Some(limit) = threshold else {
        return Classified {
            classification: Classification::OnceQuery,
            threshold: None,
            judged_by,
            items: changed,
            above: Vec::new(),
            below: Vec::new(),
        };
    };

    let (above, below): (Vec<_>, Vec<_>) = changed
        .iter()
        .cloned()
        .partition(|p| p.judged_value(judged_by) >= limit);

    let classification = match (above.is_empty(), below.is_empty()) {
        (false, true) => Classification::Alarm,
        (true, _) => Classification::Recover,
        (false, false) => Classification::Monitor,
    };

    Classified {
        classification,
        threshold: Some(limit),
        judged_by,
        items: changed,
        above,
        below,
    }
}
