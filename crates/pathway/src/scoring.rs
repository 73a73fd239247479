//! Progression scoring for level sequences.

/// Score how steadily a sequence of skill levels climbs.
///
/// Returns `1 - (sum of drops) / (sum of absolute steps)`, so a
/// non-decreasing sequence scores 1.0 and a strictly falling one 0.0.
/// Sequences without movement score 1.0.
pub fn score_progression(levels: &[u32]) -> f64 {
    let mut drops = 0u64;
    let mut movement = 0u64;
    for pair in levels.windows(2) {
        let (from, to) = (pair[0] as i64, pair[1] as i64);
        let step = (to - from).unsigned_abs();
        movement += step;
        if to < from {
            drops += step;
        }
    }

    if movement == 0 {
        return 1.0;
    }
    1.0 - drops as f64 / movement as f64
}
