//! Statistics over a full metric series.

use crate::error::MergeError;
use crate::models::Statistics;

/// Compute count, min, max and mean of `durations`.
///
/// Always called on the complete series, never combined from earlier stats.
pub fn compute(name: &str, durations: &[f64]) -> Result<Statistics, MergeError> {
    let Some(&first) = durations.first() else {
        return Err(MergeError::EmptySeries {
            name: name.to_string(),
        });
    };

    let (min, max, sum) = durations
        .iter()
        .skip(1)
        .fold((first, first, first), |(min, max, sum), &d| {
            (min.min(d), max.max(d), sum + d)
        });
    let count = durations.len();

    Ok(Statistics {
        count,
        min,
        max,
        avg: sum / count as f64,
    })
}
