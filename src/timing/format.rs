use crate::timing::estimator::VideoInterval;

/// Renders seconds as `M:SS`, flooring fractional seconds.
pub fn format_timestamp(seconds: f64) -> String {
    let whole = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", whole / 60, whole % 60)
}

/// `M:SS–M:SS`, or a single `M:SS` when both bounds render the same.
pub fn format_interval(interval: &VideoInterval) -> String {
    let start = format_timestamp(interval.start_sec);
    let end = format_timestamp(interval.end_sec);
    if start == end {
        start
    } else {
        format!("{start}–{end}")
    }
}
