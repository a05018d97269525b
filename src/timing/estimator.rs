use serde::{Deserialize, Serialize};

/// How much source video one unit of backend processing covers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProcessingMode {
    /// A trailing clip of `clip_seconds` ending at the capture point.
    Windowed { clip_seconds: f64 },
    /// A single sampled frame.
    Point,
    /// Frames pushed every `interval_seconds` with no latency metadata coming back.
    FixedCadence { interval_seconds: f64 },
}

impl ProcessingMode {
    /// Length of source video a single in-flight unit can span.
    pub fn window_seconds(&self) -> f64 {
        match *self {
            ProcessingMode::Windowed { clip_seconds } => sanitize(clip_seconds),
            ProcessingMode::Point => 0.0,
            ProcessingMode::FixedCadence { interval_seconds } => sanitize(interval_seconds),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoInterval {
    pub start_sec: f64,
    pub end_sec: f64,
}

impl VideoInterval {
    pub fn is_point(&self) -> bool {
        self.start_sec == self.end_sec
    }
}

/// Source-video second that was being captured when the backend began work on
/// the unit that produced a result observed `elapsed_ms` into the session.
pub fn capture_point_sec(elapsed_ms: f64, latency_ms: Option<f64>) -> f64 {
    let latency_ms = latency_ms.map(sanitize).unwrap_or(0.0);
    ((sanitize(elapsed_ms) - latency_ms) / 1_000.0).max(0.0)
}

/// Estimates the slice of source video a result describes.
///
/// Fixed-cadence sessions ignore `latency_ms` entirely: that protocol never
/// reports one, so the raw elapsed time is the capture point.
pub fn estimate_interval(
    elapsed_ms: f64,
    latency_ms: Option<f64>,
    mode: ProcessingMode,
    video_duration_sec: Option<f64>,
) -> VideoInterval {
    let interval = match mode {
        ProcessingMode::Windowed { clip_seconds } => {
            let capture = capture_point_sec(elapsed_ms, latency_ms);
            VideoInterval {
                start_sec: (capture - sanitize(clip_seconds)).max(0.0),
                end_sec: capture,
            }
        }
        ProcessingMode::Point => {
            let capture = capture_point_sec(elapsed_ms, latency_ms);
            VideoInterval {
                start_sec: capture,
                end_sec: capture,
            }
        }
        ProcessingMode::FixedCadence { interval_seconds } => {
            let capture = capture_point_sec(elapsed_ms, None);
            VideoInterval {
                start_sec: (capture - sanitize(interval_seconds)).max(0.0),
                end_sec: capture,
            }
        }
    };

    match video_duration_sec {
        Some(duration) => clamp_to_duration(interval, duration),
        None => interval,
    }
}

fn clamp_to_duration(interval: VideoInterval, duration_sec: f64) -> VideoInterval {
    let duration = sanitize(duration_sec);
    VideoInterval {
        start_sec: interval.start_sec.clamp(0.0, duration),
        end_sec: interval.end_sec.clamp(0.0, duration),
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}
