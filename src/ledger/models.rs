use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::timing::VideoInterval;

/// Unit of media a backend processed to produce one result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaUnit {
    Clip,
    Frame,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceResult {
    pub ok: bool,
    pub text: Option<String>,
    pub error: Option<String>,
    pub unit: MediaUnit,
    pub inference_latency_ms: Option<f64>,
    pub total_latency_ms: Option<f64>,
    pub finish_reason: Option<String>,
}

impl InferenceResult {
    pub fn success(unit: MediaUnit, text: impl Into<String>) -> Self {
        Self {
            ok: true,
            text: Some(text.into()),
            error: None,
            unit,
            inference_latency_ms: None,
            total_latency_ms: None,
            finish_reason: None,
        }
    }

    pub fn failure(unit: MediaUnit, error: impl Into<String>) -> Self {
        Self {
            ok: false,
            text: None,
            error: Some(error.into()),
            unit,
            inference_latency_ms: None,
            total_latency_ms: None,
            finish_reason: None,
        }
    }

    pub fn with_total_latency_ms(mut self, latency_ms: f64) -> Self {
        self.total_latency_ms = Some(latency_ms);
        self
    }

    /// Text for display: the payload on success, the error otherwise.
    pub fn display_text(&self) -> &str {
        if self.ok {
            self.text.as_deref().unwrap_or_default()
        } else {
            self.error.as_deref().unwrap_or("unknown error")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimestampedResult {
    pub session_id: Uuid,
    pub result: InferenceResult,
    pub video_start_sec: f64,
    pub video_end_sec: f64,
    pub received_at_rfc3339: String,
}

impl TimestampedResult {
    pub fn new(
        session_id: Uuid,
        result: InferenceResult,
        interval: VideoInterval,
        received_at_rfc3339: String,
    ) -> Self {
        Self {
            session_id,
            result,
            video_start_sec: interval.start_sec,
            video_end_sec: interval.end_sec,
            received_at_rfc3339,
        }
    }

    pub fn interval(&self) -> VideoInterval {
        VideoInterval {
            start_sec: self.video_start_sec,
            end_sec: self.video_end_sec,
        }
    }
}
