use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::timing::ProcessingMode;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub session: SessionConfig,
    pub vision: VisionConfig,
    pub live: LiveConfig,
    pub media: MediaConfig,
    pub output: OutputConfig,
    pub diagnostics: DiagnosticsConfig,
}

impl AppConfig {
    /// Processing mode a session on `backend` will run with.
    pub fn processing_mode_for(&self, backend: BackendKind) -> ProcessingMode {
        match backend {
            BackendKind::Vision => self.vision.processing_mode(),
            BackendKind::Live => self.live.processing_mode(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// HTTP inference service taking clips or frames.
    Vision,
    /// WebSocket service fed still frames at a fixed cadence.
    Live,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub backend: BackendKind,
    pub auto_stop_grace_ms: u64,
    pub start_immediately: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Vision,
            auto_stop_grace_ms: 3_000,
            start_immediately: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum VisionMode {
    Windowed,
    Point,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub prompt: String,
    pub mode: VisionMode,
    pub clip_length_seconds: f64,
    pub delay_seconds: f64,
    pub fps: u32,
    pub sampling_ratio: f64,
    pub frame_interval_seconds: f64,
    /// ffmpeg `-q:v` for point-mode stills.
    pub jpeg_quality: u8,
    pub request_timeout_seconds: u64,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8000/v1".to_owned(),
            api_key: None,
            model: "default".to_owned(),
            prompt: "Describe what is happening in the video.".to_owned(),
            mode: VisionMode::Windowed,
            clip_length_seconds: 1.0,
            delay_seconds: 1.0,
            fps: 30,
            sampling_ratio: 0.1,
            frame_interval_seconds: 1.0,
            jpeg_quality: 3,
            request_timeout_seconds: 30,
        }
    }
}

impl VisionConfig {
    pub fn processing_mode(&self) -> ProcessingMode {
        match self.mode {
            VisionMode::Windowed => ProcessingMode::Windowed {
                clip_seconds: self.clip_length_seconds,
            },
            VisionMode::Point => ProcessingMode::Point,
        }
    }

    /// Frames per second actually sent inside each clip.
    pub fn effective_fps(&self) -> f64 {
        (self.fps as f64 * self.sampling_ratio).max(1.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub system_instruction: String,
    pub response_modality: String,
    pub frame_interval_ms: u64,
    pub jpeg_quality: u8,
    pub connect_timeout_seconds: u64,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            endpoint: "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent".to_owned(),
            api_key: None,
            model: "models/gemini-2.0-flash-live-001".to_owned(),
            system_instruction: "You are watching a video one frame at a time. Briefly describe anything new that happens. Reply with -- when nothing changed.".to_owned(),
            response_modality: "TEXT".to_owned(),
            frame_interval_ms: 2_000,
            jpeg_quality: 5,
            connect_timeout_seconds: 10,
        }
    }
}

impl LiveConfig {
    pub fn processing_mode(&self) -> ProcessingMode {
        ProcessingMode::FixedCadence {
            interval_seconds: self.frame_interval_ms as f64 / 1_000.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub ffmpeg_binary: String,
    pub ffprobe_binary: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg_binary: "ffmpeg".to_owned(),
            ffprobe_binary: "ffprobe".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub mode: OutputMode,
    pub enable_notifications: bool,
    pub export_on_done: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            mode: OutputMode::ClipboardOnly,
            enable_notifications: true,
            export_on_done: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    ClipboardOnly,
    Stdout,
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub log_level: String,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
        }
    }
}
