pub mod live;
pub mod sink;
pub mod vision;

use std::path::PathBuf;
use std::sync::Arc;

use crate::bootstrap::AppPaths;
use crate::config::{AppConfig, BackendKind};
use crate::error::AppResult;
use crate::media::MediaTool;

pub use live::LiveSession;
pub use sink::SessionSink;
pub use vision::{UploadSource, VideoUploads, VisionSession};

/// One open connection to a remote inference backend.
///
/// Results and faults never come back through this trait; implementations
/// push them through the [`SessionSink`] handed over at construction.
pub trait StreamingSession: Send {
    /// Returns once streaming is established.
    fn start(&mut self) -> AppResult<()>;
    /// Idempotent and best-effort. Must not block on in-flight work.
    fn stop(&mut self) -> AppResult<()>;
    fn is_active(&self) -> bool;
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionRequest {
    pub video: PathBuf,
    pub backend: BackendKind,
    pub video_duration_sec: Option<f64>,
}

/// Builds the backend session for `request` without starting it.
pub fn open_session(
    config: &AppConfig,
    paths: &AppPaths,
    request: SessionRequest,
    sink: SessionSink,
) -> AppResult<Box<dyn StreamingSession>> {
    let media = MediaTool::new(&config.media);
    match request.backend {
        BackendKind::Vision => {
            let uploads = VideoUploads::new(
                media,
                request.video,
                paths.clips_dir.clone(),
                config.vision.jpeg_quality,
            );
            let session = VisionSession::new(
                config.vision.clone(),
                Arc::new(uploads),
                request.video_duration_sec,
                sink,
            )?;
            Ok(Box::new(session))
        }
        BackendKind::Live => {
            let frames = live::VideoFrames::new(media, request.video, config.live.jpeg_quality);
            Ok(Box::new(LiveSession::new(
                config.live.clone(),
                Arc::new(frames),
                request.video_duration_sec,
                sink,
            )))
        }
    }
}
