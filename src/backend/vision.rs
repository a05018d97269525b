use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use reqwest::blocking::{multipart, Client};
use serde::Deserialize;

use crate::backend::sink::SessionSink;
use crate::backend::StreamingSession;
use crate::config::{VisionConfig, VisionMode};
use crate::error::{AppError, AppResult};
use crate::ledger::{InferenceResult, MediaUnit};
use crate::media::MediaTool;

/// Media a vision session uploads, cut from the source on demand.
pub trait UploadSource: Send + Sync {
    /// MP4 bytes covering `[start_sec, start_sec + length_sec)` at `fps`.
    fn clip(&self, start_sec: f64, length_sec: f64, fps: f64) -> AppResult<Vec<u8>>;
    /// JPEG still at `at_sec`.
    fn frame(&self, at_sec: f64) -> AppResult<Vec<u8>>;
}

/// Clips and stills cut from the session video through ffmpeg.
pub struct VideoUploads {
    media: MediaTool,
    video: PathBuf,
    clips_dir: PathBuf,
    jpeg_quality: u8,
}

impl VideoUploads {
    pub fn new(media: MediaTool, video: PathBuf, clips_dir: PathBuf, jpeg_quality: u8) -> Self {
        Self {
            media,
            video,
            clips_dir,
            jpeg_quality,
        }
    }
}

impl UploadSource for VideoUploads {
    fn clip(&self, start_sec: f64, length_sec: f64, fps: f64) -> AppResult<Vec<u8>> {
        let clip = tempfile::Builder::new()
            .prefix("clip-")
            .suffix(".mp4")
            .tempfile_in(&self.clips_dir)?;
        self.media
            .extract_clip(&self.video, start_sec, length_sec, fps, clip.path())?;
        Ok(std::fs::read(clip.path())?)
    }

    fn frame(&self, at_sec: f64) -> AppResult<Vec<u8>> {
        self.media
            .extract_frame_jpeg(&self.video, at_sec, self.jpeg_quality)
    }
}

/// Streams the source video to an HTTP inference service, either as trailing
/// clips or as single sampled frames, pacing uploads to real-time playback.
pub struct VisionSession {
    config: VisionConfig,
    source: Arc<dyn UploadSource>,
    video_duration_sec: Option<f64>,
    sink: SessionSink,
    client: Client,
    active: Arc<AtomicBool>,
    stop_tx: Option<Sender<()>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl VisionSession {
    pub fn new(
        config: VisionConfig,
        source: Arc<dyn UploadSource>,
        video_duration_sec: Option<f64>,
        sink: SessionSink,
    ) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self {
            config,
            source,
            video_duration_sec,
            sink,
            client,
            active: Arc::new(AtomicBool::new(false)),
            stop_tx: None,
            worker: None,
        })
    }

    fn worker(&self) -> VisionWorker {
        VisionWorker {
            schedule: UploadSchedule::new(&self.config, self.video_duration_sec),
            config: self.config.clone(),
            source: self.source.clone(),
            sink: self.sink.clone(),
            client: self.client.clone(),
            active: self.active.clone(),
        }
    }

    fn check_health(&self) -> AppResult<()> {
        let url = endpoint_url(&self.config.endpoint, "health");
        let mut request = self.client.get(&url);
        if let Some(api_key) = self.config.api_key.as_deref() {
            request = request.bearer_auth(api_key);
        }
        let response = request.send()?;
        if !response.status().is_success() {
            return Err(AppError::Backend(format!(
                "health check at {url} returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

impl StreamingSession for VisionSession {
    fn start(&mut self) -> AppResult<()> {
        if self.worker.is_some() {
            return Err(AppError::Session("vision session already started".to_owned()));
        }

        self.check_health()?;

        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let worker = self.worker();

        self.active.store(true, Ordering::SeqCst);
        let join = thread::Builder::new()
            .name("framecast-vision-worker".to_owned())
            .spawn(move || worker.run(stop_rx))
            .map_err(|error| {
                self.active.store(false, Ordering::SeqCst);
                AppError::Backend(format!("failed to spawn vision worker: {error}"))
            })?;

        self.stop_tx = Some(stop_tx);
        self.worker = Some(join);
        tracing::info!(
            session_id = %self.sink.session_id(),
            mode = ?self.config.mode,
            endpoint = %self.config.endpoint,
            "vision stream established"
        );
        Ok(())
    }

    fn stop(&mut self) -> AppResult<()> {
        self.active.store(false, Ordering::SeqCst);
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.try_send(());
        }
        // An in-flight upload may hold the worker for a full request timeout;
        // only reap it when it has already exited.
        if let Some(worker) = self.worker.take() {
            if worker.is_finished() {
                worker
                    .join()
                    .map_err(|_| AppError::Backend("vision worker panicked".to_owned()))?;
            }
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// When uploads happen, in seconds of playback.
#[derive(Debug, Clone, Copy, PartialEq)]
struct UploadSchedule {
    first_at_sec: f64,
    stride_sec: f64,
    end_sec: Option<f64>,
}

impl UploadSchedule {
    fn new(config: &VisionConfig, video_duration_sec: Option<f64>) -> Self {
        let (first_at_sec, stride_sec) = match config.mode {
            VisionMode::Windowed => (config.clip_length_seconds, config.delay_seconds),
            VisionMode::Point => (0.0, config.frame_interval_seconds),
        };
        Self {
            first_at_sec: match video_duration_sec {
                Some(end_sec) => first_at_sec.min(end_sec),
                None => first_at_sec,
            },
            stride_sec,
            end_sec: video_duration_sec,
        }
    }

    /// Next playhead after `previous`; never schedules behind real time.
    fn next_after(&self, previous_sec: f64, elapsed_sec: f64) -> f64 {
        (previous_sec + self.stride_sec).max(elapsed_sec)
    }

    /// Playhead to upload for `candidate_sec`. A candidate past the end is
    /// pulled back to the end once so the tail is covered; `None` after that.
    fn due(&self, candidate_sec: f64, last_sent_sec: Option<f64>) -> Option<f64> {
        match self.end_sec {
            Some(end_sec) if candidate_sec > end_sec => match last_sent_sec {
                Some(last_sec) if last_sec >= end_sec => None,
                _ => Some(end_sec),
            },
            _ => Some(candidate_sec),
        }
    }
}

struct VisionWorker {
    schedule: UploadSchedule,
    config: VisionConfig,
    source: Arc<dyn UploadSource>,
    sink: SessionSink,
    client: Client,
    active: Arc<AtomicBool>,
}

impl VisionWorker {
    fn run(self, stop_rx: Receiver<()>) {
        let started_at = Instant::now();
        let mut candidate_sec = self.schedule.first_at_sec;
        let mut last_sent_sec = None;

        loop {
            let Some(playhead_sec) = self.schedule.due(candidate_sec, last_sent_sec) else {
                tracing::info!(
                    session_id = %self.sink.session_id(),
                    "vision stream reached end of video"
                );
                break;
            };

            let due = started_at + Duration::from_secs_f64(playhead_sec);
            let wait = due.saturating_duration_since(Instant::now());
            crossbeam_channel::select! {
                recv(stop_rx) -> _ => break,
                default(wait) => {}
            }
            if !self.sink.is_open() {
                break;
            }

            match self.process_unit(playhead_sec) {
                Ok(result) => {
                    if !self.sink.deliver(result) {
                        break;
                    }
                }
                Err(error) => {
                    tracing::warn!(
                        session_id = %self.sink.session_id(),
                        "vision pipeline fault: {error}"
                    );
                    self.sink.fault(error.to_string());
                    break;
                }
            }

            last_sent_sec = Some(playhead_sec);
            candidate_sec = self
                .schedule
                .next_after(playhead_sec, started_at.elapsed().as_secs_f64());
        }

        self.active.store(false, Ordering::SeqCst);
    }

    fn process_unit(&self, playhead_sec: f64) -> AppResult<InferenceResult> {
        let captured_at = Instant::now();
        let (unit, part) = match self.config.mode {
            VisionMode::Windowed => {
                let clip_start = (playhead_sec - self.config.clip_length_seconds).max(0.0);
                let bytes = self.source.clip(
                    clip_start,
                    playhead_sec - clip_start,
                    self.config.effective_fps(),
                )?;
                let part = multipart::Part::bytes(bytes)
                    .file_name("clip.mp4")
                    .mime_str("video/mp4")?;
                (MediaUnit::Clip, part)
            }
            VisionMode::Point => {
                let bytes = self.source.frame(playhead_sec)?;
                let part = multipart::Part::bytes(bytes)
                    .file_name("frame.jpg")
                    .mime_str("image/jpeg")?;
                (MediaUnit::Frame, part)
            }
        };

        let form = multipart::Form::new()
            .text("prompt", self.config.prompt.clone())
            .text("model", self.config.model.clone())
            .text("mode", mode_label(self.config.mode))
            .part("media", part);

        let url = endpoint_url(&self.config.endpoint, "infer");
        let mut request = self.client.post(&url).multipart(form);
        if let Some(api_key) = self.config.api_key.as_deref() {
            request = request.bearer_auth(api_key);
        }
        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(AppError::Backend(format!(
                "inference request returned {status}: {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let payload: VisionResponse = response.json()?;
        let round_trip_ms = captured_at.elapsed().as_secs_f64() * 1_000.0;
        tracing::debug!(
            session_id = %self.sink.session_id(),
            playhead_sec,
            round_trip_ms,
            "vision unit processed"
        );
        Ok(payload.into_inference_result(unit, round_trip_ms))
    }
}

#[derive(Debug, Deserialize)]
struct VisionResponse {
    #[serde(default = "default_ok")]
    ok: bool,
    result: Option<String>,
    error: Option<String>,
    mode: Option<String>,
    inference_latency_ms: Option<f64>,
    total_latency_ms: Option<f64>,
    finish_reason: Option<String>,
}

fn default_ok() -> bool {
    true
}

impl VisionResponse {
    /// `measured_round_trip_ms` stands in for a missing `total_latency_ms`;
    /// it is timed from the capture instant so the estimator lands back on
    /// the uploaded playhead.
    fn into_inference_result(
        self,
        requested: MediaUnit,
        measured_round_trip_ms: f64,
    ) -> InferenceResult {
        let unit = match self.mode.as_deref() {
            Some("clip") => MediaUnit::Clip,
            Some("frame") => MediaUnit::Frame,
            _ => requested,
        };
        InferenceResult {
            ok: self.ok,
            text: if self.ok { self.result } else { None },
            error: if self.ok {
                None
            } else {
                Some(self.error.unwrap_or_else(|| "inference failed".to_owned()))
            },
            unit,
            inference_latency_ms: self.inference_latency_ms,
            total_latency_ms: self.total_latency_ms.or(Some(measured_round_trip_ms)),
            finish_reason: self.finish_reason,
        }
    }
}

fn mode_label(mode: VisionMode) -> &'static str {
    match mode {
        VisionMode::Windowed => "windowed",
        VisionMode::Point => "point",
    }
}

fn endpoint_url(endpoint: &str, path: &str) -> String {
    format!("{}/{path}", endpoint.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::{endpoint_url, UploadSchedule, UploadSource, VisionResponse, VisionSession};
    use crate::backend::sink::SessionSink;
    use crate::backend::StreamingSession;
    use crate::config::{VisionConfig, VisionMode};
    use crate::controller::events::ControllerEvent;
    use crate::error::{AppError, AppResult};
    use crate::ledger::{InferenceResult, MediaUnit};
    use crossbeam_channel::Receiver;
    use std::sync::{Arc, Mutex};
    use tokio::runtime::Runtime;
    use uuid::Uuid;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct RecordingUploads {
        clips: Mutex<Vec<(f64, f64)>>,
        frames: Mutex<Vec<f64>>,
    }

    impl UploadSource for RecordingUploads {
        fn clip(&self, start_sec: f64, length_sec: f64, _fps: f64) -> AppResult<Vec<u8>> {
            self.clips
                .lock()
                .expect("lock clips")
                .push((start_sec, length_sec));
            Ok(b"mp4-clip".to_vec())
        }

        fn frame(&self, at_sec: f64) -> AppResult<Vec<u8>> {
            self.frames.lock().expect("lock frames").push(at_sec);
            Ok(b"jpeg-frame".to_vec())
        }
    }

    fn runtime() -> Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .expect("runtime")
    }

    fn inference_service(runtime: &Runtime, health: u16, infer: ResponseTemplate) -> MockServer {
        runtime.block_on(async {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/v1/health"))
                .respond_with(ResponseTemplate::new(health))
                .mount(&server)
                .await;
            Mock::given(method("POST"))
                .and(path("/v1/infer"))
                .respond_with(infer)
                .mount(&server)
                .await;
            server
        })
    }

    fn infer_requests(runtime: &Runtime, server: &MockServer) -> Vec<wiremock::Request> {
        runtime
            .block_on(server.received_requests())
            .expect("request recording")
            .into_iter()
            .filter(|request| request.url.path() == "/v1/infer")
            .collect()
    }

    fn session_against(
        endpoint: String,
        config: VisionConfig,
        uploads: Arc<RecordingUploads>,
        video_duration_sec: Option<f64>,
    ) -> (VisionSession, Receiver<ControllerEvent>) {
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        let sink = SessionSink::new(Uuid::new_v4(), event_tx);
        let config = VisionConfig {
            endpoint,
            request_timeout_seconds: 5,
            ..config
        };
        let session =
            VisionSession::new(config, uploads, video_duration_sec, sink).expect("session");
        (session, event_rx)
    }

    /// Runs the upload loop to completion on the calling thread.
    fn run_to_end(session: &VisionSession) {
        let (_stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        session.worker().run(stop_rx);
    }

    fn delivered(event_rx: &Receiver<ControllerEvent>) -> Vec<InferenceResult> {
        event_rx
            .try_iter()
            .map(|event| match event {
                ControllerEvent::BackendResult { result, .. } => result,
                other => panic!("expected a result, got {other:?}"),
            })
            .collect()
    }

    fn described(text: &str) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .set_body_json(serde_json::json!({ "ok": true, "result": text }))
    }

    #[test]
    fn windowed_schedule_waits_for_a_full_clip() {
        let config = VisionConfig {
            clip_length_seconds: 5.0,
            delay_seconds: 2.0,
            ..VisionConfig::default()
        };
        let schedule = UploadSchedule::new(&config, None);
        assert_eq!(schedule.first_at_sec, 5.0);
        assert_eq!(schedule.next_after(5.0, 5.1), 7.0);
    }

    #[test]
    fn point_schedule_starts_at_zero_and_catches_up_with_playback() {
        let config = VisionConfig {
            mode: VisionMode::Point,
            frame_interval_seconds: 1.0,
            ..VisionConfig::default()
        };
        let schedule = UploadSchedule::new(&config, None);
        assert_eq!(schedule.first_at_sec, 0.0);
        assert_eq!(schedule.next_after(0.0, 0.2), 1.0);
        assert_eq!(schedule.next_after(1.0, 4.5), 4.5);
    }

    #[test]
    fn response_maps_success_and_keeps_reported_latency() {
        let payload: VisionResponse = serde_json::from_str(
            r#"{"ok":true,"result":"a man opens a door","mode":"clip",
                "inference_latency_ms":410.0,"total_latency_ms":900.0,"finish_reason":"stop"}"#,
        )
        .expect("parse");
        let result = payload.into_inference_result(MediaUnit::Frame, 1_500.0);
        assert!(result.ok);
        assert_eq!(result.text.as_deref(), Some("a man opens a door"));
        assert_eq!(result.unit, MediaUnit::Clip);
        assert_eq!(result.inference_latency_ms, Some(410.0));
        assert_eq!(result.total_latency_ms, Some(900.0));
        assert_eq!(result.finish_reason.as_deref(), Some("stop"));
    }

    #[test]
    fn response_without_latency_falls_back_to_measured_round_trip() {
        let payload: VisionResponse =
            serde_json::from_str(r#"{"result":"--"}"#).expect("parse");
        let result = payload.into_inference_result(MediaUnit::Frame, 1_500.0);
        assert!(result.ok);
        assert_eq!(result.unit, MediaUnit::Frame);
        assert_eq!(result.total_latency_ms, Some(1_500.0));
    }

    #[test]
    fn failed_response_carries_error_instead_of_text() {
        let payload: VisionResponse =
            serde_json::from_str(r#"{"ok":false,"result":"ignored","error":"model overloaded"}"#)
                .expect("parse");
        let result = payload.into_inference_result(MediaUnit::Clip, 10.0);
        assert!(!result.ok);
        assert!(result.text.is_none());
        assert_eq!(result.error.as_deref(), Some("model overloaded"));

        let bare: VisionResponse = serde_json::from_str(r#"{"ok":false}"#).expect("parse");
        assert_eq!(
            bare.into_inference_result(MediaUnit::Clip, 10.0).error.as_deref(),
            Some("inference failed")
        );
    }

    #[test]
    fn endpoint_url_joins_without_double_slashes() {
        assert_eq!(
            endpoint_url("http://127.0.0.1:8000/v1/", "infer"),
            "http://127.0.0.1:8000/v1/infer"
        );
        assert_eq!(
            endpoint_url("http://127.0.0.1:8000/v1", "health"),
            "http://127.0.0.1:8000/v1/health"
        );
    }

    #[test]
    fn schedule_clamps_to_a_video_shorter_than_one_clip() {
        let config = VisionConfig {
            clip_length_seconds: 5.0,
            ..VisionConfig::default()
        };
        let schedule = UploadSchedule::new(&config, Some(3.0));
        assert_eq!(schedule.first_at_sec, 3.0);
        assert_eq!(schedule.due(3.0, None), Some(3.0));
        assert_eq!(schedule.due(4.0, Some(3.0)), None);
    }

    #[test]
    fn schedule_pulls_the_last_upload_back_to_the_end_once() {
        let config = VisionConfig {
            clip_length_seconds: 2.0,
            delay_seconds: 2.0,
            ..VisionConfig::default()
        };
        let schedule = UploadSchedule::new(&config, Some(7.0));
        assert_eq!(schedule.due(6.0, Some(4.0)), Some(6.0));
        assert_eq!(schedule.due(8.0, Some(6.0)), Some(7.0));
        assert_eq!(schedule.due(9.0, Some(7.0)), None);

        let unbounded = UploadSchedule::new(&config, None);
        assert_eq!(unbounded.due(1_000.0, Some(998.0)), Some(1_000.0));
    }

    #[test]
    fn failing_health_check_keeps_the_session_from_starting() {
        let runtime = runtime();
        let server = inference_service(&runtime, 503, described("unused"));
        let uploads = Arc::new(RecordingUploads::default());
        let (mut session, event_rx) = session_against(
            format!("{}/v1", server.uri()),
            VisionConfig::default(),
            uploads.clone(),
            Some(10.0),
        );

        match session.start() {
            Err(AppError::Backend(message)) => assert!(message.contains("503"), "{message}"),
            other => panic!("expected a backend error, got {other:?}"),
        }
        assert!(!session.is_active());
        assert!(event_rx.try_recv().is_err());
        assert!(uploads.clips.lock().expect("lock clips").is_empty());
        assert!(infer_requests(&runtime, &server).is_empty());
    }

    #[test]
    fn unreachable_service_is_a_transport_error_on_start() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();
        drop(listener);

        let (mut session, _event_rx) = session_against(
            format!("http://127.0.0.1:{port}/v1"),
            VisionConfig::default(),
            Arc::new(RecordingUploads::default()),
            Some(10.0),
        );
        assert!(matches!(session.start(), Err(AppError::Http(_))));
        assert!(!session.is_active());
    }

    #[test]
    fn healthy_service_starts_and_stops_the_worker() {
        let runtime = runtime();
        let server = inference_service(&runtime, 200, described("a quiet room"));
        let (mut session, _event_rx) = session_against(
            format!("{}/v1", server.uri()),
            VisionConfig {
                clip_length_seconds: 30.0,
                ..VisionConfig::default()
            },
            Arc::new(RecordingUploads::default()),
            Some(60.0),
        );

        session.start().expect("start");
        assert!(session.is_active());
        assert!(matches!(session.start(), Err(AppError::Session(_))));
        session.stop().expect("stop");
        assert!(!session.is_active());
    }

    #[test]
    fn non_success_status_faults_once_and_ends_the_stream() {
        let runtime = runtime();
        let server = inference_service(
            &runtime,
            200,
            ResponseTemplate::new(503).set_body_string("overloaded"),
        );
        let (session, event_rx) = session_against(
            format!("{}/v1", server.uri()),
            VisionConfig {
                clip_length_seconds: 0.05,
                delay_seconds: 0.05,
                ..VisionConfig::default()
            },
            Arc::new(RecordingUploads::default()),
            Some(5.0),
        );

        run_to_end(&session);

        let events: Vec<_> = event_rx.try_iter().collect();
        assert_eq!(events.len(), 1, "{events:?}");
        match &events[0] {
            ControllerEvent::BackendFault {
                session_id,
                message,
            } => {
                assert_eq!(*session_id, session.sink.session_id());
                assert!(message.contains("503"), "{message}");
                assert!(message.contains("overloaded"), "{message}");
            }
            other => panic!("expected a fault, got {other:?}"),
        }
        assert_eq!(infer_requests(&runtime, &server).len(), 1);
        assert!(!session.is_active());
    }

    #[test]
    fn point_upload_sends_form_fields_with_bearer_auth() {
        let runtime = runtime();
        let server = runtime.block_on(async {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/v1/infer"))
                .and(header("authorization", "Bearer secret-key"))
                .respond_with(described("a door opens"))
                .mount(&server)
                .await;
            server
        });
        let uploads = Arc::new(RecordingUploads::default());
        let (session, event_rx) = session_against(
            format!("{}/v1", server.uri()),
            VisionConfig {
                mode: VisionMode::Point,
                frame_interval_seconds: 0.05,
                api_key: Some("secret-key".to_owned()),
                prompt: "What changed?".to_owned(),
                model: "scene-small".to_owned(),
                ..VisionConfig::default()
            },
            uploads.clone(),
            Some(0.12),
        );

        run_to_end(&session);

        let results = delivered(&event_rx);
        assert!(results.len() >= 2, "{results:?}");
        for result in &results {
            assert!(result.ok);
            assert_eq!(result.unit, MediaUnit::Frame);
            assert_eq!(result.text.as_deref(), Some("a door opens"));
            assert!(result.total_latency_ms.is_some_and(|ms| ms > 0.0));
            assert!(result.inference_latency_ms.is_none());
        }

        let frames = uploads.frames.lock().expect("lock frames").clone();
        assert_eq!(frames.len(), results.len());
        assert_eq!(frames.first(), Some(&0.0));
        assert_eq!(frames.last(), Some(&0.12));

        let requests = infer_requests(&runtime, &server);
        assert_eq!(requests.len(), results.len());
        let body = String::from_utf8_lossy(&requests[0].body).into_owned();
        assert!(body.contains("name=\"prompt\"") && body.contains("What changed?"));
        assert!(body.contains("name=\"model\"") && body.contains("scene-small"));
        assert!(body.contains("name=\"mode\"") && body.contains("point"));
        assert!(body.contains("name=\"media\"") && body.contains("filename=\"frame.jpg\""));
        assert!(body.contains("jpeg-frame"));
    }

    #[test]
    fn video_shorter_than_one_clip_is_uploaded_once() {
        let runtime = runtime();
        let server = inference_service(&runtime, 200, described("a short clip"));
        let uploads = Arc::new(RecordingUploads::default());
        let (session, event_rx) = session_against(
            format!("{}/v1", server.uri()),
            VisionConfig {
                clip_length_seconds: 0.5,
                ..VisionConfig::default()
            },
            uploads.clone(),
            Some(0.3),
        );

        run_to_end(&session);

        let results = delivered(&event_rx);
        assert_eq!(results.len(), 1, "{results:?}");
        assert_eq!(results[0].unit, MediaUnit::Clip);
        assert_eq!(results[0].text.as_deref(), Some("a short clip"));
        assert_eq!(
            uploads.clips.lock().expect("lock clips").as_slice(),
            [(0.0, 0.3)]
        );
    }

    #[test]
    fn tail_after_the_last_full_stride_is_uploaded() {
        let runtime = runtime();
        let server = inference_service(&runtime, 200, described("the credits roll"));
        let uploads = Arc::new(RecordingUploads::default());
        let (session, event_rx) = session_against(
            format!("{}/v1", server.uri()),
            VisionConfig {
                clip_length_seconds: 0.1,
                delay_seconds: 0.1,
                ..VisionConfig::default()
            },
            uploads.clone(),
            Some(0.25),
        );

        run_to_end(&session);

        let clips = uploads.clips.lock().expect("lock clips").clone();
        assert!(clips.len() >= 2, "{clips:?}");
        let (start_sec, length_sec) = clips[clips.len() - 1];
        assert!((start_sec + length_sec - 0.25).abs() < 1e-9, "{clips:?}");
        assert!((length_sec - 0.1).abs() < 1e-9, "{clips:?}");
        assert_eq!(delivered(&event_rx).len(), clips.len());
    }

    #[test]
    fn rejected_inference_body_arrives_as_a_failed_result() {
        let runtime = runtime();
        let server = inference_service(
            &runtime,
            200,
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "ok": false, "error": "model overloaded" })),
        );
        let (session, event_rx) = session_against(
            format!("{}/v1", server.uri()),
            VisionConfig {
                clip_length_seconds: 0.05,
                ..VisionConfig::default()
            },
            Arc::new(RecordingUploads::default()),
            Some(0.05),
        );

        run_to_end(&session);

        let results = delivered(&event_rx);
        assert_eq!(results.len(), 1, "{results:?}");
        assert!(!results[0].ok);
        assert!(results[0].text.is_none());
        assert_eq!(results[0].error.as_deref(), Some("model overloaded"));
    }
}
