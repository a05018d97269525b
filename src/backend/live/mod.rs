pub mod wire;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::oneshot;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::backend::sink::SessionSink;
use crate::backend::StreamingSession;
use crate::config::LiveConfig;
use crate::error::{AppError, AppResult};
use crate::ledger::{InferenceResult, MediaUnit};
use crate::media::MediaTool;

use self::wire::{parse_inbound, LiveInbound, RealtimeInputMessage, SetupMessage};

/// Source of JPEG stills pushed to the live service.
pub trait FrameSource: Send + Sync {
    fn frame_at(&self, at_sec: f64) -> AppResult<Vec<u8>>;
}

/// Frames decoded from the session video through ffmpeg.
pub struct VideoFrames {
    media: MediaTool,
    video: PathBuf,
    quality: u8,
}

impl VideoFrames {
    pub fn new(media: MediaTool, video: PathBuf, quality: u8) -> Self {
        Self {
            media,
            video,
            quality,
        }
    }
}

impl FrameSource for VideoFrames {
    fn frame_at(&self, at_sec: f64) -> AppResult<Vec<u8>> {
        self.media
            .extract_frame_jpeg(&self.video, at_sec, self.quality)
    }
}

/// Bidirectional WebSocket session that samples one still per
/// `frame_interval_ms` of playback and relays whatever text the service
/// streams back.
///
/// The socket runs on a single-worker tokio runtime owned by the session, so
/// the synchronous controller never awaits anything.
pub struct LiveSession {
    config: LiveConfig,
    frames: Arc<dyn FrameSource>,
    video_duration_sec: Option<f64>,
    sink: SessionSink,
    active: Arc<AtomicBool>,
    runtime: Option<tokio::runtime::Runtime>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl LiveSession {
    pub fn new(
        config: LiveConfig,
        frames: Arc<dyn FrameSource>,
        video_duration_sec: Option<f64>,
        sink: SessionSink,
    ) -> Self {
        Self {
            config,
            frames,
            video_duration_sec,
            sink,
            active: Arc::new(AtomicBool::new(false)),
            runtime: None,
            shutdown_tx: None,
        }
    }
}

impl StreamingSession for LiveSession {
    fn start(&mut self) -> AppResult<()> {
        if self.runtime.is_some() {
            return Err(AppError::Session("live session already started".to_owned()));
        }

        let api_key = self
            .config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| AppError::Config("live.api_key is not set".to_owned()))?;
        let url = session_url(&self.config.endpoint, api_key)?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("framecast-live")
            .enable_all()
            .build()?;

        let connect_timeout = Duration::from_secs(self.config.connect_timeout_seconds);
        let (stream, _response) = runtime
            .block_on(async {
                tokio::time::timeout(
                    connect_timeout,
                    tokio_tungstenite::connect_async(url.as_str()),
                )
                .await
            })
            .map_err(|_| {
                AppError::Backend(format!(
                    "timed out after {}s connecting to live endpoint",
                    self.config.connect_timeout_seconds
                ))
            })??;
        let origin = Instant::now();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let context = StreamContext {
            config: self.config.clone(),
            frames: self.frames.clone(),
            video_duration_sec: self.video_duration_sec,
            sink: self.sink.clone(),
            active: self.active.clone(),
            origin,
        };

        self.active.store(true, Ordering::SeqCst);
        runtime.spawn(run_stream(stream, context, shutdown_rx));

        self.runtime = Some(runtime);
        self.shutdown_tx = Some(shutdown_tx);
        tracing::info!(
            session_id = %self.sink.session_id(),
            model = %self.config.model,
            frame_interval_ms = self.config.frame_interval_ms,
            "live stream established"
        );
        Ok(())
    }

    fn stop(&mut self) -> AppResult<()> {
        self.active.store(false, Ordering::SeqCst);
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        // Gives the stream task a moment to send its close frame.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_timeout(Duration::from_millis(250));
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl Drop for LiveSession {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

struct StreamContext {
    config: LiveConfig,
    frames: Arc<dyn FrameSource>,
    video_duration_sec: Option<f64>,
    sink: SessionSink,
    active: Arc<AtomicBool>,
    origin: Instant,
}

async fn run_stream<S>(
    stream: WebSocketStream<S>,
    context: StreamContext,
    shutdown_rx: oneshot::Receiver<()>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match drive(stream, &context, shutdown_rx).await {
        Ok(()) => {
            tracing::info!(session_id = %context.sink.session_id(), "live stream closed");
        }
        Err(error) => {
            tracing::warn!(session_id = %context.sink.session_id(), "live stream fault: {error}");
            context.sink.fault(error.to_string());
        }
    }
    context.active.store(false, Ordering::SeqCst);
}

async fn drive<S>(
    stream: WebSocketStream<S>,
    context: &StreamContext,
    mut shutdown_rx: oneshot::Receiver<()>,
) -> AppResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut writer, mut reader) = stream.split();

    let setup = serde_json::to_string(&SetupMessage::from_config(&context.config))?;
    writer.send(Message::Text(setup.into())).await?;

    // Frames flow only once the service acknowledged the setup.
    let mut ticker: Option<Interval> = None;

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                let close = CloseFrame {
                    code: CloseCode::Normal,
                    reason: "session stopped".to_owned().into(),
                };
                let _ = writer.send(Message::Close(Some(close))).await;
                return Ok(());
            }
            _ = next_tick(&mut ticker) => {
                let playhead_sec = context.origin.elapsed().as_secs_f64();
                if context
                    .video_duration_sec
                    .is_some_and(|duration| playhead_sec > duration)
                {
                    tracing::info!(
                        session_id = %context.sink.session_id(),
                        "live stream reached end of video"
                    );
                    ticker = None;
                    continue;
                }

                let frames = context.frames.clone();
                let frame = tokio::task::spawn_blocking(move || frames.frame_at(playhead_sec))
                    .await
                    .map_err(|error| {
                        AppError::Backend(format!("frame extraction task failed: {error}"))
                    })??;
                let payload = serde_json::to_string(&RealtimeInputMessage::jpeg(&frame))?;
                writer.send(Message::Text(payload.into())).await?;
                tracing::debug!(
                    session_id = %context.sink.session_id(),
                    playhead_sec,
                    bytes = frame.len(),
                    "live frame pushed"
                );
            }
            message = reader.next() => {
                let raw = match message {
                    Some(Ok(Message::Text(text))) => text.as_str().to_owned(),
                    Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                        Ok(text) => text.to_owned(),
                        Err(_) => {
                            tracing::debug!("ignoring non-utf8 binary message");
                            continue;
                        }
                    },
                    Some(Ok(Message::Close(frame))) => return close_outcome(frame),
                    Some(Ok(_)) => continue,
                    Some(Err(error)) => return Err(error.into()),
                    None => {
                        return Err(AppError::Backend(
                            "live connection dropped without a close frame".to_owned(),
                        ))
                    }
                };

                match parse_inbound(&raw) {
                    Ok(LiveInbound::SetupComplete) => {
                        let mut interval = tokio::time::interval(Duration::from_millis(
                            context.config.frame_interval_ms.max(1),
                        ));
                        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                        ticker = Some(interval);
                        tracing::debug!(
                            session_id = %context.sink.session_id(),
                            "live setup acknowledged"
                        );
                    }
                    Ok(LiveInbound::Text(text)) => {
                        if !context
                            .sink
                            .deliver(InferenceResult::success(MediaUnit::Frame, text))
                        {
                            return Ok(());
                        }
                    }
                    Ok(LiveInbound::Other) => {}
                    Err(error) => {
                        tracing::warn!("ignoring malformed live message: {error}");
                    }
                }
            }
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

fn close_outcome(frame: Option<CloseFrame>) -> AppResult<()> {
    match frame {
        Some(frame) if frame.code != CloseCode::Normal => Err(AppError::Backend(format!(
            "live connection closed with code {}: {}",
            u16::from(frame.code),
            frame.reason.as_str()
        ))),
        _ => Ok(()),
    }
}

fn session_url(endpoint: &str, api_key: &str) -> AppResult<reqwest::Url> {
    let mut url = reqwest::Url::parse(endpoint).map_err(|error| {
        AppError::Config(format!("invalid live.endpoint `{endpoint}`: {error}"))
    })?;
    url.query_pairs_mut().append_pair("key", api_key);
    Ok(url)
}
