pub mod events;
pub mod state;
pub mod timer;

use std::path::Path;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use uuid::Uuid;

use crate::backend::{open_session, SessionRequest, SessionSink, StreamingSession};
use crate::bootstrap::AppPaths;
use crate::config::{AppConfig, BackendKind, OutputMode};
use crate::controller::events::{ControllerEvent, ControllerOutput};
use crate::controller::state::SessionState;
use crate::controller::timer::AutoStopTimer;
use crate::error::{AppError, AppResult};
use crate::ledger::{render_export, InferenceResult, ResultLedger, TimestampedResult};
use crate::media::MediaTool;
use crate::output::ClipboardOutput;
use crate::timing::{estimate_interval, ProcessingMode, SessionClock};

#[derive(Debug, Clone)]
pub struct ControllerContext {
    pub config: AppConfig,
    pub paths: AppPaths,
}

/// Everything scoped to one streaming session. Dropped as a unit.
struct ActiveSession {
    id: Uuid,
    backend: BackendKind,
    handle: Box<dyn StreamingSession>,
    clock: SessionClock,
    video_duration_sec: Option<f64>,
    mode: ProcessingMode,
    sink: SessionSink,
    auto_stop: Option<AutoStopTimer>,
}

impl ActiveSession {
    /// Idempotent: the sink, timer and backend are each released once.
    fn teardown(mut self) {
        self.sink.close();
        if let Some(timer) = self.auto_stop.take() {
            timer.cancel();
        }
        if let Err(error) = self.handle.stop() {
            tracing::warn!(session_id = %self.id, "backend teardown failed: {error}");
        }
        tracing::info!(session_id = %self.id, backend = ?self.backend, "session torn down");
    }
}

pub fn run_controller_loop(
    context: ControllerContext,
    event_rx: Receiver<ControllerEvent>,
    event_tx: Sender<ControllerEvent>,
    output_tx: Sender<ControllerOutput>,
) -> AppResult<()> {
    let media = MediaTool::new(&context.config.media);
    let factory_config = context.config.clone();
    let factory_paths = context.paths.clone();
    let mut clipboard = ClipboardOutput::system();

    run_controller_loop_with(
        context,
        event_rx,
        event_tx,
        output_tx,
        move |request, sink| open_session(&factory_config, &factory_paths, request, sink),
        move |video| media.probe_duration_sec(video),
        move |text| clipboard.write_text(text),
    )
}

fn run_controller_loop_with<OpenSessionFn, ProbeDurationFn, WriteClipboardFn>(
    context: ControllerContext,
    event_rx: Receiver<ControllerEvent>,
    event_tx: Sender<ControllerEvent>,
    output_tx: Sender<ControllerOutput>,
    mut open_session: OpenSessionFn,
    mut probe_duration: ProbeDurationFn,
    mut write_clipboard: WriteClipboardFn,
) -> AppResult<()>
where
    OpenSessionFn: FnMut(SessionRequest, SessionSink) -> AppResult<Box<dyn StreamingSession>>,
    ProbeDurationFn: FnMut(&Path) -> AppResult<f64>,
    WriteClipboardFn: FnMut(&str) -> AppResult<()>,
{
    let mut state = SessionState::Idle;
    let mut session: Option<ActiveSession> = None;
    let mut ledger = ResultLedger::new();

    send_state(&output_tx, &state)?;

    loop {
        let event = event_rx.recv().map_err(|_| {
            AppError::ChannelClosed("controller event channel closed".to_owned())
        })?;

        match event {
            ControllerEvent::Start { video, backend } => {
                if state.is_running() {
                    send_notification(&output_tx, "A session is already running; stop it first.")?;
                    continue;
                }
                // A faulted session stays open until something replaces it.
                if let Some(lingering) = session.take() {
                    lingering.teardown();
                }

                if !video.is_file() {
                    let detail = format!("video file not found: {}", video.display());
                    state = SessionState::Error(detail.clone());
                    send_state(&output_tx, &state)?;
                    send_banner(&output_tx, &detail)?;
                    continue;
                }

                let video_duration_sec = match probe_duration(&video) {
                    Ok(duration) if duration.is_finite() && duration > 0.0 => Some(duration),
                    Ok(duration) => {
                        tracing::warn!(duration, "probed duration is unusable; auto-stop disabled");
                        None
                    }
                    Err(error) => {
                        tracing::warn!("duration probe failed; auto-stop disabled: {error}");
                        None
                    }
                };

                let id = Uuid::new_v4();
                let sink = SessionSink::new(id, event_tx.clone());
                let mode = context.config.processing_mode_for(backend);
                let request = SessionRequest {
                    video: video.clone(),
                    backend,
                    video_duration_sec,
                };

                let started = open_session(request, sink.clone()).and_then(|mut handle| {
                    handle.start()?;
                    Ok(handle)
                });
                let handle = match started {
                    Ok(handle) => handle,
                    Err(error) => {
                        sink.close();
                        let detail = format!("session start failed: {error}");
                        state = SessionState::Error(detail.clone());
                        send_state(&output_tx, &state)?;
                        send_banner(&output_tx, &detail)?;
                        continue;
                    }
                };

                let clock = SessionClock::start();
                let auto_stop = match video_duration_sec {
                    Some(duration) => {
                        let delay = auto_stop_delay(
                            duration,
                            context.config.session.auto_stop_grace_ms,
                            mode,
                        );
                        match AutoStopTimer::arm(id, delay, event_tx.clone()) {
                            Ok(timer) => Some(timer),
                            Err(error) => {
                                tracing::warn!(session_id = %id, "auto-stop unavailable: {error}");
                                None
                            }
                        }
                    }
                    None => None,
                };

                session = Some(ActiveSession {
                    id,
                    backend,
                    handle,
                    clock,
                    video_duration_sec,
                    mode,
                    sink,
                    auto_stop,
                });
                tracing::info!(
                    session_id = %id,
                    ?backend,
                    video = %video.display(),
                    video_duration_sec,
                    "session running"
                );
                state = SessionState::Running;
                send_state(&output_tx, &state)?;
                send_notification(&output_tx, &format!("Streaming {}", video.display()))?;
            }
            ControllerEvent::BackendResult {
                session_id,
                received_at,
                result,
            } => {
                let current = session.as_ref().filter(|active| active.id == session_id);
                let Some(active) = current else {
                    tracing::debug!(%session_id, "dropping result from stale session");
                    continue;
                };

                let entry = timestamp_result(active, received_at, result);
                tracing::debug!(
                    session_id = %active.id,
                    start_sec = entry.video_start_sec,
                    end_sec = entry.video_end_sec,
                    "result recorded"
                );
                ledger.append(entry.clone());
                send_output(&output_tx, ControllerOutput::ResultRecorded(entry))?;
            }
            ControllerEvent::BackendFault {
                session_id,
                message,
            } => {
                if session.as_ref().map(|active| active.id) != Some(session_id) {
                    tracing::debug!(%session_id, "dropping fault from stale session");
                    continue;
                }
                tracing::warn!(%session_id, "backend fault: {message}");
                state = SessionState::Error(message.clone());
                send_state(&output_tx, &state)?;
                send_banner(&output_tx, &format!("Backend error: {message}"))?;
            }
            ControllerEvent::AutoStopElapsed { session_id } => {
                let Some(active) = session.take_if(|active| active.id == session_id) else {
                    tracing::debug!(%session_id, "ignoring auto-stop for stale session");
                    continue;
                };

                let elapsed_ms = active.clock.elapsed_ms(Instant::now());
                let was_active = active.handle.is_active();
                active.teardown();
                tracing::info!(%session_id, elapsed_ms, was_active, "auto-stop elapsed");

                if state.is_running() {
                    state = SessionState::Done;
                    send_state(&output_tx, &state)?;
                    send_banner(
                        &output_tx,
                        &format!("Session complete: {} results", ledger.len()),
                    )?;
                    if context.config.output.export_on_done {
                        export_ledger(
                            &ledger,
                            context.config.output.mode,
                            &output_tx,
                            &mut write_clipboard,
                        )?;
                    }
                }
            }
            ControllerEvent::Stop => match session.take() {
                Some(active) => {
                    active.teardown();
                    state = SessionState::Idle;
                    send_state(&output_tx, &state)?;
                    send_notification(&output_tx, "Session stopped")?;
                }
                None => {
                    send_notification(&output_tx, "No session to stop.")?;
                }
            },
            ControllerEvent::Clear => {
                let cleared = ledger.len();
                ledger.clear();
                send_notification(&output_tx, &format!("Cleared {cleared} results"))?;
            }
            ControllerEvent::Export => {
                export_ledger(
                    &ledger,
                    context.config.output.mode,
                    &output_tx,
                    &mut write_clipboard,
                )?;
            }
            ControllerEvent::List => {
                let entries = ledger.newest_first().cloned().collect();
                send_output(&output_tx, ControllerOutput::Listing(entries))?;
            }
            ControllerEvent::Shutdown => {
                if let Some(active) = session.take() {
                    active.teardown();
                }
                send_output(&output_tx, ControllerOutput::Stopped)?;
                return Ok(());
            }
        }
    }
}

fn timestamp_result(
    active: &ActiveSession,
    received_at: Instant,
    result: InferenceResult,
) -> TimestampedResult {
    let interval = estimate_interval(
        active.clock.elapsed_ms(received_at),
        result.total_latency_ms,
        active.mode,
        active.video_duration_sec,
    );
    TimestampedResult::new(
        active.id,
        result,
        interval,
        chrono::Utc::now().to_rfc3339(),
    )
}

/// Video duration plus a grace long enough for the last in-flight window.
fn auto_stop_delay(video_duration_sec: f64, grace_ms: u64, mode: ProcessingMode) -> Duration {
    let window_ms = (mode.window_seconds() * 1_000.0).ceil() as u64;
    Duration::from_secs_f64(video_duration_sec) + Duration::from_millis(grace_ms.max(window_ms))
}

fn export_ledger<WriteClipboardFn>(
    ledger: &ResultLedger,
    mode: OutputMode,
    output_tx: &Sender<ControllerOutput>,
    write_clipboard: &mut WriteClipboardFn,
) -> AppResult<()>
where
    WriteClipboardFn: FnMut(&str) -> AppResult<()>,
{
    let count = ledger.chronological().len();
    if count == 0 {
        return send_notification(output_tx, "Nothing to export yet.");
    }

    let text = render_export(ledger);
    match mode {
        OutputMode::ClipboardOnly => {
            if let Err(error) = write_clipboard(&text) {
                return send_banner(output_tx, &format!("clipboard export failed: {error}"));
            }
            send_notification(output_tx, &format!("Copied {count} results to clipboard"))?;
        }
        OutputMode::Stdout => {}
        OutputMode::Disabled => {
            return send_notification(output_tx, "Export is disabled by output.mode.");
        }
    }
    send_output(output_tx, ControllerOutput::Exported { count, text })
}

fn send_output(output_tx: &Sender<ControllerOutput>, output: ControllerOutput) -> AppResult<()> {
    output_tx
        .send(output)
        .map_err(|_| {
            AppError::ChannelClosed("controller output channel closed".to_owned())
        })
}

fn send_state(output_tx: &Sender<ControllerOutput>, state: &SessionState) -> AppResult<()> {
    send_output(output_tx, ControllerOutput::StateChanged(state.clone()))
}

fn send_notification(output_tx: &Sender<ControllerOutput>, message: &str) -> AppResult<()> {
    send_output(output_tx, ControllerOutput::Notification(message.to_owned()))
}

fn send_banner(output_tx: &Sender<ControllerOutput>, message: &str) -> AppResult<()> {
    send_output(output_tx, ControllerOutput::Banner(message.to_owned()))
}
