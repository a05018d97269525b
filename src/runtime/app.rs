use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TryRecvError};

use crate::bootstrap::AppPaths;
use crate::config::{AppConfig, BackendKind, OutputMode, VisionMode};
use crate::controller::events::{ControllerEvent, ControllerOutput};
use crate::controller::state::SessionState;
use crate::controller::{run_controller_loop, ControllerContext};
use crate::error::{AppError, AppResult};
use crate::runtime::topology::RuntimeTopology;
use crate::ui::console::render_output;
use crate::ui::{ConsoleCommand, Notifier};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub fn run_watch(
    config: AppConfig,
    paths: AppPaths,
    video: PathBuf,
    exit_when_done: bool,
) -> AppResult<()> {
    paths.ensure_dirs()?;

    let RuntimeTopology {
        controller_event_tx,
        controller_event_rx,
        controller_output_tx,
        controller_output_rx,
    } = RuntimeTopology::new();
    let controller_context = ControllerContext {
        config: config.clone(),
        paths: paths.clone(),
    };
    let controller_event_tx_for_loop = controller_event_tx.clone();
    let (controller_result_tx, controller_result_rx) = crossbeam_channel::bounded(1);

    let mut controller_join = Some(
        thread::Builder::new()
            .name("framecast-controller".to_owned())
            .spawn(move || {
                let result = run_controller_loop(
                    controller_context,
                    controller_event_rx,
                    controller_event_tx_for_loop,
                    controller_output_tx,
                );
                let _ = controller_result_tx.send(result);
            })
            .map_err(|error| {
                AppError::Controller(format!("failed to spawn controller: {error}"))
            })?,
    );

    let notifier = Notifier::new(config.output.enable_notifications);
    let output_mode = config.output.mode;
    let backend = config.session.backend;

    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_flag = interrupted.clone();
    ctrlc::set_handler(move || {
        interrupted_flag.store(true, Ordering::SeqCst);
    })
    .map_err(|error| AppError::Controller(format!("failed to register ctrl-c handler: {error}")))?;

    spawn_stdin_command_thread(controller_event_tx.clone(), video.clone(), backend)?;
    eprintln!("commands: start, stop, clear, export, list, quit");

    if config.session.start_immediately {
        let _ = controller_event_tx.send(ControllerEvent::Start {
            video: video.clone(),
            backend,
        });
    }

    let mut stopping = false;
    let mut exit_error: Option<AppError> = None;

    loop {
        if !stopping && interrupted.load(Ordering::SeqCst) {
            stopping = true;
            let _ = controller_event_tx.send(ControllerEvent::Shutdown);
        }

        loop {
            match controller_output_rx.try_recv() {
                Ok(ControllerOutput::Stopped) => {
                    join_controller(controller_join.take(), &controller_result_rx)?;
                    return match exit_error {
                        Some(error) => Err(error),
                        None => Ok(()),
                    };
                }
                Ok(output) => {
                    if let Some(line) = render_output(&output, output_mode) {
                        println!("{line}");
                    }
                    match &output {
                        ControllerOutput::Banner(message) => notifier.banner(message),
                        ControllerOutput::StateChanged(state) if exit_when_done && !stopping => {
                            let follow_up =
                                exit_follow_up(state, config.output.export_on_done, output_mode);
                            if !follow_up.is_empty() {
                                stopping = true;
                                if let SessionState::Error(reason) = state {
                                    exit_error = Some(AppError::Session(reason.clone()));
                                }
                                for event in follow_up {
                                    let _ = controller_event_tx.send(event);
                                }
                            }
                        }
                        _ => {}
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    let loop_result = controller_result_rx.try_recv().ok().unwrap_or_else(|| {
                        Err(AppError::Controller(
                            "controller output channel disconnected".to_owned(),
                        ))
                    });
                    join_thread(controller_join.take())?;
                    return loop_result;
                }
            }
        }

        match controller_result_rx.try_recv() {
            Ok(loop_result) => {
                join_thread(controller_join.take())?;
                return match loop_result {
                    Ok(()) => Err(AppError::Controller(
                        "controller loop exited without stop signal".to_owned(),
                    )),
                    Err(error) => Err(error),
                };
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                return Err(AppError::Controller(
                    "controller result channel disconnected".to_owned(),
                ))
            }
        }

        thread::sleep(POLL_INTERVAL);
    }
}

/// Events `--exit-when-done` sends once a session settles. Empty while the
/// session is still going.
fn exit_follow_up(
    state: &SessionState,
    export_on_done: bool,
    output_mode: OutputMode,
) -> Vec<ControllerEvent> {
    match state {
        SessionState::Done if export_on_done || output_mode == OutputMode::Disabled => {
            vec![ControllerEvent::Shutdown]
        }
        SessionState::Done => vec![ControllerEvent::Export, ControllerEvent::Shutdown],
        SessionState::Error(_) => vec![ControllerEvent::Shutdown],
        SessionState::Idle | SessionState::Running => Vec::new(),
    }
}

fn join_thread(join: Option<JoinHandle<()>>) -> AppResult<()> {
    let join = join.ok_or_else(|| {
        AppError::Controller("controller thread already joined".to_owned())
    })?;
    join.join()
        .map_err(|_| AppError::Controller("controller thread panicked".to_owned()))
}

fn join_controller(
    join: Option<JoinHandle<()>>,
    result_rx: &Receiver<AppResult<()>>,
) -> AppResult<()> {
    let join_result = join_thread(join);
    let loop_result = result_rx.recv().map_err(|_| {
        AppError::Controller("controller result channel closed before completion".to_owned())
    })?;
    join_result?;
    loop_result
}

fn spawn_stdin_command_thread(
    event_tx: Sender<ControllerEvent>,
    video: PathBuf,
    backend: BackendKind,
) -> AppResult<()> {
    thread::Builder::new()
        .name("framecast-stdin".to_owned())
        .spawn(move || {
            use std::io::{self, BufRead};

            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let Some(command) = ConsoleCommand::parse(&line) else {
                    eprintln!("unknown command `{}`", line.trim());
                    continue;
                };
                let event = command_event(command, &video, backend);
                let quitting = matches!(event, ControllerEvent::Shutdown);
                if event_tx.send(event).is_err() || quitting {
                    break;
                }
            }
        })
        .map(|_| ())
        .map_err(|error| AppError::Controller(format!("failed to spawn stdin thread: {error}")))
}

fn command_event(command: ConsoleCommand, video: &Path, backend: BackendKind) -> ControllerEvent {
    match command {
        ConsoleCommand::Start => ControllerEvent::Start {
            video: video.to_path_buf(),
            backend,
        },
        ConsoleCommand::Stop => ControllerEvent::Stop,
        ConsoleCommand::Clear => ControllerEvent::Clear,
        ConsoleCommand::Export => ControllerEvent::Export,
        ConsoleCommand::List => ControllerEvent::List,
        ConsoleCommand::Quit => ControllerEvent::Shutdown,
    }
}

pub fn status_report(config: &AppConfig, paths: &AppPaths) -> String {
    let (endpoint, model, key_set) = match config.session.backend {
        BackendKind::Vision => (
            &config.vision.endpoint,
            &config.vision.model,
            config.vision.api_key.is_some(),
        ),
        BackendKind::Live => (
            &config.live.endpoint,
            &config.live.model,
            config.live.api_key.is_some(),
        ),
    };
    let (backend, mode) = match config.session.backend {
        BackendKind::Vision => (
            "vision",
            match config.vision.mode {
                VisionMode::Windowed => {
                    format!("windowed {}s clips", config.vision.clip_length_seconds)
                }
                VisionMode::Point => "point".to_owned(),
            },
        ),
        BackendKind::Live => ("live", format!("every {} ms", config.live.frame_interval_ms)),
    };
    let output_mode = match config.output.mode {
        OutputMode::ClipboardOnly => "clipboard_only",
        OutputMode::Stdout => "stdout",
        OutputMode::Disabled => "disabled",
    };

    let mut output = String::new();
    output.push_str("framecast status\n");
    output.push_str(&format!("  config: {}\n", paths.config_file.display()));
    output.push_str(&format!("  clips_dir: {}\n", paths.clips_dir.display()));
    output.push_str(&format!("  backend: {backend}\n"));
    output.push_str(&format!("  endpoint: {endpoint}\n"));
    output.push_str(&format!("  model: {model}\n"));
    output.push_str(&format!("  mode: {mode}\n"));
    output.push_str(&format!(
        "  api_key: {}\n",
        if key_set { "set" } else { "unset" }
    ));
    output.push_str(&format!("  output: {output_mode}\n"));
    for binary in [&config.media.ffmpeg_binary, &config.media.ffprobe_binary] {
        let location = match which::which(binary) {
            Ok(path) => path.display().to_string(),
            Err(_) => "not found".to_owned(),
        };
        output.push_str(&format!("  {binary}: {location}\n"));
    }

    output
}
