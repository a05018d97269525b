use crate::config::OutputMode;
use crate::controller::events::ControllerOutput;
use crate::controller::state::SessionState;
use crate::ledger::TimestampedResult;
use crate::timing::format_interval;

pub fn state_label(state: &SessionState) -> String {
    match state {
        SessionState::Idle => "idle".to_owned(),
        SessionState::Running => "running".to_owned(),
        SessionState::Error(reason) => format!("error ({reason})"),
        SessionState::Done => "done".to_owned(),
    }
}

/// `[0:03–0:08] text`, with failed results shown as `error: …`.
pub fn result_line(entry: &TimestampedResult) -> String {
    let interval = format_interval(&entry.interval());
    if entry.result.ok {
        format!("[{interval}] {}", entry.result.display_text().trim())
    } else {
        format!("[{interval}] error: {}", entry.result.display_text())
    }
}

/// Terminal rendering of one controller output, or `None` when nothing is
/// printed for it.
pub fn render_output(output: &ControllerOutput, mode: OutputMode) -> Option<String> {
    match output {
        ControllerOutput::StateChanged(state) => Some(format!("state: {}", state_label(state))),
        ControllerOutput::Notification(message) => Some(message.clone()),
        ControllerOutput::Banner(message) => Some(format!("! {message}")),
        ControllerOutput::ResultRecorded(entry) => Some(result_line(entry)),
        ControllerOutput::Listing(entries) if entries.is_empty() => {
            Some("(no results yet)".to_owned())
        }
        ControllerOutput::Listing(entries) => Some(
            entries
                .iter()
                .map(result_line)
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        ControllerOutput::Exported { text, .. } if mode == OutputMode::Stdout => {
            Some(text.clone())
        }
        ControllerOutput::Exported { .. } | ControllerOutput::Stopped => None,
    }
}
