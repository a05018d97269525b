use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;
use uuid::Uuid;

use crate::config::BackendKind;
use crate::controller::state::SessionState;
use crate::ledger::{InferenceResult, TimestampedResult};

#[derive(Debug, Clone)]
pub enum ControllerEvent {
    Start {
        video: PathBuf,
        backend: BackendKind,
    },
    Stop,
    Clear,
    Export,
    List,
    AutoStopElapsed {
        session_id: Uuid,
    },
    BackendResult {
        session_id: Uuid,
        received_at: Instant,
        result: InferenceResult,
    },
    BackendFault {
        session_id: Uuid,
        message: String,
    },
    Shutdown,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ControllerOutput {
    StateChanged(SessionState),
    Notification(String),
    Banner(String),
    ResultRecorded(TimestampedResult),
    Listing(Vec<TimestampedResult>),
    Exported { count: usize, text: String },
    Stopped,
}
