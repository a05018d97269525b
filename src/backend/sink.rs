use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::Sender;
use uuid::Uuid;

use crate::controller::events::ControllerEvent;
use crate::ledger::InferenceResult;

/// Per-session delivery handle a backend uses to report results and faults.
///
/// Every event is tagged with the session id. Once closed, deliveries are
/// dropped at the source so a backend thread that outlives its session can
/// never reach the controller.
#[derive(Debug, Clone)]
pub struct SessionSink {
    session_id: Uuid,
    event_tx: Sender<ControllerEvent>,
    open: Arc<AtomicBool>,
}

impl SessionSink {
    pub fn new(session_id: Uuid, event_tx: Sender<ControllerEvent>) -> Self {
        Self {
            session_id,
            event_tx,
            open: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    /// Returns `false` when the result was dropped.
    pub fn deliver(&self, result: InferenceResult) -> bool {
        if !self.is_open() {
            tracing::debug!(session_id = %self.session_id, "dropping result from closed session");
            return false;
        }
        self.event_tx
            .send(ControllerEvent::BackendResult {
                session_id: self.session_id,
                received_at: Instant::now(),
                result,
            })
            .is_ok()
    }

    pub fn fault(&self, message: impl Into<String>) -> bool {
        if !self.is_open() {
            return false;
        }
        self.event_tx
            .send(ControllerEvent::BackendFault {
                session_id: self.session_id,
                message: message.into(),
            })
            .is_ok()
    }
}
