use std::thread;
use std::time::Duration;

use crossbeam_channel::Sender;
use uuid::Uuid;

use crate::controller::events::ControllerEvent;
use crate::error::{AppError, AppResult};

/// Single deferred `AutoStopElapsed` for one session.
///
/// Dropping or cancelling the timer disconnects its cancel channel, which
/// wakes the timer thread before the deadline.
pub struct AutoStopTimer {
    session_id: Uuid,
    cancel_tx: Option<Sender<()>>,
    join: Option<thread::JoinHandle<()>>,
}

impl AutoStopTimer {
    pub fn arm(
        session_id: Uuid,
        delay: Duration,
        event_tx: Sender<ControllerEvent>,
    ) -> AppResult<Self> {
        let (cancel_tx, cancel_rx) = crossbeam_channel::bounded::<()>(1);
        let join = thread::Builder::new()
            .name("framecast-auto-stop".to_owned())
            .spawn(move || {
                crossbeam_channel::select! {
                    recv(cancel_rx) -> _ => {}
                    recv(crossbeam_channel::after(delay)) -> _ => {
                        let _ = event_tx.send(ControllerEvent::AutoStopElapsed { session_id });
                    }
                }
            })
            .map_err(|error| {
                AppError::Controller(format!("failed to spawn auto-stop timer: {error}"))
            })?;

        tracing::debug!(%session_id, delay_ms = delay.as_millis() as u64, "auto-stop armed");
        Ok(Self {
            session_id,
            cancel_tx: Some(cancel_tx),
            join: Some(join),
        })
    }

    pub fn cancel(mut self) {
        self.disarm();
    }

    fn disarm(&mut self) {
        if let Some(cancel_tx) = self.cancel_tx.take() {
            drop(cancel_tx);
            if let Some(join) = self.join.take() {
                let _ = join.join();
            }
            tracing::debug!(session_id = %self.session_id, "auto-stop disarmed");
        }
    }
}

impl Drop for AutoStopTimer {
    fn drop(&mut self) {
        self.disarm();
    }
}
