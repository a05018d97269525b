use notify_rust::Notification;

const APP_NAME: &str = "framecast";

/// Desktop notifications for session banners. Delivery is best-effort.
#[derive(Debug, Clone)]
pub struct Notifier {
    enabled: bool,
}

impl Notifier {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn banner(&self, body: &str) {
        if !self.enabled {
            return;
        }

        if let Err(error) = Notification::new()
            .appname(APP_NAME)
            .summary(APP_NAME)
            .body(body)
            .show()
        {
            tracing::debug!("desktop notification failed: {error}");
        }
    }
}
