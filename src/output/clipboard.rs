use arboard::Clipboard;

use crate::error::{AppError, AppResult};

trait ClipboardBackend {
    fn set_text(&mut self, text: String) -> Result<(), String>;
}

struct ArboardClipboardBackend {
    inner: Clipboard,
}

impl ClipboardBackend for ArboardClipboardBackend {
    fn set_text(&mut self, text: String) -> Result<(), String> {
        self.inner.set_text(text).map_err(|error| error.to_string())
    }
}

type BackendFactory = Box<dyn FnMut() -> AppResult<Box<dyn ClipboardBackend>>>;

/// System clipboard writer for exports.
///
/// The backend handle is opened on first use and kept for the life of the
/// writer: on X11 and Wayland the copied text vanishes once its owner drops.
pub struct ClipboardOutput {
    backend: Option<Box<dyn ClipboardBackend>>,
    make_backend: BackendFactory,
}

impl ClipboardOutput {
    pub fn system() -> Self {
        Self::with_factory(Box::new(|| {
            let inner = Clipboard::new()
                .map_err(|error| AppError::Clipboard(format!("clipboard init failed: {error}")))?;
            Ok(Box::new(ArboardClipboardBackend { inner }) as Box<dyn ClipboardBackend>)
        }))
    }

    fn with_factory(make_backend: BackendFactory) -> Self {
        Self {
            backend: None,
            make_backend,
        }
    }

    pub fn write_text(&mut self, text: &str) -> AppResult<()> {
        let mut backend = match self.backend.take() {
            Some(backend) => backend,
            None => (self.make_backend)()?,
        };

        match backend.set_text(text.to_owned()) {
            Ok(()) => {
                self.backend = Some(backend);
                Ok(())
            }
            // The handle is dropped so the next export reopens it.
            Err(error) => Err(AppError::Clipboard(format!(
                "clipboard write failed: {error}"
            ))),
        }
    }
}
