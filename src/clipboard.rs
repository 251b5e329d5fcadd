//! Clipboard access

use anyhow::{Context, Result};
use arboard::Clipboard;
use tracing::debug;

/// Text clipboard. Both calls may fail; callers log and carry on.
pub trait ClipboardSource {
    fn read_text(&mut self) -> Result<String>;
    fn write_text(&mut self, text: &str) -> Result<()>;
}

/// The desktop clipboard, opened on first use
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    fn clipboard(&mut self) -> Result<&mut Clipboard> {
        if self.inner.is_none() {
            let clipboard = Clipboard::new().context("Failed to open the system clipboard")?;
            debug!(target: "clipboard", "System clipboard opened");
            self.inner = Some(clipboard);
        }
        self.inner
            .as_mut()
            .context("System clipboard is unavailable")
    }
}

impl ClipboardSource for SystemClipboard {
    fn read_text(&mut self) -> Result<String> {
        let text = self.clipboard()?.get_text();
        match text {
            Ok(text) => Ok(text),
            // Non-text content reads as empty
            Err(arboard::Error::ContentNotAvailable) => Ok(String::new()),
            Err(e) => {
                // Drop the handle so the next read reopens it
                self.inner = None;
                Err(e).context("Failed to read the clipboard")
            }
        }
    }

    fn write_text(&mut self, text: &str) -> Result<()> {
        self.clipboard()?
            .set_text(text.to_string())
            .context("Failed to write to the clipboard")
    }
}
