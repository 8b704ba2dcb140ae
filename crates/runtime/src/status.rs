use std::fmt;

use crate::frame::Frame;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Loading,
    Success,
    Warning,
    Error,
}

impl Severity {
    /// CSS-friendly class name (`status success`, `status error`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Loading => "loading",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One user-facing status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub frame_index: u64,
    pub severity: Severity,
    pub message: String,
}

/// Ordered record of status messages shown to the user.
///
/// Every message is mirrored to `tracing` at a matching level.
#[derive(Debug, Default)]
pub struct StatusBus {
    messages: Vec<StatusMessage>,
}

impl StatusBus {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    pub fn emit(&mut self, frame: Frame, severity: Severity, message: impl Into<String>) {
        let message = message.into();
        match severity {
            Severity::Error => tracing::error!(frame = frame.index, "{message}"),
            Severity::Warning => tracing::warn!(frame = frame.index, "{message}"),
            Severity::Loading => tracing::debug!(frame = frame.index, "{message}"),
            Severity::Info | Severity::Success => tracing::info!(frame = frame.index, "{message}"),
        }
        self.messages.push(StatusMessage {
            frame_index: frame.index,
            severity,
            message,
        });
    }

    /// The message currently on screen.
    pub fn latest(&self) -> Option<&StatusMessage> {
        self.messages.last()
    }

    pub fn messages(&self) -> &[StatusMessage] {
        &self.messages
    }

    pub fn drain(&mut self) -> Vec<StatusMessage> {
        std::mem::take(&mut self.messages)
    }
}
