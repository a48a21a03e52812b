//! Page console capture.
//!
//! Console output is collected per page so a failing scenario can report
//! what the application logged. It is diagnostic only and never decides a
//! verdict.

use chromiumoxide::cdp::js_protocol::runtime::{ConsoleApiCalledType, EventConsoleApiCalled};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};

/// Severity of a console call. APIs without a severity of their own
/// (`table`, `trace`, `dir`...) collapse into `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum ConsoleLevel {
    Debug,
    Log,
    Info,
    Warning,
    Error,
    Other,
}

impl From<&ConsoleApiCalledType> for ConsoleLevel {
    fn from(kind: &ConsoleApiCalledType) -> Self {
        match kind {
            ConsoleApiCalledType::Debug => Self::Debug,
            ConsoleApiCalledType::Log => Self::Log,
            ConsoleApiCalledType::Info => Self::Info,
            ConsoleApiCalledType::Warning => Self::Warning,
            ConsoleApiCalledType::Error | ConsoleApiCalledType::Assert => Self::Error,
            _ => Self::Other,
        }
    }
}

/// One console call as the page made it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleMessage {
    /// Severity of the call.
    pub level: ConsoleLevel,
    /// Arguments joined with spaces; non-string arguments print as `<object>`.
    pub text: String,
    /// `url:line:column` of the first stack frame, when the browser sent one.
    pub source: Option<String>,
}

impl ConsoleMessage {
    /// A message without source location.
    #[must_use]
    pub fn new(level: ConsoleLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
            source: None,
        }
    }
}

impl From<&EventConsoleApiCalled> for ConsoleMessage {
    fn from(event: &EventConsoleApiCalled) -> Self {
        let text = event
            .args
            .iter()
            .map(|arg| arg.value.as_ref().and_then(|v| v.as_str()).unwrap_or("<object>"))
            .collect::<Vec<_>>()
            .join(" ");

        let source = event
            .stack_trace
            .as_ref()
            .and_then(|trace| trace.call_frames.first())
            .map(|frame| format!("{}:{}:{}", frame.url, frame.line_number, frame.column_number));

        Self {
            level: ConsoleLevel::from(&event.r#type),
            text,
            source,
        }
    }
}

/// Append-only message buffer shared between a page's listener task and
/// whoever inspects the page. Clones see the same messages.
#[derive(Debug, Clone, Default)]
pub struct ConsoleCapture {
    messages: Arc<Mutex<Vec<ConsoleMessage>>>,
}

impl ConsoleCapture {
    /// An empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut Vec<ConsoleMessage>) -> R) -> R {
        // A panicking listener leaves the buffer intact; keep reading it.
        let mut guard = self.messages.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    pub(crate) fn record(&self, message: ConsoleMessage) {
        self.with(|messages| messages.push(message));
    }

    /// Every message so far, in arrival order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ConsoleMessage> {
        self.with(|messages| messages.clone())
    }

    /// Error-level messages so far.
    #[must_use]
    pub fn errors(&self) -> Vec<ConsoleMessage> {
        self.with(|messages| {
            messages
                .iter()
                .filter(|m| m.level == ConsoleLevel::Error)
                .cloned()
                .collect()
        })
    }

    /// Number of error-level messages so far.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.with(|messages| {
            messages
                .iter()
                .filter(|m| m.level == ConsoleLevel::Error)
                .count()
        })
    }
}
