//! Per-session I/O context.
//!
//! One contract, two backends: a real terminal (blocking, styled) and an
//! in-process message queue (non-blocking, plain). Every read passes the
//! context's input filter and every write passes its output filter — the
//! context owns exactly one active [`SecurityFilter`] at a time.

pub mod queued;
pub mod terminal;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use anyhow::Result;

use crate::config::ColorsConfig;
use crate::filter::SecurityFilter;
use crate::stream::ResponseHandler;
use crate::tools::ToolRequest;

use queued::QueuedBackend;
use terminal::TerminalBackend;

/// Named output styles, overridable per-name from the `[colors]` config
/// table (ANSI 256-color codes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStyle {
    Plain,
    Error,
    Warning,
    Success,
    Info,
    Agent,
    Prompt,
    Security,
    Command,
}

impl OutputStyle {
    /// Lowercase name used for config overrides.
    pub fn name(self) -> &'static str {
        match self {
            OutputStyle::Plain => "plain",
            OutputStyle::Error => "error",
            OutputStyle::Warning => "warning",
            OutputStyle::Success => "success",
            OutputStyle::Info => "info",
            OutputStyle::Agent => "agent",
            OutputStyle::Prompt => "prompt",
            OutputStyle::Security => "security",
            OutputStyle::Command => "command",
        }
    }

    /// Default ANSI color code, where the style has one.
    fn default_color(self) -> Option<u8> {
        match self {
            OutputStyle::Plain | OutputStyle::Agent => None,
            OutputStyle::Error | OutputStyle::Security => Some(1),
            OutputStyle::Warning => Some(3),
            OutputStyle::Success => Some(2),
            OutputStyle::Info => Some(6),
            OutputStyle::Prompt => Some(4),
            OutputStyle::Command => Some(5),
        }
    }

    /// Bold styles.
    fn bold(self) -> bool {
        matches!(self, OutputStyle::Prompt | OutputStyle::Security)
    }
}

enum Backend {
    Terminal(TerminalBackend),
    Queued(QueuedBackend),
}

struct Shared {
    backend: Backend,
    filter: RwLock<SecurityFilter>,
    /// Serializes interactive approval prompts (spec: no interleaving).
    approval_gate: tokio::sync::Mutex<()>,
    closed: AtomicBool,
}

/// Cheaply cloneable handle to a session's I/O boundary.
///
/// Response handlers hold a clone so streamed output keeps flowing through
/// the same filter and sink as direct prints.
#[derive(Clone)]
pub struct IoContext {
    shared: Arc<Shared>,
}

impl IoContext {
    /// Opens a terminal-backed context.
    ///
    /// Fails when stdin is not attached to a terminal; the caller treats
    /// this as fatal at startup.
    pub fn terminal(colors: ColorsConfig) -> Result<Self> {
        let backend = TerminalBackend::open(colors)?;
        Ok(Self::from_backend(Backend::Terminal(backend)))
    }

    /// Creates a queue-backed context for in-process hosts.
    pub fn queued() -> Self {
        Self::from_backend(Backend::Queued(QueuedBackend::new()))
    }

    fn from_backend(backend: Backend) -> Self {
        Self {
            shared: Arc::new(Shared {
                backend,
                filter: RwLock::new(SecurityFilter::identity()),
                approval_gate: tokio::sync::Mutex::new(()),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Returns a clone of the active security filter.
    pub fn filter(&self) -> SecurityFilter {
        self.shared
            .filter
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Replaces the active security filter.
    pub fn set_filter(&self, filter: SecurityFilter) {
        *self
            .shared
            .filter
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = filter;
    }

    /// Sets the terminal prompt cursor. No-op for queued contexts.
    pub fn set_cursor(&self, cursor: impl Into<String>, color: Option<u8>) {
        if let Backend::Terminal(term) = &self.shared.backend {
            term.set_cursor(cursor.into(), color);
        }
    }

    /// Reads one filtered input unit.
    ///
    /// Terminal: blocks for a line (using `prompt`, or the configured
    /// cursor when `None`); `/clear` and `/cls` are handled locally and the
    /// read repeats; EOF yields a synthetic `"/exit"`. Queued: pops the
    /// inbound queue, `None` when empty.
    pub fn read(&self, prompt: Option<&str>) -> Option<String> {
        let raw = match &self.shared.backend {
            Backend::Terminal(term) => loop {
                let Some(line) = term.read_line(prompt) else {
                    // EOF / Ctrl-D: behave as an exit command
                    return Some("/exit".to_string());
                };
                let lowered = line.trim().to_lowercase();
                if lowered == "/clear"
                    || lowered == "/cls"
                    || lowered.starts_with("/clear ")
                    || lowered.starts_with("/cls ")
                {
                    term.clear_screen();
                    continue;
                }
                break line;
            },
            Backend::Queued(queue) => queue.pop_input()?,
        };

        Some(self.filter().apply_input(raw, self))
    }

    /// Routes a tool request through the active tool filter.
    pub fn filter_tool(&self, request: ToolRequest) -> ToolRequest {
        self.filter().apply_tool(request, self)
    }

    /// Writes filtered text without a newline.
    pub fn print(&self, text: &str) {
        let filtered = self.filter().apply_output(text.to_string());
        match &self.shared.backend {
            Backend::Terminal(term) => term.write(&filtered, None, false),
            Backend::Queued(queue) => queue.push_output(filtered),
        }
    }

    /// Writes filtered text without a newline, in the given ANSI color.
    pub fn print_color(&self, text: &str, color: u8) {
        let filtered = self.filter().apply_output(text.to_string());
        match &self.shared.backend {
            Backend::Terminal(term) => term.write(&filtered, Some(color), false),
            // Queued contexts carry no styling
            Backend::Queued(queue) => queue.push_output(filtered),
        }
    }

    /// Writes a filtered line.
    pub fn println(&self, text: &str) {
        let filtered = self.filter().apply_output(text.to_string());
        match &self.shared.backend {
            Backend::Terminal(term) => {
                term.write(&filtered, None, false);
                term.write("\n", None, false);
            }
            Backend::Queued(queue) => queue.push_output(format!("{filtered}\n")),
        }
    }

    /// Writes a filtered line in the given ANSI color.
    pub fn println_color(&self, text: &str, color: u8) {
        let filtered = self.filter().apply_output(text.to_string());
        match &self.shared.backend {
            Backend::Terminal(term) => {
                term.write(&filtered, Some(color), false);
                term.write("\n", None, false);
            }
            Backend::Queued(queue) => queue.push_output(format!("{filtered}\n")),
        }
    }

    /// Writes a filtered line with a named style.
    pub fn println_styled(&self, text: &str, style: OutputStyle) {
        let filtered = self.filter().apply_output(text.to_string());
        match &self.shared.backend {
            Backend::Terminal(term) => {
                let color = term.style_color(style);
                term.write(&filtered, color, style.bold());
                term.write("\n", None, false);
            }
            Backend::Queued(queue) => queue.push_output(format!("{filtered}\n")),
        }
    }

    pub fn error(&self, message: &str) {
        self.println_styled(message, OutputStyle::Error);
    }

    pub fn warn(&self, message: &str) {
        self.println_styled(message, OutputStyle::Warning);
    }

    pub fn info(&self, message: &str) {
        self.println_styled(message, OutputStyle::Info);
    }

    pub fn success(&self, message: &str) {
        self.println_styled(message, OutputStyle::Success);
    }

    pub fn security_alert(&self, message: &str) {
        self.println_styled(message, OutputStyle::Security);
    }

    /// Creates a response handler for one streamed response.
    ///
    /// Zero delay returns the immediate writer; otherwise the paced writer
    /// delivering one character per `delay_ms` interval.
    pub fn create_response_handler(&self, color: Option<u8>, delay_ms: u64) -> ResponseHandler {
        if delay_ms > 0 {
            ResponseHandler::paced(self.clone(), color, delay_ms)
        } else {
            ResponseHandler::immediate(self.clone(), color)
        }
    }

    /// Gate used to serialize approval prompts against this context.
    pub(crate) fn approval_gate(&self) -> &tokio::sync::Mutex<()> {
        &self.shared.approval_gate
    }

    // === Queued-backend host accessors ===

    /// Enqueues a line of inbound input. No-op for terminal contexts.
    pub fn push_input(&self, line: impl Into<String>) {
        if let Backend::Queued(queue) = &self.shared.backend {
            queue.push_input(line.into());
        }
    }

    /// Drains and concatenates all pending outbound text.
    pub fn drain_output(&self) -> String {
        match &self.shared.backend {
            Backend::Queued(queue) => queue.drain_output(),
            Backend::Terminal(_) => String::new(),
        }
    }

    /// Peeks at the oldest pending outbound fragment without removing it.
    pub fn peek_output(&self) -> Option<String> {
        match &self.shared.backend {
            Backend::Queued(queue) => queue.peek_output(),
            Backend::Terminal(_) => None,
        }
    }

    /// Releases the context. Idempotent.
    pub fn close(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Backend::Queued(queue) = &self.shared.backend {
            queue.clear();
        }
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for IoContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend = match &self.shared.backend {
            Backend::Terminal(_) => "terminal",
            Backend::Queued(_) => "queued",
        };
        f.debug_struct("IoContext")
            .field("backend", &backend)
            .field("closed", &self.is_closed())
            .finish()
    }
}
