//! Streamed response writers.
//!
//! Model output arrives as token fragments. The immediate writer forwards
//! each fragment straight to the context; the paced writer queues
//! fragments and a background delivery task emits them one character at a
//! time at a fixed delay. Both accumulate the full text, and both are
//! clean to reuse across turns: a terminal call (`complete`/`error`)
//! drains, hands back the accumulated text, and resets.

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

use crate::interrupt::{self, InterruptedError};
use crate::io::IoContext;

/// Interval at which the delivery task re-checks the done/interrupt state
/// while waiting for fragments.
const DONE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Accumulating writer for one streamed response.
///
/// The generation collaborator calls `write` zero or more times, then
/// exactly one terminal call. `complete` returns the ordered concatenation
/// of everything written since the last reset.
#[derive(Debug)]
pub enum ResponseHandler {
    Immediate(ImmediateWriter),
    Paced(PacedWriter),
}

impl ResponseHandler {
    /// Immediate writer: tokens reach the sink as they arrive.
    pub fn immediate(io: IoContext, color: Option<u8>) -> Self {
        ResponseHandler::Immediate(ImmediateWriter {
            io,
            color,
            buffer: String::new(),
        })
    }

    /// Paced writer: tokens drain through a background delivery task at
    /// one character per `delay_ms` interval.
    pub fn paced(io: IoContext, color: Option<u8>, delay_ms: u64) -> Self {
        ResponseHandler::Paced(PacedWriter {
            io,
            color,
            char_delay: Duration::from_millis(delay_ms),
            buffer: String::new(),
            delivery: None,
        })
    }

    /// Appends a token. Never blocks the caller.
    pub fn write(&mut self, token: &str) {
        match self {
            ResponseHandler::Immediate(w) => w.write(token),
            ResponseHandler::Paced(w) => w.write(token),
        }
    }

    /// Finishes the response: drains pending output, emits the trailing
    /// newline, and returns the accumulated text. The writer is clean for
    /// the next turn afterwards.
    pub async fn complete(&mut self) -> Result<String> {
        match self {
            ResponseHandler::Immediate(w) => w.complete(),
            ResponseHandler::Paced(w) => w.complete().await,
        }
    }

    /// Finishes the response on the error path: drains, then prints an
    /// error line. Resets like `complete`.
    pub async fn error(&mut self, message: &str) -> Result<()> {
        match self {
            ResponseHandler::Immediate(w) => w.error(message),
            ResponseHandler::Paced(w) => w.error(message).await,
        }
    }

    /// Everything written since the last reset.
    ///
    /// `complete()` hands the accumulated text to its caller and resets,
    /// so this reads empty once a terminal call has returned.
    pub fn buffer(&self) -> &str {
        match self {
            ResponseHandler::Immediate(w) => &w.buffer,
            ResponseHandler::Paced(w) => &w.buffer,
        }
    }
}

/// Forwards each token through the context as soon as it is written.
#[derive(Debug)]
pub struct ImmediateWriter {
    io: IoContext,
    color: Option<u8>,
    buffer: String,
}

impl ImmediateWriter {
    fn write(&mut self, token: &str) {
        self.buffer.push_str(token);
        match self.color {
            Some(color) => self.io.print_color(token, color),
            None => self.io.print(token),
        }
    }

    fn complete(&mut self) -> Result<String> {
        self.io.println("");
        Ok(std::mem::take(&mut self.buffer))
    }

    fn error(&mut self, message: &str) -> Result<()> {
        self.io.println("");
        self.io.error(&format!("Error: {message}"));
        self.buffer.clear();
        Ok(())
    }
}

struct Delivery {
    tx: mpsc::UnboundedSender<String>,
    task: JoinHandle<()>,
}

/// Queues tokens and emits them character-by-character from a background
/// task, so slow display pacing never backpressures the producer.
pub struct PacedWriter {
    io: IoContext,
    color: Option<u8>,
    char_delay: Duration,
    buffer: String,
    /// Armed lazily on the first `write` of a cycle; `None` after a
    /// terminal call, so an unused writer leaves no task behind.
    delivery: Option<Delivery>,
}

impl PacedWriter {
    fn write(&mut self, token: &str) {
        self.buffer.push_str(token);
        let delivery = self.delivery.get_or_insert_with(|| {
            spawn_delivery(self.io.clone(), self.color, self.char_delay)
        });
        // Delivery task only exits once the channel closes, so this send
        // cannot fail while `delivery` is set.
        let _ = delivery.tx.send(token.to_string());
    }

    async fn complete(&mut self) -> Result<String> {
        let drained = self.drain().await;
        let text = std::mem::take(&mut self.buffer);
        drained?;
        Ok(text)
    }

    async fn error(&mut self, message: &str) -> Result<()> {
        let drained = self.drain().await;
        self.buffer.clear();
        drained?;
        self.io.error(&format!("Error: {message}"));
        Ok(())
    }

    /// Signals "no more input" by closing the channel, then blocks until
    /// the delivery task has emitted everything plus the trailing newline.
    async fn drain(&mut self) -> Result<()> {
        match self.delivery.take() {
            Some(Delivery { tx, task }) => {
                drop(tx);
                task.await.context("paced delivery task failed")?;
            }
            // Nothing was written this cycle; emit the newline directly.
            None => self.io.println(""),
        }
        if interrupt::is_interrupted() {
            return Err(InterruptedError.into());
        }
        Ok(())
    }
}

impl std::fmt::Debug for PacedWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacedWriter")
            .field("char_delay", &self.char_delay)
            .field("buffered", &self.buffer.len())
            .field("armed", &self.delivery.is_some())
            .finish()
    }
}

/// Starts the per-response delivery task.
///
/// Fragments are polled with a short timeout so the task also observes the
/// interrupt flag while idle. Channel closure is the done signal: the task
/// finishes draining whatever is queued, emits the trailing newline, and
/// exits. On interrupt it exits without the newline.
fn spawn_delivery(io: IoContext, color: Option<u8>, char_delay: Duration) -> Delivery {
    tracing::trace!(?char_delay, "arming paced delivery task");
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let task = tokio::spawn(async move {
        loop {
            match timeout(DONE_POLL_INTERVAL, rx.recv()).await {
                Ok(Some(token)) => {
                    for ch in token.chars() {
                        if interrupt::is_interrupted() {
                            return;
                        }
                        let mut utf8 = [0u8; 4];
                        let text = ch.encode_utf8(&mut utf8);
                        match color {
                            Some(code) => io.print_color(text, code),
                            None => io.print(text),
                        }
                        if !char_delay.is_zero() {
                            sleep(char_delay).await;
                        }
                    }
                }
                // Channel closed and fully drained
                Ok(None) => break,
                Err(_) => {
                    if interrupt::is_interrupted() {
                        return;
                    }
                }
            }
        }
        io.println("");
    });
    Delivery { tx, task }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_immediate_round_trip() {
        let io = IoContext::queued();
        let mut handler = ResponseHandler::immediate(io.clone(), None);

        handler.write("Hello");
        handler.write(", ");
        handler.write("world");
        assert_eq!(handler.buffer(), "Hello, world");

        let text = handler.complete().await.unwrap();
        assert_eq!(text, "Hello, world");
        assert_eq!(io.drain_output(), "Hello, world\n");
    }

    #[tokio::test]
    async fn test_paced_round_trip() {
        let io = IoContext::queued();
        let mut handler = ResponseHandler::paced(io.clone(), None, 0);

        handler.write("one ");
        handler.write("two ");
        handler.write("three");
        assert_eq!(handler.buffer(), "one two three");

        let text = handler.complete().await.unwrap();
        assert_eq!(text, "one two three");
        assert_eq!(io.drain_output(), "one two three\n");
    }

    #[tokio::test]
    async fn test_paced_preserves_order_under_interleaving() {
        let io = IoContext::queued();
        let mut handler = ResponseHandler::paced(io.clone(), None, 0);

        // Interleave writes with scheduler yields so the delivery task
        // drains concurrently with production.
        let mut expected = String::new();
        for i in 0..50 {
            let token = format!("t{i};");
            expected.push_str(&token);
            handler.write(&token);
            if i % 7 == 0 {
                tokio::task::yield_now().await;
            }
        }

        let text = handler.complete().await.unwrap();
        assert_eq!(text, expected);
        assert_eq!(io.drain_output(), format!("{expected}\n"));
    }

    #[tokio::test]
    async fn test_reset_between_turns_leaks_nothing() {
        let io = IoContext::queued();
        let mut handler = ResponseHandler::paced(io.clone(), None, 0);

        handler.write("first turn");
        handler.complete().await.unwrap();
        io.drain_output();

        handler.write("second");
        let text = handler.complete().await.unwrap();
        assert_eq!(text, "second");
        assert_eq!(io.drain_output(), "second\n");
    }

    #[tokio::test]
    async fn test_complete_without_writes_emits_newline() {
        let io = IoContext::queued();
        let mut handler = ResponseHandler::paced(io.clone(), None, 0);

        let text = handler.complete().await.unwrap();
        assert_eq!(text, "");
        assert_eq!(io.drain_output(), "\n");
    }

    #[tokio::test]
    async fn test_paced_emits_single_character_fragments() {
        let io = IoContext::queued();
        let mut handler = ResponseHandler::paced(io.clone(), None, 0);

        handler.write("abc");
        handler.complete().await.unwrap();

        // Each character lands in the sink as its own fragment.
        assert_eq!(io.peek_output(), Some("a".to_string()));
        assert_eq!(io.drain_output(), "abc\n");
    }

    #[tokio::test]
    async fn test_interrupt_ends_delivery_and_propagates() {
        let io = IoContext::queued();
        let mut handler = ResponseHandler::paced(io.clone(), None, 0);

        handler.write("partial");
        interrupt::set_test_override(Some(true));

        let err = handler.complete().await.unwrap_err();
        assert!(err.downcast_ref::<InterruptedError>().is_some());
        // The delivery task wound down without emitting anything further,
        // trailing newline included.
        assert_eq!(io.drain_output(), "");

        // After reset the writer accepts a fresh cycle on a new task.
        interrupt::reset();
        handler.write("next");
        assert_eq!(handler.complete().await.unwrap(), "next");
        assert_eq!(io.drain_output(), "next\n");
    }

    #[tokio::test]
    async fn test_error_drains_then_reports() {
        let io = IoContext::queued();
        let mut handler = ResponseHandler::paced(io.clone(), None, 0);

        handler.write("partial");
        handler.error("model unavailable").await.unwrap();

        let output = io.drain_output();
        assert_eq!(output, "partial\nError: model unavailable\n");
        assert_eq!(handler.buffer(), "");
    }

    #[tokio::test]
    async fn test_immediate_error_reports_after_newline() {
        let io = IoContext::queued();
        let mut handler = ResponseHandler::immediate(io.clone(), None);

        handler.write("part");
        handler.error("boom").await.unwrap();
        assert_eq!(io.drain_output(), "part\nError: boom\n");
        assert_eq!(handler.buffer(), "");
    }
}
