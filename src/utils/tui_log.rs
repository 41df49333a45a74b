//! TUI-aware logging
//!
//! While the review screen owns the terminal, log lines written to stderr
//! would corrupt it. The layer here drops events while the screen is active
//! and keeps warnings so the screen can show them in its status line.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::Level;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

/// Keep at most this many captured warnings
const CAPTURE_LIMIT: usize = 32;

/// Shared switch between the logging layer and the review screen
#[derive(Debug, Clone, Default)]
pub struct TuiSwitch {
    active: Arc<AtomicBool>,
    captured: Arc<Mutex<Vec<String>>>,
}

impl TuiSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_active(&self, enabled: bool) {
        self.active.store(enabled, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Take every warning captured while the screen was active
    pub fn drain(&self) -> Vec<String> {
        match self.captured.lock() {
            Ok(mut captured) => std::mem::take(&mut *captured),
            Err(_) => Vec::new(),
        }
    }

    fn capture(&self, message: String) {
        if let Ok(mut captured) = self.captured.lock() {
            if captured.len() >= CAPTURE_LIMIT {
                captured.remove(0);
            }
            captured.push(message);
        }
    }
}

/// Forwards to the inner layer only while the review screen is inactive
pub struct ConditionalStderrLayer<L> {
    inner: L,
    switch: TuiSwitch,
}

impl<L> ConditionalStderrLayer<L> {
    pub fn new(inner: L, switch: TuiSwitch) -> Self {
        Self { inner, switch }
    }
}

impl<S, L> Layer<S> for ConditionalStderrLayer<L>
where
    S: tracing::Subscriber,
    L: Layer<S>,
{
    fn on_event(&self, event: &tracing::Event<'_>, ctx: Context<'_, S>) {
        if !self.switch.is_active() {
            self.inner.on_event(event, ctx);
            return;
        }
        if *event.metadata().level() <= Level::WARN {
            let mut visitor = MessageVisitor::default();
            event.record(&mut visitor);
            self.switch.capture(visitor.message);
        }
    }

    // span bookkeeping is forwarded even while the screen is active
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        id: &tracing::span::Id,
        ctx: Context<'_, S>,
    ) {
        self.inner.on_new_span(attrs, id, ctx);
    }

    fn on_record(&self, id: &tracing::span::Id, values: &tracing::span::Record<'_>, ctx: Context<'_, S>) {
        self.inner.on_record(id, values, ctx);
    }

    fn on_close(&self, id: tracing::span::Id, ctx: Context<'_, S>) {
        self.inner.on_close(id, ctx);
    }

    fn on_enter(&self, id: &tracing::span::Id, ctx: Context<'_, S>) {
        if !self.switch.is_active() {
            self.inner.on_enter(id, ctx);
        }
    }

    fn on_exit(&self, id: &tracing::span::Id, ctx: Context<'_, S>) {
        if !self.switch.is_active() {
            self.inner.on_exit(id, ctx);
        }
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        } else {
            let _ = write!(self.message, " {}={:?}", field.name(), value);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.message, " {}={}", field.name(), value);
        }
    }
}
