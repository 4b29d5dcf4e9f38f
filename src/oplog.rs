//! Bounded log of recent operations, served at `GET /logs`
//!
//! [`OpLogLayer`] sits in the tracing subscriber stack and copies every
//! `INFO`-and-above event into the ring.

use std::collections::VecDeque;
use std::fmt::{self, Write as _};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

/// Ring of formatted log lines; the oldest entry goes first once full
#[derive(Clone)]
pub struct OpLog {
    entries: Arc<Mutex<VecDeque<String>>>,
    capacity: usize,
}

impl OpLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<String>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push(&self, line: String) {
        let mut entries = self.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(line);
    }

    /// Entries oldest first
    pub fn snapshot(&self) -> Vec<String> {
        self.lock().iter().cloned().collect()
    }
}

/// Collects an event's message and fields into one line
#[derive(Default)]
struct LineVisitor {
    message: String,
    fields: String,
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

pub struct OpLogLayer {
    log: OpLog,
}

impl OpLogLayer {
    pub fn new(log: OpLog) -> Self {
        Self { log }
    }
}

impl<S: Subscriber> Layer<S> for OpLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let level = *event.metadata().level();
        // More verbose levels compare greater
        if level > Level::INFO {
            return;
        }

        let mut visitor = LineVisitor::default();
        event.record(&mut visitor);

        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();

        self.log.push(format!(
            "{} {:>5} {}{}",
            millis, level, visitor.message, visitor.fields
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::prelude::*;

    #[test]
    fn test_ring_drops_oldest() {
        let log = OpLog::new(3);
        for i in 0..5 {
            log.push(format!("line {}", i));
        }
        assert_eq!(log.snapshot(), vec!["line 2", "line 3", "line 4"]);
    }

    #[test]
    fn test_zero_capacity_keeps_latest() {
        let log = OpLog::new(0);
        log.push("a".into());
        log.push("b".into());
        assert_eq!(log.snapshot(), vec!["b"]);
    }

    #[test]
    fn test_layer_records_info_and_above() {
        let log = OpLog::new(10);
        let subscriber = tracing_subscriber::registry().with(OpLogLayer::new(log.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!("hidden");
            tracing::info!(vehicle = "10.0.0.1:50000", "arm succeeded");
            tracing::warn!("takeoff failed");
        });

        let lines = log.snapshot();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("INFO"));
        assert!(lines[0].contains("arm succeeded vehicle=10.0.0.1:50000"));
        assert!(lines[1].contains("WARN"));
        assert!(lines[1].ends_with("takeoff failed"));
    }
}
