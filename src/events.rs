//! Logging capability handed to a [`BucketManager`](crate::BucketManager).
//!
//! The manager never calls a global logger directly; it reports every
//! outcome to an [`EventSink`]. [`TracingSink`] forwards to `tracing`,
//! [`MemorySink`] keeps events around for inspection.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::manager::Operation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub level: Level,
    pub operation: Operation,
    pub bucket: String,
    pub key: Option<String>,
    pub message: String,
}

pub trait EventSink: Send + Sync {
    fn record(&self, event: Event);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: Event) {
        let key = event.key.as_deref().unwrap_or("");
        match event.level {
            Level::Info => tracing::info!(
                operation = event.operation.as_str(),
                bucket = %event.bucket,
                key,
                "{}",
                event.message
            ),
            Level::Error => tracing::error!(
                operation = event.operation.as_str(),
                bucket = %event.bucket,
                key,
                "{}",
                event.message
            ),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<Event>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn errors(&self) -> Vec<Event> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.level == Level::Error)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: Event) {
        self.events.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(level: Level) -> Event {
        Event {
            level,
            operation: Operation::Delete,
            bucket: "b".into(),
            key: Some("k".into()),
            message: "m".into(),
        }
    }

    #[test]
    fn test_memory_sink_shares_events_between_clones() {
        let sink = MemorySink::new();
        let handle = sink.clone();
        sink.record(event(Level::Info));
        handle.record(event(Level::Error));

        assert_eq!(sink.events().len(), 2);
        assert_eq!(sink.errors(), vec![event(Level::Error)]);

        handle.clear();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_tracing_sink_does_not_panic_without_subscriber() {
        TracingSink.record(event(Level::Info));
        TracingSink.record(event(Level::Error));
    }
}
