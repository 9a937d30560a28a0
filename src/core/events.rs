// ─── Launch Events ───
// Observer interface for progress, diagnostics and game output.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::mpsc;

/// Payload emitted after each file of a download batch completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadProgress {
    pub category: String,
    pub completed: usize,
    pub total: usize,
}

/// Everything an invocation reports back to its caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LaunchEvent {
    Progress(DownloadProgress),
    Debug { message: String },
    /// The fully assembled command line, program excluded.
    Arguments { args: Vec<String> },
    /// One decoded chunk of process stdout/stderr.
    Data { text: String },
    Close { code: i32 },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: LaunchEvent);

    fn progress(&self, category: &str, completed: usize, total: usize) {
        self.emit(LaunchEvent::Progress(DownloadProgress {
            category: category.to_string(),
            completed,
            total,
        }));
    }

    fn debug(&self, message: String) {
        tracing::debug!("{}", message);
        self.emit(LaunchEvent::Debug { message });
    }
}

pub type SharedSink = Arc<dyn EventSink>;

/// Drops every event.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: LaunchEvent) {}
}

/// Forwards events into an unbounded tokio channel.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<LaunchEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<LaunchEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: LaunchEvent) {
        // Receiver gone means nobody is listening anymore.
        let _ = self.tx.send(event);
    }
}

/// Keeps every event in memory. Handy for audits and tests.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<LaunchEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<LaunchEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// `completed` values reported for one category, in emission order.
    pub fn progress_for(&self, category: &str) -> Vec<(usize, usize)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                LaunchEvent::Progress(p) if p.category == category => Some((p.completed, p.total)),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: LaunchEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_sink_delivers_in_order() {
        let (sink, mut rx) = ChannelSink::new();
        sink.progress("assets", 1, 2);
        sink.emit(LaunchEvent::Close { code: 0 });

        assert_eq!(
            rx.recv().await,
            Some(LaunchEvent::Progress(DownloadProgress {
                category: "assets".into(),
                completed: 1,
                total: 2,
            }))
        );
        assert_eq!(rx.recv().await, Some(LaunchEvent::Close { code: 0 }));
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(LaunchEvent::Close { code: 1 }).unwrap();
        assert_eq!(json, serde_json::json!({"type": "close", "code": 1}));
    }
}
