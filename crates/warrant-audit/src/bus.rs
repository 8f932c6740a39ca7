//! Live event distribution

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::trace;
use warrant_types::{DelegationEvent, EventSink, WarrantConfig};

/// Broadcast bus for live subscribers
///
/// Publishing never blocks. A subscriber that falls more than the buffer
/// behind loses the oldest events and sees `RecvError::Lagged`.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DelegationEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn from_config(config: &WarrantConfig) -> Self {
        Self::new(config.event_buffer)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DelegationEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl EventSink for EventBus {
    fn emit(&self, event: DelegationEvent) {
        // No subscribers is not an error
        if self.sender.send(event).is_err() {
            trace!("event dropped: no subscribers");
        }
    }
}

/// Sink that forwards every event to each of its sinks in order
#[derive(Clone, Default)]
pub struct Fanout {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl Fanout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl EventSink for Fanout {
    fn emit(&self, event: DelegationEvent) {
        if let Some((last, rest)) = self.sinks.split_last() {
            for sink in rest {
                sink.emit(event.clone());
            }
            last.emit(event);
        }
    }
}

impl std::fmt::Debug for Fanout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fanout").field("sinks", &self.sinks.len()).finish()
    }
}
