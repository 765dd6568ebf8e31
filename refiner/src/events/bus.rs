//! Event Bus - pub/sub for refinement events
//!
//! The EventBus uses a tokio broadcast channel to deliver events to all
//! subscribers. Components record events through the [`Telemetry`] trait;
//! consumers (front end, JSONL logger) subscribe.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

use super::types::Event;

/// Default channel capacity (events)
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1_024;

/// Sink for orchestration events.
///
/// Recording must never block and never fail the caller.
pub trait Telemetry: Send + Sync {
    fn record(&self, event: Event);
}

/// Telemetry sink that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTelemetry;

impl Telemetry for NullTelemetry {
    fn record(&self, _event: Event) {}
}

/// Central event bus
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new event bus with the given capacity
    pub fn new(capacity: usize) -> Self {
        debug!(capacity, "EventBus::new: creating event bus");
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Create a new event bus with default capacity
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Emit an event to all subscribers
    ///
    /// Fire-and-forget: with no subscribers the event is dropped; a full
    /// channel drops its oldest events.
    pub fn emit(&self, event: Event) {
        debug!(
            event_type = event.event_type(),
            session_id = event.session_id(),
            "EventBus::emit"
        );
        let _ = self.tx.send(event);
    }

    /// Subscribe to events emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        debug!("EventBus::subscribe: new subscriber");
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

impl Telemetry for EventBus {
    fn record(&self, event: Event) {
        self.emit(event);
    }
}

/// Create a shared event bus
pub fn create_event_bus() -> Arc<EventBus> {
    Arc::new(EventBus::with_default_capacity())
}

/// Handle bound to one session
///
/// Cheap to clone; stamps the session ID on every event it records.
#[derive(Clone)]
pub struct EventEmitter {
    sink: Arc<dyn Telemetry>,
    session_id: String,
}

impl EventEmitter {
    pub fn new(sink: Arc<dyn Telemetry>, session_id: impl Into<String>) -> Self {
        Self {
            sink,
            session_id: session_id.into(),
        }
    }

    /// Emitter that records nothing
    pub fn disabled() -> Self {
        Self::new(Arc::new(NullTelemetry), "")
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Record a raw event
    pub fn emit(&self, event: Event) {
        self.sink.record(event);
    }

    // === Convenience methods ===

    pub fn session_changed(&self, state: &str, round: u32) {
        self.emit(Event::SessionChanged {
            session_id: self.session_id.clone(),
            state: state.to_string(),
            round,
        });
    }

    pub fn request_built(&self, round: u32, instruction_len: usize, text_len: usize) {
        self.emit(Event::RequestBuilt {
            session_id: self.session_id.clone(),
            round,
            instruction_len,
            text_len,
        });
    }

    pub fn attempt_started(&self, attempt: u32, max_attempts: u32) {
        self.emit(Event::AttemptStarted {
            session_id: self.session_id.clone(),
            attempt,
            max_attempts,
        });
    }

    pub fn retry_scheduled(&self, attempt: u32, delay_ms: u64, retryable: bool) {
        self.emit(Event::RetryScheduled {
            session_id: self.session_id.clone(),
            attempt,
            delay_ms,
            retryable,
        });
    }

    pub fn attempt_failed(&self, attempt: u32, kind: &str, retryable: bool, message: &str) {
        self.emit(Event::AttemptFailed {
            session_id: self.session_id.clone(),
            attempt,
            kind: kind.to_string(),
            retryable,
            message: message.to_string(),
        });
    }

    pub fn repair_stage(&self, stage: &str, outcome: &str, detail: &str) {
        self.emit(Event::RepairStage {
            session_id: self.session_id.clone(),
            stage: stage.to_string(),
            outcome: outcome.to_string(),
            detail: detail.to_string(),
        });
    }

    pub fn result_ready(&self, status: &str) {
        self.emit(Event::ResultReady {
            session_id: self.session_id.clone(),
            status: status.to_string(),
        });
    }

    pub fn history_saved(&self, id: &str, entries: usize) {
        self.emit(Event::HistorySaved {
            session_id: self.session_id.clone(),
            id: id.to_string(),
            entries,
        });
    }
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter").field("session_id", &self.session_id).finish()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    #[tokio::test]
    async fn test_event_bus_emit_receive() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit(Event::ResultReady {
            session_id: "s-123".to_string(),
            status: "refining".to_string(),
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.session_id(), "s-123");
        assert_eq!(event.event_type(), "ResultReady");
    }

    #[tokio::test]
    async fn test_event_bus_no_subscribers() {
        let bus = EventBus::new(16);
        bus.record(Event::ResultReady {
            session_id: "s".to_string(),
            status: "complete".to_string(),
        });
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_emitter_stamps_session_id() {
        let bus = create_event_bus();
        let mut rx = bus.subscribe();
        let emitter = EventEmitter::new(bus.clone(), "s-456");

        emitter.session_changed("loading", 1);
        emitter.request_built(1, 900, 120);
        emitter.attempt_started(1, 3);
        emitter.attempt_failed(1, "network", true, "connection reset");
        emitter.retry_scheduled(2, 1000, true);
        emitter.repair_stage("parse", "accepted", "");
        emitter.result_ready("refining");
        emitter.history_saved("h-1", 1);

        for _ in 0..8 {
            let event = rx.recv().await.unwrap();
            assert_eq!(event.session_id(), "s-456");
        }
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_disabled_emitter_drops_events() {
        let emitter = EventEmitter::disabled();
        emitter.result_ready("complete");
        assert_eq!(emitter.session_id(), "");
    }

    #[test]
    fn test_recording_telemetry() {
        let sink = Arc::new(recording::RecordingTelemetry::default());
        let emitter = EventEmitter::new(sink.clone(), "rec");
        emitter.session_changed("idle", 1);
        emitter.result_ready("complete");
        assert_eq!(sink.types(), vec!["SessionChanged", "ResultReady"]);
    }
}
