//! Event bus for live observability of refinement sessions
//!
//! Every significant step of an orchestration records an event through the
//! [`Telemetry`] trait. The production sink is the [`EventBus`], a tokio
//! broadcast channel; consumers (the terminal front end, the JSONL
//! [`EventLogger`]) subscribe to it.
//!
//! ```text
//!   RefinementSession      RetryController      repair pipeline
//!   - SessionChanged       - AttemptStarted     - RepairStage
//!   - RequestBuilt         - AttemptFailed
//!   - ResultReady          - RetryScheduled
//!   - HistorySaved
//!              \                 |                 /
//!               +------------ EventBus -----------+
//!                           /          \
//!                 front end             events/{session}/events.jsonl
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use refiner::events::{EventEmitter, create_event_bus};
//!
//! let bus = create_event_bus();
//! let emitter = EventEmitter::new(bus.clone(), "session-123");
//! emitter.attempt_started(1, 3);
//!
//! let mut rx = bus.subscribe();
//! while let Ok(event) = rx.recv().await {
//!     println!("{:?}", event);
//! }
//! ```

mod bus;
mod logger;
mod types;

#[cfg(test)]
pub use bus::recording;
pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventBus, EventEmitter, NullTelemetry, Telemetry, create_event_bus};
pub use logger::{EventLogger, read_session_events, spawn_event_logger};
pub use types::{Event, EventLogEntry};
