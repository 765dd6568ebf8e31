//! Collaborators injected into a refinement session
//!
//! - [`HistoryStore`]: persistence of completed refinements
//! - [`CredentialProvider`]: where the API key comes from
//! - [`Telemetry`]: the event sink (re-exported from [`crate::events`])

mod credential;
mod storage;

pub use credential::{CredentialProvider, EnvCredentials, StaticCredentials};
pub use storage::{HistoryStore, JsonHistoryStore, MemoryHistoryStore, StoreError};

pub use crate::events::{NullTelemetry, Telemetry};
