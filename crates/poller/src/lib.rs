//! Polling core: rolling history, independent stream pollers and the
//! orchestrator that composes them.

pub mod buffer;
pub mod orchestrator;
pub mod poller;
pub mod source;

pub use buffer::RollingBuffer;
pub use orchestrator::{OrchestratorStatus, PollingOrchestrator, StreamStatus};
pub use poller::{PollerSnapshot, StreamPoller};
pub use source::StreamSource;
