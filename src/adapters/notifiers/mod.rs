//! Escalation notifier adapters.

pub mod logging;
pub mod recording;

pub use logging::TracingNotifier;
pub use recording::RecordingNotifier;
