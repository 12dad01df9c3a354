//! Monitoring collaborators
//!
//! Event broadcasting and error reporting consumed by the validator

mod events;
mod reporter;

pub use events::{ChannelEventBus, Event, EventBus, TracingEventBus};
pub use reporter::{ErrorCategory, ErrorContext, ErrorReporter, Severity, TracingErrorReporter};
