//! Graphics-context arbitration across render threads.
//!
//! One [`ContextArbiter`] is shared by every render thread that may contend for the same
//! hardware context. Acquisition never blocks: a denied thread queues a "please release"
//! signal for the current owner and retries once it is woken.
//!
//! Signals addressed to *other* render threads are never delivered directly. They are
//! collected in an [`Outbox`] while the caller holds its own view lock and flushed after
//! that lock is dropped, so no thread ever holds two view locks at once.

mod manager;
mod outbox;
mod probe;

pub use manager::{ArbiterClient, ClientId, ContextArbiter, ContextHolder};
pub use outbox::Outbox;
pub use probe::{ArbiterConfig, Capability};
