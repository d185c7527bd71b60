//! Vellum engine crate.
//!
//! This crate owns a dedicated render thread per view, the arbiter that hands out the
//! (possibly scarce) graphics context across render threads, and the blocking lifecycle
//! surface the owning thread uses to drive it.

pub mod arbiter;
pub mod core;
pub mod device;
pub mod thread;
pub mod time;
pub mod view;

pub mod logging;

#[cfg(test)]
mod testing;
