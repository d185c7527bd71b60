//! Owning-thread lifecycle surface.
//!
//! [`GlView`] is what windowing glue talks to: it forwards surface, resize and
//! foreground/background notifications to the view's render thread and blocks until the
//! thread has acknowledged each one. [`ViewHandle`] exposes the non-blocking subset to
//! other threads.

mod builder;
mod controller;

#[cfg(test)]
mod tests;

pub use builder::{ViewBuilder, ViewConfig};
pub use controller::{GlView, ViewHandle};
pub use crate::thread::{RenderMode, RenderPhase, ViewStatus};
