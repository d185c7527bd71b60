//! Renderer-facing contracts.
//!
//! This module defines the callback set a view's embedder implements and the per-frame
//! context it receives. Callbacks run on the render thread only.

mod ctx;
mod renderer;

pub use ctx::FrameCtx;
pub use renderer::Renderer;
