//! Graphics platform seam and the per-thread context bridge.
//!
//! This module is responsible for:
//! - the [`Platform`] trait and its pluggable strategies (config, context, surface)
//! - [`ContextBridge`], which owns the display/context/surface of one render thread
//! - classifying presentation results into [`SwapOutcome`]
//! - the default wgpu-backed platform

mod bridge;
mod error;
mod frame;
mod gpu;
mod init;
mod platform;
mod surface;

pub use bridge::ContextBridge;
pub use error::SwapOutcome;
pub use frame::WgpuFrame;
pub use gpu::{WgpuConfig, WgpuContext, WgpuPlatform, WgpuStrategies, WgpuSurface};
pub use init::WgpuInit;
pub use platform::{ConfigChooser, ContextFactory, Platform, Strategies, SurfaceFactory};
