//! Frame timing.
//!
//! Each render thread owns one `FrameClock` and ticks it once per drawn frame;
//! the resulting `FrameTime` is handed to the renderer through `FrameCtx`.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
