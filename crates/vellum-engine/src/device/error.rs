/// Classified result of acquiring or presenting a frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SwapOutcome {
    /// Frame presented.
    Success,
    /// Frame dropped; the surface is still usable and nothing needs recreating.
    Skipped,
    /// The drawable surface is unusable until the platform re-signals it.
    SurfaceBad,
    /// The context is gone; surface and context are recreated on the next iteration.
    ContextLost,
}
