//! The dedicated render thread.
//!
//! Each view owns exactly one render thread. The thread and the owning side share a
//! [`RenderState`] behind one lock and one condition variable; every state change is
//! followed by a broadcast, and every wait re-checks its predicate in a loop.

mod render_loop;
mod shared;
mod state;

use std::sync::{Arc, Weak};
use std::thread::JoinHandle;

use anyhow::{Context, Result};

use crate::arbiter::{ArbiterClient, ContextArbiter, ContextHolder};
use crate::core::Renderer;
use crate::device::{Platform, Strategies};

pub(crate) use render_loop::Parts;
pub(crate) use shared::Shared;
pub(crate) use state::RenderState;
pub use state::{RenderMode, RenderPhase, Task, ViewStatus};

use render_loop::RenderLoop;

/// Registers a new client with `arbiter` and starts the render thread.
pub(crate) fn spawn<P: Platform>(
    name: &str,
    shared: Arc<Shared<P>>,
    host: Weak<Strategies<P>>,
    platform: P,
    renderer: Box<dyn Renderer<P>>,
    arbiter: Arc<ContextArbiter>,
) -> Result<JoinHandle<Parts<P>>> {
    let holder: Arc<dyn ContextHolder> = shared.clone();
    let client = ArbiterClient::new(Arc::downgrade(&holder));
    let thread_name = format!("{name}-{}", client.id().get());

    let render_loop = RenderLoop::new(shared, host, platform, renderer, arbiter, client);

    std::thread::Builder::new()
        .name(thread_name.clone())
        .spawn(move || render_loop.run())
        .with_context(|| format!("failed to spawn render thread {thread_name:?}"))
}
