use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::Mutex;

use super::outbox::Outbox;
use super::probe::{ArbiterConfig, Capability};

/// Receiver side of arbiter signals, implemented by each render thread's shared state.
pub trait ContextHolder: Send + Sync {
    /// Asks the holder to drop its context on its next loop iteration.
    fn request_release(&self);

    /// Wakes the holder so it re-evaluates whether it can acquire a context.
    fn wake(&self);
}

/// Identity of one render thread as seen by the arbiter.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ClientId(u64);

impl ClientId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ClientId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// A render thread's registration with the arbiter.
///
/// The holder is weak: the arbiter never keeps a view alive.
#[derive(Clone)]
pub struct ArbiterClient {
    id: ClientId,
    holder: Weak<dyn ContextHolder>,
}

impl ArbiterClient {
    pub fn new(holder: Weak<dyn ContextHolder>) -> Self {
        Self {
            id: ClientId::next(),
            holder,
        }
    }

    pub fn id(&self) -> ClientId {
        self.id
    }
}

impl std::fmt::Debug for ArbiterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArbiterClient").field("id", &self.id).finish()
    }
}

struct ArbiterState {
    owner: Option<ArbiterClient>,
    /// Set once a release request has been queued for the current owner.
    release_requested: bool,
    /// Clients denied the context. They stay registered until they acquire it or
    /// release, and are woken whenever ownership changes hands.
    waiters: Vec<ArbiterClient>,
    capability: Capability,
}

/// Grants exclusive (or, on capable drivers, shared) use of the graphics context.
pub struct ContextArbiter {
    config: ArbiterConfig,
    state: Mutex<ArbiterState>,
}

impl ContextArbiter {
    pub fn new(config: ArbiterConfig) -> Self {
        Self::with_state(config, Capability::Unprobed)
    }

    /// Creates an arbiter whose capability is already known; later probes are ignored.
    pub fn with_capability(multi_context: bool) -> Self {
        Self::with_state(ArbiterConfig::default(), Capability::Probed { multi_context })
    }

    fn with_state(config: ArbiterConfig, capability: Capability) -> Self {
        Self {
            config,
            state: Mutex::new(ArbiterState {
                owner: None,
                release_requested: false,
                waiters: Vec::new(),
                capability,
            }),
        }
    }

    /// Process-wide arbiter used by views that are not given one explicitly.
    pub fn global() -> Arc<ContextArbiter> {
        static GLOBAL: OnceLock<Arc<ContextArbiter>> = OnceLock::new();
        GLOBAL
            .get_or_init(|| Arc::new(ContextArbiter::new(ArbiterConfig::default())))
            .clone()
    }

    /// Tries to take the context for `client` without blocking.
    ///
    /// On denial a release request for the current owner is queued in `outbox` (once per
    /// ownership period) and `client` is registered to be woken on release.
    pub fn try_acquire(&self, client: &ArbiterClient, outbox: &mut Outbox) -> bool {
        let mut st = self.state.lock();

        let free = match &st.owner {
            None => true,
            Some(owner) => owner.id == client.id,
        };

        if free {
            if st.owner.is_none() {
                log::debug!("context granted to render thread {}", client.id.0);
            }
            st.owner = Some(client.clone());
            st.release_requested = false;
            st.waiters.retain(|w| w.id != client.id);
            // The others must ask the new owner again.
            for waiter in &st.waiters {
                outbox.push_wake(waiter.holder.clone());
            }
            return true;
        }

        if st.capability.multi_context() {
            return true;
        }

        if !st.waiters.iter().any(|w| w.id == client.id) {
            st.waiters.push(client.clone());
        }

        if !st.release_requested {
            if let Some(owner) = &st.owner {
                log::debug!(
                    "render thread {} asks render thread {} to release the context",
                    client.id.0,
                    owner.id.0
                );
                outbox.push_release(owner.holder.clone());
            }
            st.release_requested = true;
        }

        false
    }

    /// Gives up ownership if `client` holds it and forgets `client` as a waiter.
    ///
    /// Idempotent. Whenever the context is left free, the remaining waiters are woken.
    pub fn release(&self, client: &ArbiterClient, outbox: &mut Outbox) {
        let mut st = self.state.lock();

        st.waiters.retain(|w| w.id != client.id);

        if st.owner.as_ref().is_some_and(|o| o.id == client.id) {
            log::debug!("render thread {} released the context", client.id.0);
            st.owner = None;
            st.release_requested = false;
        }
        if st.owner.is_some() {
            return;
        }

        for waiter in &st.waiters {
            outbox.push_wake(waiter.holder.clone());
        }
    }

    /// Asks `owner` to give the context up voluntarily, if it still holds it.
    pub fn request_release(&self, owner: ClientId, outbox: &mut Outbox) {
        let mut st = self.state.lock();

        let Some(current) = &st.owner else {
            return;
        };
        if current.id != owner || st.release_requested {
            return;
        }

        outbox.push_release(current.holder.clone());
        st.release_requested = true;
    }

    /// Registers `client` to be woken the next time the context is released.
    pub fn wait_for_release(&self, client: &ArbiterClient) {
        let mut st = self.state.lock();
        if !st.waiters.iter().any(|w| w.id == client.id) {
            st.waiters.push(client.clone());
        }
    }

    /// Whether `client`, having just given the context up on request, should leave it
    /// to another thread instead of taking it straight back.
    ///
    /// True while someone else owns the context or is waiting for it. Never true on
    /// multi-context drivers.
    pub fn should_yield(&self, client: &ArbiterClient) -> bool {
        let st = self.state.lock();
        if st.capability.multi_context() {
            return false;
        }
        st.owner.as_ref().is_some_and(|o| o.id != client.id)
            || st.waiters.iter().any(|w| w.id != client.id)
    }

    /// Current owner, if any.
    pub fn owner(&self) -> Option<ClientId> {
        self.state.lock().owner.as_ref().map(|o| o.id)
    }

    pub fn capability(&self) -> Capability {
        self.state.lock().capability
    }

    /// Single-context drivers must release their context on pause so another view can use it.
    pub fn should_release_on_pause(&self) -> bool {
        self.state.lock().capability.limited()
    }

    /// Whether pausing must also tear down the display-level session.
    pub fn should_terminate_on_pause(&self) -> bool {
        !self.state.lock().capability.multi_context()
    }

    /// Inspects the driver string the first time a context exists. Later calls are no-ops.
    pub fn probe_capability(&self, driver: &str) {
        let mut st = self.state.lock();
        if st.capability.is_probed() {
            return;
        }

        st.capability = self.config.classify(driver);
        log::info!(
            "graphics driver {driver:?}: multi-context {}",
            if st.capability.multi_context() { "supported" } else { "unsupported" }
        );
    }
}

impl Default for ContextArbiter {
    fn default() -> Self {
        Self::new(ArbiterConfig::default())
    }
}
