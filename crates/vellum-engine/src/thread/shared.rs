use parking_lot::{Condvar, Mutex};

use crate::arbiter::ContextHolder;
use crate::device::Platform;

use super::state::RenderState;

/// A view's lock and the single condition variable every state change is broadcast on.
pub(crate) struct Shared<P: Platform> {
    pub(crate) state: Mutex<RenderState<P>>,
    pub(crate) cond: Condvar,
}

impl<P: Platform> Shared<P> {
    pub(crate) fn new(state: RenderState<P>) -> Self {
        Self {
            state: Mutex::new(state),
            cond: Condvar::new(),
        }
    }
}

impl<P: Platform> ContextHolder for Shared<P> {
    fn request_release(&self) {
        let mut st = self.state.lock();
        st.should_release_context = true;
        self.cond.notify_all();
    }

    fn wake(&self) {
        let _st = self.state.lock();
        self.cond.notify_all();
    }
}
