use std::sync::Weak;

use super::ContextHolder;

enum Signal {
    /// Ask the holder to give up its context on its next iteration.
    Release(Weak<dyn ContextHolder>),
    /// Make the holder re-evaluate its state (e.g. retry acquisition).
    Wake(Weak<dyn ContextHolder>),
}

/// Signals for other render threads, deferred until the sender has dropped its own lock.
#[derive(Default)]
pub struct Outbox {
    signals: Vec<Signal>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub(crate) fn push_release(&mut self, holder: Weak<dyn ContextHolder>) {
        self.signals.push(Signal::Release(holder));
    }

    pub(crate) fn push_wake(&mut self, holder: Weak<dyn ContextHolder>) {
        self.signals.push(Signal::Wake(holder));
    }

    /// Delivers every queued signal.
    ///
    /// Must not be called while holding any view lock.
    pub fn deliver(&mut self) {
        for signal in self.signals.drain(..) {
            match signal {
                Signal::Release(holder) => {
                    if let Some(holder) = holder.upgrade() {
                        holder.request_release();
                    }
                }
                Signal::Wake(holder) => {
                    if let Some(holder) = holder.upgrade() {
                        holder.wake();
                    }
                }
            }
        }
    }
}

impl Drop for Outbox {
    fn drop(&mut self) {
        if !self.signals.is_empty() {
            log::warn!("dropping {} undelivered arbiter signals", self.signals.len());
        }
    }
}
