use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::reconciler::SubscriptionSet;

#[derive(Default)]
struct SlotState {
    generation: u64,
    active: Option<SubscriptionSet>,
}

/// Holder for the engine's active subscription set.
///
/// Each `initialize` starts a new generation; a startup task may only install
/// its subscriptions if no newer `initialize` or `shutdown` happened since.
#[derive(Clone, Default)]
pub(super) struct SubscriptionSlot {
    state: Arc<Mutex<SlotState>>,
}

impl SubscriptionSlot {
    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a new generation, handing back the set it supersedes.
    pub(super) fn begin(&self) -> (u64, Option<SubscriptionSet>) {
        let mut state = self.lock();
        state.generation += 1;
        (state.generation, state.active.take())
    }

    /// Install `set` if `generation` is still current.
    ///
    /// Returns the set when it is stale, so the caller can close it.
    pub(super) fn install(&self, generation: u64, set: SubscriptionSet) -> Option<SubscriptionSet> {
        let mut state = self.lock();
        if state.generation != generation {
            return Some(set);
        }
        state.active = Some(set);
        None
    }

    /// Remove the active set and invalidate any pending install.
    pub(super) fn take(&self) -> Option<SubscriptionSet> {
        let mut state = self.lock();
        state.generation += 1;
        state.active.take()
    }

    pub(super) fn is_active(&self) -> bool {
        self.lock().active.is_some()
    }
}
