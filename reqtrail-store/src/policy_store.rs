use arc_swap::ArcSwap;
use reqtrail_core::policy::Policy;
use std::sync::Arc;
use tracing::debug;

/// Live policy, replaced atomically on every write.
///
/// Readers take an `Arc<Policy>` snapshot and decide against it without
/// holding any lock; a concurrent update only affects later snapshots.
pub struct PolicyStore {
    inner: ArcSwap<Policy>,
}

impl PolicyStore {
    pub fn new(policy: Policy) -> Self {
        Self {
            inner: ArcSwap::new(Arc::new(policy)),
        }
    }

    /// Snapshot for one decision.
    pub fn snapshot(&self) -> Arc<Policy> {
        self.inner.load_full()
    }

    /// Replace the whole policy.
    pub fn replace(&self, policy: Policy) {
        self.inner.store(Arc::new(policy));
        debug!("Policy replaced");
    }

    /// Copy-modify-swap. `f` may run more than once under contention, so it
    /// must only touch the policy it is given.
    pub fn update<F>(&self, f: F)
    where
        F: Fn(&mut Policy),
    {
        self.inner.rcu(|current| {
            let mut next = Policy::clone(current);
            f(&mut next);
            next
        });
        debug!("Policy updated");
    }
}

impl Default for PolicyStore {
    fn default() -> Self {
        Self::new(Policy::default())
    }
}
