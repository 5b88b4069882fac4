//! Close hooks and the registry that runs them.
//!
//! A [`Hook`] is a one-shot action: whichever registry takes it first gets to
//! run it, every later attempt finds it empty. Registering the same hook (or
//! clones of it) several times therefore still runs it once.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};

use crate::util::lock;

type Action = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// A zero-argument action run when a source closes.
#[derive(Clone)]
pub struct Hook {
    action: Arc<Mutex<Option<Action>>>,
}

impl Hook {
    /// Hook from an async closure.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        // The closure itself is only called once the future is polled, so a
        // panic in it is caught wherever the future runs.
        let action: Action = Box::new(move || async move { f().await }.boxed());
        Self {
            action: Arc::new(Mutex::new(Some(action))),
        }
    }

    /// Hook from a plain closure.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::new(move || async move { f() })
    }

    /// Whether some registry has already taken this hook to run it.
    pub fn has_run(&self) -> bool {
        lock(&self.action).is_none()
    }

    /// Takes the action out, leaving every clone of this hook spent.
    pub(crate) fn take(&self) -> Option<BoxFuture<'static, ()>> {
        let action = lock(&self.action).take();
        action.map(|action| action())
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("id", &Arc::as_ptr(&self.action))
            .field("has_run", &self.has_run())
            .finish()
    }
}

/// Outcome of [`HookRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Registration {
    /// Queued at this index; it runs at completion.
    Queued(usize),
    /// Completion already finished; the caller decides what to do with it.
    Sealed,
}

#[derive(Default)]
struct State {
    hooks: Vec<Hook>,
    drained: usize,
    sealed: bool,
}

/// Ordered hook list shared by a source and its completion routine.
#[derive(Default)]
pub(crate) struct HookRegistry {
    state: Mutex<State>,
}

impl HookRegistry {
    pub(crate) fn register(&self, hook: Hook) -> Registration {
        let mut state = lock(&self.state);
        if state.sealed {
            return Registration::Sealed;
        }
        state.hooks.push(hook);
        Registration::Queued(state.hooks.len() - 1)
    }

    /// Takes every hook registered since the previous drain, paired with its
    /// index. Hooks already run elsewhere are skipped. Returns `None`, and
    /// seals the registry, once nothing new was registered.
    pub(crate) fn drain(&self) -> Option<Vec<(usize, BoxFuture<'static, ()>)>> {
        let mut state = lock(&self.state);
        let from = state.drained;
        if from == state.hooks.len() {
            state.sealed = true;
            return None;
        }
        state.drained = state.hooks.len();
        let pending = state.hooks[from..]
            .iter()
            .enumerate()
            .filter_map(|(offset, hook)| hook.take().map(|run| (from + offset, run)))
            .collect();
        Some(pending)
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.state).hooks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_hook(counter: &Arc<AtomicUsize>) -> Hook {
        let counter = counter.clone();
        Hook::from_fn(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test]
    async fn test_hook_runs_once_across_clones() {
        let counter = Arc::new(AtomicUsize::new(0));
        let hook = counting_hook(&counter);
        let clone = hook.clone();

        hook.take().unwrap().await;
        assert!(clone.take().is_none());
        assert!(clone.has_run());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_drain_skips_duplicates_and_seals() {
        let counter = Arc::new(AtomicUsize::new(0));
        let registry = HookRegistry::default();
        let hook = counting_hook(&counter);

        assert_eq!(registry.register(hook.clone()), Registration::Queued(0));
        assert_eq!(registry.register(hook), Registration::Queued(1));
        assert_eq!(
            registry.register(counting_hook(&counter)),
            Registration::Queued(2)
        );

        let pending = registry.drain().unwrap();
        let indices: Vec<usize> = pending.iter().map(|(index, _)| *index).collect();
        assert_eq!(indices, vec![0, 2]);
        for (_, run) in pending {
            run.await;
        }
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        assert!(registry.drain().is_none());
        assert_eq!(
            registry.register(counting_hook(&counter)),
            Registration::Sealed
        );
        assert_eq!(registry.len(), 3);
    }

    #[tokio::test]
    async fn test_drain_picks_up_late_registrations() {
        let counter = Arc::new(AtomicUsize::new(0));
        let registry = HookRegistry::default();
        registry.register(counting_hook(&counter));

        let first = registry.drain().unwrap();
        registry.register(counting_hook(&counter));
        let second = registry.drain().unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].0, 1);
        assert!(registry.drain().is_none());
    }
}
