use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Mutable per-call state shared by every middleware layer in one chain.
///
/// A context is created once per top-level call by [`compose`] and handed,
/// as a clone of the same cell, to every middleware factory in the chain.
/// It is never replaced mid-call, only mutated in place. Control flow
/// through a chain is strictly nested (an outer layer is suspended while
/// an inner one runs), so the lock is never contended within one call; it
/// exists because handles cross `Send` boundaries.
///
/// Besides the two well-known fields, middleware can stash arbitrary typed
/// values in the extension map to communicate with layers added later in
/// the same chain.
///
/// [`compose`]: crate::compose
#[derive(Clone, Default)]
pub struct Context {
    inner: Arc<Mutex<ContextInner>>,
}

#[derive(Default)]
struct ContextInner {
    attempts_count: u32,
    is_credentials_expired: bool,
    extensions: HashMap<&'static str, Box<dyn Any + Send>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts made so far across every retry layer of the chain.
    /// Monotonically non-decreasing for the duration of one call.
    pub fn attempts_count(&self) -> u32 {
        self.lock().attempts_count
    }

    pub fn set_attempts_count(&self, attempts: u32) {
        self.lock().attempts_count = attempts;
    }

    /// Whether a retry decider reported an expired-credentials failure.
    /// Once set, the flag persists for the remainder of the call so outer
    /// layers (e.g. request signing) can react on the next attempt.
    pub fn is_credentials_expired(&self) -> bool {
        self.lock().is_credentials_expired
    }

    pub fn set_credentials_expired(&self, expired: bool) {
        self.lock().is_credentials_expired = expired;
    }

    /// Stores a typed extension value under `key`, returning the previous
    /// value of that type if one was present.
    pub fn insert<T: Any + Send>(&self, key: &'static str, value: T) -> Option<T> {
        self.lock()
            .extensions
            .insert(key, Box::new(value))
            .and_then(|prev| prev.downcast::<T>().ok())
            .map(|prev| *prev)
    }

    /// Reads a typed extension value by cloning it out of the map.
    /// Returns `None` when the key is absent or holds a different type.
    pub fn get<T: Any + Send + Clone>(&self, key: &'static str) -> Option<T> {
        self.lock()
            .extensions
            .get(key)
            .and_then(|value| value.downcast_ref::<T>())
            .cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ContextInner> {
        self.inner
            .lock()
            .expect("middleware context mutex must not be poisoned")
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("Context")
            .field("attempts_count", &inner.attempts_count)
            .field("is_credentials_expired", &inner.is_credentials_expired)
            .field("extensions", &inner.extensions.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::Context;

    #[test]
    fn starts_empty() {
        let context = Context::new();
        assert_eq!(context.attempts_count(), 0);
        assert!(!context.is_credentials_expired());
    }

    #[test]
    fn clones_share_the_same_cell() {
        let context = Context::new();
        let handle = context.clone();
        handle.set_attempts_count(4);
        handle.set_credentials_expired(true);
        assert_eq!(context.attempts_count(), 4);
        assert!(context.is_credentials_expired());
    }

    #[test]
    fn extensions_are_typed() {
        let context = Context::new();
        assert_eq!(context.insert("trace-id", 7u64), None);
        assert_eq!(context.get::<u64>("trace-id"), Some(7));
        // Wrong type reads nothing.
        assert_eq!(context.get::<String>("trace-id"), None);
        // Replacing returns the previous value.
        assert_eq!(context.insert("trace-id", 9u64), Some(7));
    }
}
