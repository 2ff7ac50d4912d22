use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::handler::Handler;
use crate::pattern::Pattern;
use crate::request::RequestKind;

/// Stores handlers keyed by `RequestKind` + pattern (or exact key for
/// `Event`/`OutgoingWebhook`) and exposes ordered lookup.
///
/// Conceptually immutable after `App::start()`; registration after start is
/// permitted but races are the caller's responsibility — the `Mutex`es here
/// make individual registration/lookup calls safe, not the sequence of
/// "register then immediately dispatch" across threads.
#[derive(Default)]
pub struct HandlerRegistry {
    patterns: Mutex<HashMap<RequestKind, Vec<(Pattern, Arc<dyn Handler>)>>>,
    exact: Mutex<HashMap<RequestKind, HashMap<String, Arc<dyn Handler>>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pattern-keyed handler (slash commands, block actions,
    /// view callbacks, dialogs, ...). Insertion order is preserved; lookup
    /// scans in insertion order and returns the first full match.
    pub fn register_pattern(
        &self,
        kind: RequestKind,
        pattern: impl Into<Pattern>,
        handler: Arc<dyn Handler>,
    ) {
        self.patterns
            .lock()
            .expect("registry mutex poisoned")
            .entry(kind)
            .or_default()
            .push((pattern.into(), handler));
    }

    /// Register an exact-match handler (`Event`, `OutgoingWebhook`).
    /// Re-registration for the same key logs a warning and replaces the
    /// existing handler — the later handler wins.
    pub fn register_exact(&self, kind: RequestKind, key: impl Into<String>, handler: Arc<dyn Handler>) {
        let key = key.into();
        let mut exact = self.exact.lock().expect("registry mutex poisoned");
        let table = exact.entry(kind).or_default();
        if table.contains_key(&key) {
            tracing::warn!(key = %key, kind = ?kind, "handler already registered for key; replacing");
        }
        table.insert(key, handler);
    }

    /// First pattern match in insertion order, or `None`.
    pub fn lookup_pattern(&self, kind: RequestKind, key: &str) -> Option<Arc<dyn Handler>> {
        let patterns = self.patterns.lock().expect("registry mutex poisoned");
        patterns
            .get(&kind)?
            .iter()
            .find(|(pattern, _)| pattern.matches(key))
            .map(|(_, handler)| handler.clone())
    }

    /// Exact-match lookup.
    pub fn lookup_exact(&self, kind: RequestKind, key: &str) -> Option<Arc<dyn Handler>> {
        self.exact
            .lock()
            .expect("registry mutex poisoned")
            .get(&kind)?
            .get(key)
            .cloned()
    }
}
