//! Cross-view column registry
//!
//! [`ColumnState`] is created once per family of views that show the same
//! result set and is cloned into every engine that must agree on which
//! columns are hidden and how they are titled. Clones share the same state.
//!
//! Hidden keys and session aliases live for the lifetime of the process;
//! only persistent aliases are written to a [`KeyValueStore`].

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;
use tabula_core::{EventEmitter, KeyValueStore, Result, SubscriptionId};

/// Events emitted by [`ColumnState`] after a mutation took effect
#[derive(Clone, Debug, PartialEq)]
pub enum ColumnStateEvent {
    /// The hidden key set changed
    HiddenKeysChanged { has_hidden: bool },
    /// An alias was set or removed for a column
    AliasChanged { key: String },
    /// Persistent aliases were replaced from a store
    AliasesLoaded { count: usize },
    /// Hidden keys and session aliases were reset
    Cleared,
}

#[derive(Debug, Default)]
struct Inner {
    hidden: IndexSet<String>,
    session_aliases: IndexMap<String, String>,
    persistent_aliases: IndexMap<String, String>,
}

/// Shared hidden-column and alias registry
#[derive(Clone, Default)]
pub struct ColumnState {
    inner: Arc<RwLock<Inner>>,
    events: Arc<EventEmitter<ColumnStateEvent>>,
}

impl ColumnState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to state changes
    pub fn subscribe(
        &self,
        listener: impl Fn(&ColumnStateEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    // Events are emitted only after the write lock is released so listeners
    // can read the state back.
    fn notify(&self, event: ColumnStateEvent) {
        self.events.emit(&event);
    }

    fn notify_hidden(&self) {
        let has_hidden = self.has_hidden();
        self.notify(ColumnStateEvent::HiddenKeysChanged { has_hidden });
    }

    /// Hide a column everywhere. Returns false if it was already hidden.
    pub fn add_hidden_key(&self, key: &str) -> bool {
        let added = self.inner.write().hidden.insert(key.to_string());
        if added {
            tracing::debug!(key, "column hidden globally");
            self.notify_hidden();
        }
        added
    }

    /// Hide several columns at once with a single notification.
    /// Returns how many keys were newly hidden.
    pub fn add_hidden_keys<I, S>(&self, keys: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let added = {
            let mut inner = self.inner.write();
            keys.into_iter()
                .filter(|key| inner.hidden.insert(key.as_ref().to_string()))
                .count()
        };
        if added > 0 {
            tracing::debug!(added, "columns hidden globally");
            self.notify_hidden();
        }
        added
    }

    /// Restore a hidden column. Returns false if it was not hidden.
    pub fn remove_hidden_key(&self, key: &str) -> bool {
        let removed = self.inner.write().hidden.shift_remove(key);
        if removed {
            tracing::debug!(key, "column restored");
            self.notify_hidden();
        }
        removed
    }

    /// Replace the whole hidden set
    pub fn replace_hidden_keys<I, S>(&self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let new_set: IndexSet<String> = keys.into_iter().map(|k| k.as_ref().to_string()).collect();
        let changed = {
            let mut inner = self.inner.write();
            let changed = inner.hidden != new_set;
            inner.hidden = new_set;
            changed
        };
        if changed {
            self.notify_hidden();
        }
    }

    /// Reset hidden keys and session aliases. Persistent aliases survive.
    pub fn clear(&self) {
        {
            let mut inner = self.inner.write();
            inner.hidden.clear();
            inner.session_aliases.clear();
        }
        tracing::debug!("column state cleared");
        self.notify(ColumnStateEvent::Cleared);
    }

    pub fn is_hidden(&self, key: &str) -> bool {
        self.inner.read().hidden.contains(key)
    }

    /// Derived from the hidden set on every call, never stored
    pub fn has_hidden(&self) -> bool {
        !self.inner.read().hidden.is_empty()
    }

    /// Snapshot of the hidden keys in the order they were hidden
    pub fn hidden_keys(&self) -> Vec<String> {
        self.inner.read().hidden.iter().cloned().collect()
    }

    /// Set a display alias for `key`.
    ///
    /// A persistent alias also drops any session alias for the key so the new
    /// name takes effect immediately. Returns false for a blank name.
    pub fn set_alias(&self, key: &str, name: &str, persist: bool) -> bool {
        let name = name.trim();
        if name.is_empty() {
            tracing::warn!(key, "refusing blank column alias");
            return false;
        }

        let changed = {
            let mut inner = self.inner.write();
            if persist {
                let dropped_session = inner.session_aliases.shift_remove(key).is_some();
                let previous = inner
                    .persistent_aliases
                    .insert(key.to_string(), name.to_string());
                dropped_session || previous.as_deref() != Some(name)
            } else {
                let previous = inner
                    .session_aliases
                    .insert(key.to_string(), name.to_string());
                previous.as_deref() != Some(name)
            }
        };
        if changed {
            self.notify(ColumnStateEvent::AliasChanged {
                key: key.to_string(),
            });
        }
        true
    }

    /// Remove both the session and the persistent alias for `key`
    pub fn remove_alias(&self, key: &str) -> bool {
        let removed = {
            let mut inner = self.inner.write();
            let session = inner.session_aliases.shift_remove(key).is_some();
            let persistent = inner.persistent_aliases.shift_remove(key).is_some();
            session || persistent
        };
        if removed {
            self.notify(ColumnStateEvent::AliasChanged {
                key: key.to_string(),
            });
        }
        removed
    }

    /// Display title for `key`: session alias, then persistent alias, then the key itself
    pub fn resolve_title(&self, key: &str) -> String {
        let inner = self.inner.read();
        inner
            .session_aliases
            .get(key)
            .or_else(|| inner.persistent_aliases.get(key))
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }

    /// Whether any alias is registered for `key`
    pub fn has_alias(&self, key: &str) -> bool {
        let inner = self.inner.read();
        inner.session_aliases.contains_key(key) || inner.persistent_aliases.contains_key(key)
    }

    /// Snapshot of the persistent aliases
    pub fn persistent_aliases(&self) -> IndexMap<String, String> {
        self.inner.read().persistent_aliases.clone()
    }

    /// Effective aliases: persistent ones overlaid with session ones
    pub fn aliases_snapshot(&self) -> IndexMap<String, String> {
        let inner = self.inner.read();
        let mut merged = inner.persistent_aliases.clone();
        for (key, name) in &inner.session_aliases {
            merged.insert(key.clone(), name.clone());
        }
        merged
    }

    /// Write persistent aliases to `store` as `namespace/key -> name` entries.
    ///
    /// Entries under the namespace that no longer have an alias are removed.
    pub fn save(&self, store: &dyn KeyValueStore, namespace: &str) -> Result<()> {
        let prefix = format!("{}/", namespace);
        let aliases = self.persistent_aliases();

        for stored in store.keys_with_prefix(&prefix)? {
            let key = &stored[prefix.len()..];
            if !aliases.contains_key(key) {
                store.remove(&stored)?;
            }
        }
        for (key, name) in &aliases {
            store.set(&format!("{}{}", prefix, key), name)?;
        }

        tracing::debug!(namespace, count = aliases.len(), "saved persistent column aliases");
        Ok(())
    }

    /// Replace persistent aliases with the entries stored under `namespace`
    pub fn load(&self, store: &dyn KeyValueStore, namespace: &str) -> Result<()> {
        let prefix = format!("{}/", namespace);
        let mut loaded = IndexMap::new();
        for stored in store.keys_with_prefix(&prefix)? {
            if let Some(name) = store.get(&stored)? {
                loaded.insert(stored[prefix.len()..].to_string(), name);
            }
        }

        let count = loaded.len();
        self.inner.write().persistent_aliases = loaded;
        tracing::debug!(namespace, count, "loaded persistent column aliases");
        self.notify(ColumnStateEvent::AliasesLoaded { count });
        Ok(())
    }
}

impl std::fmt::Debug for ColumnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("ColumnState")
            .field("hidden", &inner.hidden)
            .field("session_aliases", &inner.session_aliases)
            .field("persistent_aliases", &inner.persistent_aliases)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use tabula_core::MemoryStore;

    #[test]
    fn test_hidden_mutations_are_idempotent() {
        let state = ColumnState::new();
        assert!(!state.has_hidden());
        assert!(state.add_hidden_key("comment"));
        assert!(!state.add_hidden_key("comment"));
        assert!(state.has_hidden());
        assert!(state.remove_hidden_key("comment"));
        assert!(!state.remove_hidden_key("comment"));
        assert!(!state.has_hidden());
    }

    #[test]
    fn test_clones_share_state() {
        let a = ColumnState::new();
        let b = a.clone();
        a.add_hidden_key("x");
        assert!(b.is_hidden("x"));
    }

    #[test]
    fn test_has_hidden_signal_tracks_every_mutation() {
        let state = ColumnState::new();
        let signals = Arc::new(Mutex::new(Vec::new()));
        let sink = signals.clone();
        state.subscribe(move |event| {
            if let ColumnStateEvent::HiddenKeysChanged { has_hidden } = event {
                sink.lock().push(*has_hidden);
            }
        });

        state.add_hidden_key("a");
        state.add_hidden_key("a");
        state.add_hidden_keys(["b", "c"]);
        state.replace_hidden_keys(Vec::<String>::new());

        assert_eq!(*signals.lock(), vec![true, true, false]);
    }

    #[test]
    fn test_listener_can_read_state_back() {
        let state = ColumnState::new();
        let observed = Arc::new(Mutex::new(Vec::new()));
        let reader = state.clone();
        let sink = observed.clone();
        state.subscribe(move |_| sink.lock().push(reader.hidden_keys()));

        state.add_hidden_key("k");
        assert_eq!(*observed.lock(), vec![vec!["k".to_string()]]);
    }

    #[test]
    fn test_alias_resolution_order() {
        let state = ColumnState::new();
        assert_eq!(state.resolve_title("cust_nm"), "cust_nm");

        state.set_alias("cust_nm", "Customer", true);
        assert_eq!(state.resolve_title("cust_nm"), "Customer");

        state.set_alias("cust_nm", "Client", false);
        assert_eq!(state.resolve_title("cust_nm"), "Client");

        state.clear();
        assert_eq!(state.resolve_title("cust_nm"), "Customer");

        assert!(state.remove_alias("cust_nm"));
        assert_eq!(state.resolve_title("cust_nm"), "cust_nm");
    }

    #[test]
    fn test_repeated_alias_notifies_once() {
        let state = ColumnState::new();
        let changes = Arc::new(Mutex::new(0));
        let sink = changes.clone();
        state.subscribe(move |event| {
            if matches!(event, ColumnStateEvent::AliasChanged { .. }) {
                *sink.lock() += 1;
            }
        });

        assert!(state.set_alias("qty", "Quantity", false));
        assert!(state.set_alias("qty", " Quantity ", false));
        assert_eq!(*changes.lock(), 1);

        // Promoting to persistent drops the session alias: a change
        assert!(state.set_alias("qty", "Quantity", true));
        assert!(state.set_alias("qty", "Quantity", true));
        assert_eq!(*changes.lock(), 2);

        assert!(state.set_alias("qty", "Amount", true));
        assert_eq!(*changes.lock(), 3);
    }

    #[test]
    fn test_blank_alias_rejected() {
        let state = ColumnState::new();
        assert!(!state.set_alias("a", "   ", false));
        assert!(!state.has_alias("a"));
    }

    #[test]
    fn test_save_load_round_trips_only_persistent_aliases() {
        let store = MemoryStore::new();
        let state = ColumnState::new();
        state.set_alias("a", "Alpha", true);
        state.set_alias("b", "Beta", false);
        state.add_hidden_key("c");
        state.save(&store, "column_aliases").unwrap();

        let restored = ColumnState::new();
        restored.load(&store, "column_aliases").unwrap();
        assert_eq!(restored.resolve_title("a"), "Alpha");
        assert_eq!(restored.resolve_title("b"), "b");
        assert!(!restored.has_hidden());
    }

    #[test]
    fn test_save_prunes_removed_aliases() {
        let store = MemoryStore::new();
        let state = ColumnState::new();
        state.set_alias("a", "Alpha", true);
        state.set_alias("b", "Beta", true);
        state.save(&store, "ns").unwrap();

        state.remove_alias("a");
        state.save(&store, "ns").unwrap();

        assert_eq!(store.keys_with_prefix("ns/").unwrap(), vec!["ns/b".to_string()]);
    }
}
