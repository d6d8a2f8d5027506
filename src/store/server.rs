// Stream store server

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{StoreError, StreamGroup};

type GroupMap = HashMap<Option<String>, HashMap<String, StreamGroup>>;

/// Namespace -> name -> stream group store
///
/// A live open installs a new group and fails when the name is taken;
/// a read open returns the existing group. Closing a live group
/// removes it from its namespace.
pub struct StreamStore {
    namespaces: Mutex<GroupMap>,
}

impl Default for StreamStore {
    fn default() -> StreamStore {
        StreamStore::new()
    }
}

impl StreamStore {
    /// Creates a store with just the default (None) namespace
    pub fn new() -> StreamStore {
        let mut namespaces = HashMap::new();
        namespaces.insert(None, HashMap::new());

        StreamStore {
            namespaces: Mutex::new(namespaces),
        }
    }

    /// Creates a store with the given namespaces
    pub fn with_namespaces<I: IntoIterator<Item = String>>(names: I) -> StreamStore {
        let mut namespaces: GroupMap = HashMap::new();

        for name in names {
            namespaces.insert(Some(name), HashMap::new());
        }

        StreamStore {
            namespaces: Mutex::new(namespaces),
        }
    }

    fn lock(&self) -> MutexGuard<'_, GroupMap> {
        self.namespaces
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Opens a new live group for publishing
    pub fn open_live(
        &self,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<StreamGroup, StoreError> {
        let mut namespaces = self.lock();

        let ns = namespaces
            .get_mut(&namespace.map(|s| s.to_string()))
            .ok_or_else(|| StoreError::NamespaceNotFound(namespace.map(|s| s.to_string())))?;

        if ns.contains_key(name) {
            return Err(StoreError::StreamExists(name.to_string()));
        }

        let group = StreamGroup::new(name, namespace, true);
        ns.insert(name.to_string(), group.clone());

        Ok(group)
    }

    /// Opens an existing group for reading
    pub fn open_read(
        &self,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<StreamGroup, StoreError> {
        let namespaces = self.lock();

        let ns = namespaces
            .get(&namespace.map(|s| s.to_string()))
            .ok_or_else(|| StoreError::NamespaceNotFound(namespace.map(|s| s.to_string())))?;

        ns.get(name)
            .cloned()
            .ok_or_else(|| StoreError::StreamNotFound(name.to_string()))
    }

    /// Releases a group; live groups disappear from their namespace
    pub fn close(&self, group: &StreamGroup) {
        if !group.is_live() {
            return;
        }

        let mut namespaces = self.lock();

        if let Some(ns) = namespaces.get_mut(&group.namespace()) {
            if let Some(existing) = ns.get(&group.name()) {
                if existing.same_group(group) {
                    ns.remove(&group.name());
                }
            }
        }
    }
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_open_then_read() {
        let store = StreamStore::new();

        let live = store.open_live(None, "live_x").unwrap();
        let read = store.open_read(None, "live_x").unwrap();

        assert!(read.same_group(&live));
    }

    #[test]
    fn test_live_open_existing_fails() {
        let store = StreamStore::new();

        let _live = store.open_live(None, "live_x").unwrap();

        assert!(matches!(
            store.open_live(None, "live_x"),
            Err(StoreError::StreamExists(name)) if name == "live_x"
        ));
    }

    #[test]
    fn test_read_missing_fails() {
        let store = StreamStore::new();

        assert!(matches!(
            store.open_read(None, "nope"),
            Err(StoreError::StreamNotFound(name)) if name == "nope"
        ));
    }

    #[test]
    fn test_unknown_namespace_fails() {
        let store = StreamStore::new();

        assert!(matches!(
            store.open_live(Some("other"), "x"),
            Err(StoreError::NamespaceNotFound(_))
        ));

        let store = StreamStore::with_namespaces(["a".to_string()]);

        assert!(store.open_live(Some("a"), "x").is_ok());
        assert!(matches!(
            store.open_live(None, "x"),
            Err(StoreError::NamespaceNotFound(None))
        ));
    }

    #[test]
    fn test_close_releases_live_group() {
        let store = StreamStore::new();

        let live = store.open_live(None, "live_x").unwrap();
        store.close(&live);

        assert!(store.open_read(None, "live_x").is_err());

        // the name is free again
        assert!(store.open_live(None, "live_x").is_ok());
    }
}
