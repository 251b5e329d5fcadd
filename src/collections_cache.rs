//! Collections of the active connection
//!
//! One snapshot per active connection, replaced wholesale when the
//! connection's `(id, uri)` identity changes. A fetch that completes after
//! the identity moved on, or after a newer fetch was started, is dropped.

use crate::connection::{Connection, ConnectionKey};
use crate::executor::CollectionsListing;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionsStatus {
    Idle,
    Loading,
    Loaded,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionsSnapshot {
    pub connection_id: Option<String>,
    pub status: CollectionsStatus,
    /// Sorted, no duplicates
    pub names: Vec<String>,
    pub read_only: Option<bool>,
    pub error: Option<String>,
}

impl CollectionsSnapshot {
    pub fn idle() -> Self {
        Self {
            connection_id: None,
            status: CollectionsStatus::Idle,
            names: Vec::new(),
            read_only: None,
            error: None,
        }
    }

    fn loading(connection_id: &str) -> Self {
        Self {
            connection_id: Some(connection_id.to_string()),
            status: CollectionsStatus::Loading,
            ..Self::idle()
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.binary_search_by(|n| n.as_str().cmp(name)).is_ok()
    }
}

/// A listing fetch the caller should perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionsFetch {
    pub key: ConnectionKey,
    pub connection_uri: String,
    pub generation: u64,
}

#[derive(Debug, Clone)]
pub struct CollectionsCache {
    key: Option<ConnectionKey>,
    /// Generation of the most recently started fetch
    generation: u64,
    snapshot: CollectionsSnapshot,
}

impl Default for CollectionsCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CollectionsCache {
    pub fn new() -> Self {
        Self {
            key: None,
            generation: 0,
            snapshot: CollectionsSnapshot::idle(),
        }
    }

    pub fn snapshot(&self) -> &CollectionsSnapshot {
        &self.snapshot
    }

    /// React to the active connection. Returns a fetch to perform when the
    /// identity changed to a connection.
    pub fn on_connection_changed(&mut self, active: Option<&Connection>) -> Option<CollectionsFetch> {
        let new_key = active.map(Connection::identity);
        if new_key == self.key {
            return None;
        }

        self.key = new_key;
        match active {
            Some(connection) => {
                info!(
                    target: "collections",
                    "Active connection is now {} ({}), loading collections",
                    connection.id,
                    connection.target_label()
                );
                Some(self.start_fetch(connection))
            }
            None => {
                self.snapshot = CollectionsSnapshot::idle();
                None
            }
        }
    }

    /// Re-fetch for the current connection
    pub fn refresh(&mut self, active: &Connection) -> Option<CollectionsFetch> {
        if self.key.as_ref() != Some(&active.identity()) {
            return self.on_connection_changed(Some(active));
        }
        Some(self.start_fetch(active))
    }

    fn start_fetch(&mut self, connection: &Connection) -> CollectionsFetch {
        self.generation += 1;
        self.snapshot = CollectionsSnapshot::loading(&connection.id);
        CollectionsFetch {
            key: connection.identity(),
            connection_uri: connection.uri.clone(),
            generation: self.generation,
        }
    }

    /// Apply a finished fetch. Returns false when it was for a connection
    /// that is no longer active or a newer fetch has been started since.
    pub fn complete(&mut self, fetch: &CollectionsFetch, result: Result<CollectionsListing, String>) -> bool {
        let key = &fetch.key;
        if self.key.as_ref() != Some(key) {
            debug!(target: "collections", "Discarding collections for inactive connection {}", key.id);
            return false;
        }
        if fetch.generation != self.generation {
            debug!(
                target: "collections",
                "Discarding superseded collections fetch {} for {} (current {})",
                fetch.generation,
                key.id,
                self.generation
            );
            return false;
        }

        self.snapshot = match result {
            Ok(listing) if listing.is_ok() => {
                let names: BTreeSet<String> = listing
                    .collections
                    .into_iter()
                    .filter(|name| !name.is_empty())
                    .collect();
                info!(target: "collections", "Loaded {} collections for {}", names.len(), key.id);
                CollectionsSnapshot {
                    connection_id: Some(key.id.clone()),
                    status: CollectionsStatus::Loaded,
                    names: names.into_iter().collect(),
                    read_only: listing.read_only,
                    error: None,
                }
            }
            Ok(_) => Self::failed(key, "Collection listing was not acknowledged.".to_string()),
            Err(message) => Self::failed(key, message),
        };
        true
    }

    fn failed(key: &ConnectionKey, message: String) -> CollectionsSnapshot {
        warn!(target: "collections", "Failed to load collections for {}: {}", key.id, message);
        CollectionsSnapshot {
            connection_id: Some(key.id.clone()),
            status: CollectionsStatus::Error,
            names: Vec::new(),
            read_only: None,
            error: Some(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn(id: &str, uri: &str) -> Connection {
        Connection::new(id, id, uri)
    }

    #[test]
    fn test_change_starts_loading() {
        let mut cache = CollectionsCache::new();
        let a = conn("a", "mongodb://a/db");
        let fetch = cache.on_connection_changed(Some(&a)).unwrap();
        assert_eq!(fetch.connection_uri, "mongodb://a/db");
        assert_eq!(cache.snapshot().status, CollectionsStatus::Loading);
        assert!(cache.snapshot().names.is_empty());
        assert!(cache.snapshot().read_only.is_none());

        // Same identity is not a change
        assert!(cache.on_connection_changed(Some(&a)).is_none());
    }

    #[test]
    fn test_names_sorted_and_deduplicated() {
        let mut cache = CollectionsCache::new();
        let a = conn("a", "mongodb://a/db");
        let fetch = cache.on_connection_changed(Some(&a)).unwrap();
        let listing = CollectionsListing::new(
            vec!["users".into(), "Orders".into(), "users".into(), "audit".into()],
            Some(true),
        );
        assert!(cache.complete(&fetch, Ok(listing)));

        let snapshot = cache.snapshot();
        assert_eq!(snapshot.status, CollectionsStatus::Loaded);
        assert_eq!(snapshot.names, vec!["Orders", "audit", "users"]);
        assert_eq!(snapshot.read_only, Some(true));
        assert!(snapshot.contains("audit"));
        assert!(!snapshot.contains("Audit"));
    }

    #[test]
    fn test_stale_fetch_discarded() {
        let mut cache = CollectionsCache::new();
        let first = cache.on_connection_changed(Some(&conn("a", "mongodb://a/db"))).unwrap();
        let second = cache.on_connection_changed(Some(&conn("b", "mongodb://b/db"))).unwrap();

        let late = CollectionsListing::new(vec!["from_a".into()], None);
        assert!(!cache.complete(&first, Ok(late)));
        assert_eq!(cache.snapshot().status, CollectionsStatus::Loading);
        assert_eq!(cache.snapshot().connection_id.as_deref(), Some("b"));

        assert!(cache.complete(&second, Err("auth failed".into())));
        assert_eq!(cache.snapshot().status, CollectionsStatus::Error);
        assert_eq!(cache.snapshot().error.as_deref(), Some("auth failed"));
    }

    #[test]
    fn test_refresh_supersedes_outstanding_fetch() {
        let mut cache = CollectionsCache::new();
        let a = conn("a", "mongodb://a/db");
        let first = cache.on_connection_changed(Some(&a)).unwrap();
        let second = cache.refresh(&a).unwrap();
        assert_eq!(first.key, second.key);

        let fresh = CollectionsListing::new(vec!["new_one".into()], None);
        assert!(cache.complete(&second, Ok(fresh)));

        let late = CollectionsListing::new(vec!["old_one".into()], None);
        assert!(!cache.complete(&first, Ok(late)));
        assert_eq!(cache.snapshot().status, CollectionsStatus::Loaded);
        assert_eq!(cache.snapshot().names, vec!["new_one"]);
    }

    #[test]
    fn test_uri_change_on_same_id_is_a_change() {
        let mut cache = CollectionsCache::new();
        cache.on_connection_changed(Some(&conn("a", "mongodb://a/one")));
        assert!(cache.on_connection_changed(Some(&conn("a", "mongodb://a/two"))).is_some());
    }

    #[test]
    fn test_clearing_connection_resets_to_idle() {
        let mut cache = CollectionsCache::new();
        cache.on_connection_changed(Some(&conn("a", "mongodb://a/db")));
        assert!(cache.on_connection_changed(None).is_none());
        assert_eq!(cache.snapshot(), &CollectionsSnapshot::idle());
    }
}
