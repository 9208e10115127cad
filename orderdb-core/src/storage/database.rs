//! Named collections

use super::collection::Collection;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// A set of named collections
pub struct Database {
    name: String,
    collections: RwLock<HashMap<String, Arc<Collection>>>,
}

impl Database {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collections: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get a collection, creating it if it does not exist
    pub fn collection(&self, name: &str) -> Arc<Collection> {
        if let Some(existing) = self.collections.read().get(name) {
            return Arc::clone(existing);
        }

        let mut collections = self.collections.write();
        Arc::clone(collections.entry(name.to_string()).or_insert_with(|| {
            info!(database = %self.name, collection = name, "Created collection");
            Arc::new(Collection::new(name))
        }))
    }

    pub fn get_collection(&self, name: &str) -> Option<Arc<Collection>> {
        self.collections.read().get(name).cloned()
    }

    /// Remove a collection. Handles already held keep their documents but are
    /// no longer reachable by name.
    pub fn drop_collection(&self, name: &str) -> bool {
        let dropped = self.collections.write().remove(name).is_some();
        if dropped {
            info!(database = %self.name, collection = name, "Dropped collection");
        }
        dropped
    }

    /// Collection names in ascending order
    pub fn list_collections(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }
}
