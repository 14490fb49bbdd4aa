//! In-memory document store
//!
//! Nothing survives a restart. Useful for tests and for running the server
//! without a data directory.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use crate::ids::{CollectionPath, DocumentPath};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::{DocumentStore, StoredDocument};

type Collection = BTreeMap<String, String>;

/// Document store kept entirely in process memory
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a raw body without any checks
    #[cfg(test)]
    pub fn insert_raw(&self, collection: &CollectionPath, id: &str, body: &str) -> StorageResult<()> {
        let mut map = self.collections.write().map_err(|_| StorageError::Poisoned)?;
        map.entry(collection.as_str().to_string())
            .or_default()
            .insert(id.to_string(), body.to_string());
        Ok(())
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn get(&self, path: &DocumentPath) -> StorageResult<Option<String>> {
        let map = self.collections.read().map_err(|_| StorageError::Poisoned)?;
        Ok(map
            .get(path.collection().as_str())
            .and_then(|c| c.get(path.id().as_str()))
            .cloned())
    }

    fn set(&self, path: &DocumentPath, body: &str) -> StorageResult<()> {
        let mut map = self.collections.write().map_err(|_| StorageError::Poisoned)?;
        map.entry(path.collection().as_str().to_string())
            .or_default()
            .insert(path.id().as_str().to_string(), body.to_string());
        Ok(())
    }

    fn create(&self, path: &DocumentPath, body: &str) -> StorageResult<()> {
        let mut map = self.collections.write().map_err(|_| StorageError::Poisoned)?;
        let collection = map.entry(path.collection().as_str().to_string()).or_default();
        if collection.contains_key(path.id().as_str()) {
            return Err(StorageError::AlreadyExists {
                path: path.to_string(),
            });
        }
        collection.insert(path.id().as_str().to_string(), body.to_string());
        Ok(())
    }

    fn delete(&self, path: &DocumentPath) -> StorageResult<()> {
        let mut map = self.collections.write().map_err(|_| StorageError::Poisoned)?;
        if let Some(collection) = map.get_mut(path.collection().as_str()) {
            collection.remove(path.id().as_str());
        }
        Ok(())
    }

    fn list(&self, collection: &CollectionPath) -> StorageResult<Vec<StoredDocument>> {
        let map = self.collections.read().map_err(|_| StorageError::Poisoned)?;
        Ok(map
            .get(collection.as_str())
            .map(|c| {
                c.iter()
                    .map(|(id, body)| StoredDocument {
                        id: id.clone(),
                        body: body.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{BookId, UserId};

    fn books_of(user: &str) -> CollectionPath {
        CollectionPath::books_of(&UserId::new(user).unwrap())
    }

    #[test]
    fn test_crud() {
        let store = MemoryDocumentStore::new();
        let path = books_of("u1").document(&BookId::new("b1").unwrap());

        store.create(&path, "{}").unwrap();
        assert!(matches!(
            store.create(&path, "{}"),
            Err(StorageError::AlreadyExists { .. })
        ));

        store.set(&path, r#"{"a":1}"#).unwrap();
        assert_eq!(store.get(&path).unwrap().as_deref(), Some(r#"{"a":1}"#));

        store.delete(&path).unwrap();
        store.delete(&path).unwrap();
        assert!(store.get(&path).unwrap().is_none());
    }

    #[test]
    fn test_list_scoping_and_raw_insert() {
        let store = MemoryDocumentStore::new();
        store.insert_raw(&books_of("u1"), "b", "not json").unwrap();
        store.insert_raw(&books_of("u1"), "a", "{}").unwrap();
        store.insert_raw(&books_of("u2"), "c", "{}").unwrap();

        let docs = store.list(&books_of("u1")).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, "a");
        assert_eq!(docs[1].body, "not json");
        assert!(store.list(&books_of("u3")).unwrap().is_empty());
    }
}
