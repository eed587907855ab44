/// In-process document store
///
/// Keeps named collections of JSON documents (`serde_json::Value`). It backs
/// the alternate repository implementations, which honor the same contracts
/// as the flat-file ones. Mutations match documents by full equality with an
/// expected snapshot, mirroring the exact-line semantics of the flat files.
///
/// Cloning a `DocumentStore` shares the underlying collections.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared, cloneable document store
#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    collections: Arc<RwLock<HashMap<String, Vec<Value>>>>,
}

impl DocumentStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a document at the end of `collection`
    pub async fn insert_one(&self, collection: &str, doc: Value) {
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .push(doc);
    }

    /// Returns all documents of `collection` in insertion order
    pub async fn find_all(&self, collection: &str) -> Vec<Value> {
        let collections = self.collections.read().await;
        collections.get(collection).cloned().unwrap_or_default()
    }

    /// Returns documents whose top-level `field` equals `value`
    pub async fn find_by(&self, collection: &str, field: &str, value: &Value) -> Vec<Value> {
        let collections = self.collections.read().await;
        collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| doc.get(field) == Some(value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Replaces the first document equal to `expected`
    ///
    /// Returns `false` if no document matched.
    pub async fn replace_one(&self, collection: &str, expected: &Value, doc: Value) -> bool {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return false;
        };
        match docs.iter_mut().find(|d| **d == *expected) {
            Some(slot) => {
                *slot = doc;
                true
            }
            None => false,
        }
    }

    /// Removes the first document equal to `expected`
    ///
    /// Returns `false` if no document matched.
    pub async fn delete_one(&self, collection: &str, expected: &Value) -> bool {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return false;
        };
        match docs.iter().position(|d| d == expected) {
            Some(idx) => {
                docs.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Removes every document from `collection`
    pub async fn clear(&self, collection: &str) {
        let mut collections = self.collections.write().await;
        collections.remove(collection);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_and_find() {
        let store = DocumentStore::new();
        store.insert_one("users", json!({"id": 1, "name": "a"})).await;
        store.insert_one("users", json!({"id": 2, "name": "b"})).await;

        assert_eq!(store.find_all("users").await.len(), 2);
        assert!(store.find_all("tasks").await.is_empty());

        let found = store.find_by("users", "id", &json!(2)).await;
        assert_eq!(found, vec![json!({"id": 2, "name": "b"})]);
    }

    #[tokio::test]
    async fn test_replace_requires_exact_snapshot() {
        let store = DocumentStore::new();
        let original = json!({"id": 1, "name": "a"});
        store.insert_one("users", original.clone()).await;

        let stale = json!({"id": 1, "name": "zzz"});
        assert!(!store.replace_one("users", &stale, json!({"id": 1})).await);

        let updated = json!({"id": 1, "name": "b"});
        assert!(store.replace_one("users", &original, updated.clone()).await);
        assert_eq!(store.find_all("users").await, vec![updated]);
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let store = DocumentStore::new();
        let doc = json!({"id": 1});
        store.insert_one("tasks", doc.clone()).await;
        store.insert_one("tasks", json!({"id": 2})).await;

        assert!(store.delete_one("tasks", &doc).await);
        assert!(!store.delete_one("tasks", &doc).await);
        assert_eq!(store.find_all("tasks").await.len(), 1);

        store.clear("tasks").await;
        assert!(store.find_all("tasks").await.is_empty());
    }
}
