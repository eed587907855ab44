/// Document-store repositories
///
/// Same contracts as the flat-file repositories, backed by JSON documents in a
/// [`DocumentStore`]. A record's full document plays the role of the
/// flat-file line: updates and deletes match the stored document against the
/// caller's snapshot.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    check_create, check_unique_among, check_update, created_entry, deleted_entry, updated_entry,
    AuditLogRepository, Repository,
};
use crate::audit::AuditTrail;
use crate::error::{RepoError, RepoResult};
use crate::models::{AuditLog, Entity, EntityKind};
use crate::session::Session;
use crate::store::DocumentStore;

fn to_doc<T: Serialize>(value: &T) -> RepoResult<Value> {
    serde_json::to_value(value).map_err(|e| RepoError::Backend(e.to_string()))
}

/// Decodes every document of a collection, skipping unreadable ones
fn decode_all<T: DeserializeOwned>(kind: EntityKind, docs: Vec<Value>) -> Vec<(Value, T)> {
    docs.into_iter()
        .filter_map(|doc| match serde_json::from_value(doc.clone()) {
            Ok(entity) => Some((doc, entity)),
            Err(e) => {
                warn!(entity = %kind, error = %e, "Skipping unreadable document");
                None
            }
        })
        .collect()
}

/// Generic repository over one document collection
pub struct DocumentRepository<T> {
    store: DocumentStore,
    audit: Arc<AuditTrail>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> DocumentRepository<T> {
    pub fn new(store: DocumentStore, audit: Arc<AuditTrail>) -> Self {
        DocumentRepository {
            store,
            audit,
            _entity: PhantomData,
        }
    }

    fn collection(&self) -> &'static str {
        T::KIND.collection()
    }

    async fn scan(&self) -> Vec<T> {
        let docs = self.store.find_all(self.collection()).await;
        decode_all(T::KIND, docs)
            .into_iter()
            .map(|(_, entity)| entity)
            .collect()
    }

    async fn locate(&self, id: Uuid) -> RepoResult<(Value, T)> {
        let docs = self
            .store
            .find_by(self.collection(), "id", &Value::String(id.to_string()))
            .await;

        match docs.into_iter().next() {
            Some(doc) => {
                let entity = serde_json::from_value(doc.clone()).map_err(|e| {
                    RepoError::Backend(format!("corrupt {} document {}: {}", T::KIND, id, e))
                })?;
                Ok((doc, entity))
            }
            None => Err(RepoError::not_found(T::KIND, id)),
        }
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for DocumentRepository<T> {
    async fn create(&self, session: &Session, entity: T) -> RepoResult<T> {
        let existing = self.scan().await;
        check_create(session, &entity, &existing)?;

        self.store
            .insert_one(self.collection(), to_doc(&entity)?)
            .await;
        info!(entity = %T::KIND, id = %entity.id(), actor = %session.username, "Document created");

        self.audit
            .record_change(created_entry(session, &entity))
            .await?;
        Ok(entity)
    }

    async fn update(
        &self,
        session: &Session,
        new: T,
        old: &T,
        label: Option<&str>,
    ) -> RepoResult<T> {
        let summary = check_update(session, &new, old)?;
        check_unique_among(&new, self.scan().await)?;

        let replaced = self
            .store
            .replace_one(self.collection(), &to_doc(old)?, to_doc(&new)?)
            .await;
        if !replaced {
            return Err(RepoError::not_found(T::KIND, old.id()));
        }
        info!(
            entity = %T::KIND,
            id = %new.id(),
            fields = %summary.fields,
            actor = %session.username,
            "Document updated"
        );

        self.audit
            .record_change(updated_entry(session, &new, summary, label))
            .await?;
        Ok(new)
    }

    async fn delete(&self, session: &Session, id: Uuid) -> RepoResult<T> {
        if T::ADMIN_ONLY {
            session.require_admin()?;
        }

        let (doc, entity) = self.locate(id).await?;
        if !self.store.delete_one(self.collection(), &doc).await {
            return Err(RepoError::not_found(T::KIND, id));
        }
        info!(entity = %T::KIND, id = %id, actor = %session.username, "Document deleted");

        self.audit
            .record_change(deleted_entry(session, &entity))
            .await?;
        Ok(entity)
    }

    async fn get_by_id(&self, id: Uuid) -> RepoResult<T> {
        self.locate(id).await.map(|(_, entity)| entity)
    }

    async fn list(&self) -> RepoResult<Vec<T>> {
        Ok(self.scan().await)
    }
}

/// Audit entries in the `audits` collection
pub struct DocumentAuditLog {
    store: DocumentStore,
}

impl DocumentAuditLog {
    pub fn new(store: DocumentStore) -> Self {
        DocumentAuditLog { store }
    }
}

#[async_trait]
impl AuditLogRepository for DocumentAuditLog {
    async fn create(&self, entry: AuditLog) -> RepoResult<AuditLog> {
        self.store
            .insert_one(EntityKind::AuditLog.collection(), to_doc(&entry)?)
            .await;
        Ok(entry)
    }

    async fn list(&self) -> RepoResult<Vec<AuditLog>> {
        let docs = self.store.find_all(EntityKind::AuditLog.collection()).await;
        Ok(decode_all(EntityKind::AuditLog, docs)
            .into_iter()
            .map(|(_, entry)| entry)
            .collect())
    }

    async fn list_by_item(&self, item_id: Uuid) -> RepoResult<Vec<AuditLog>> {
        let docs = self
            .store
            .find_by(
                EntityKind::AuditLog.collection(),
                "item_id",
                &Value::String(item_id.to_string()),
            )
            .await;
        Ok(decode_all(EntityKind::AuditLog, docs)
            .into_iter()
            .map(|(_, entry)| entry)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::{Role, User};
    use serde_json::json;

    fn users() -> (DocumentStore, DocumentRepository<User>) {
        let store = DocumentStore::new();
        let audit = Arc::new(AuditTrail::new(Arc::new(DocumentAuditLog::new(
            store.clone(),
        ))));
        (store.clone(), DocumentRepository::new(store, audit))
    }

    #[tokio::test]
    async fn test_create_update_delete() {
        let (store, repo) = users();
        let session = Session::system();

        let alice = repo
            .create(&session, User::new("alice", "pw", Role::Mate))
            .await
            .unwrap();
        let promoted = User {
            role: Role::Admin,
            ..alice.clone()
        };
        repo.update(&session, promoted.clone(), &alice, None)
            .await
            .unwrap();
        assert_eq!(repo.get_by_id(alice.id).await.unwrap(), promoted);

        repo.delete(&session, alice.id).await.unwrap();
        assert!(repo.get_by_id(alice.id).await.unwrap_err().is_not_found());
        assert_eq!(store.find_all("audits").await.len(), 3);
    }

    #[tokio::test]
    async fn test_unreadable_documents_are_skipped() {
        let (store, repo) = users();
        store.insert_one("users", json!({"id": "garbage"})).await;
        repo.create(&Session::system(), User::new("alice", "pw", Role::Mate))
            .await
            .unwrap();

        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let (_, repo) = users();
        let session = Session::system();
        repo.create(&session, User::new("alice", "pw", Role::Mate))
            .await
            .unwrap();

        let err = repo
            .create(&session, User::new("Alice", "pw", Role::Mate))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }
}
