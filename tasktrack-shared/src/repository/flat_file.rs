/// Flat-file repositories
///
/// One [`FlatFileRepository`] per entity file. Reads parse every line and skip
/// the ones that fail to decode; updates and deletes locate the record by its
/// exact serialized line.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use tasktrack_shared::audit::AuditTrail;
/// use tasktrack_shared::models::{Role, User};
/// use tasktrack_shared::repository::{FlatFileAuditLog, FlatFileRepository, Repository};
/// use tasktrack_shared::session::Session;
/// use tasktrack_shared::store::FlatFile;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let audit = Arc::new(AuditTrail::new(Arc::new(FlatFileAuditLog::new(
///     FlatFile::new("data/audits.csv"),
/// ))));
/// let users = FlatFileRepository::<User>::new(FlatFile::new("data/users.csv"), audit);
///
/// let admin = users
///     .create(&Session::system(), User::new("root", "pw", Role::Admin))
///     .await?;
/// assert_eq!(users.get_by_id(admin.id).await?, admin);
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    check_create, check_unique_among, check_update, created_entry, deleted_entry, updated_entry,
    AuditLogRepository, Repository,
};
use crate::audit::AuditTrail;
use crate::codec::{leading_id, LineCodec};
use crate::error::{RepoError, RepoResult};
use crate::models::{AuditLog, Entity, EntityKind};
use crate::session::Session;
use crate::store::{FlatFile, StoreError};

/// Generic repository over one entity file
pub struct FlatFileRepository<T> {
    file: FlatFile,
    audit: Arc<AuditTrail>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> FlatFileRepository<T> {
    pub fn new(file: FlatFile, audit: Arc<AuditTrail>) -> Self {
        FlatFileRepository {
            file,
            audit,
            _entity: PhantomData,
        }
    }

    /// Entity file path
    pub fn file(&self) -> &FlatFile {
        &self.file
    }

    /// Parses every line, keeping the raw line next to the decoded record
    async fn scan(&self) -> RepoResult<Vec<(String, T)>> {
        let lines = self.file.read_all().await?;
        let mut records = Vec::with_capacity(lines.len());

        for line in lines {
            match T::from_line(&line) {
                Ok(entity) => records.push((line, entity)),
                Err(e) => {
                    warn!(
                        entity = %T::KIND,
                        path = %self.file.path().display(),
                        error = %e,
                        "Skipping unreadable record"
                    );
                }
            }
        }

        Ok(records)
    }

    /// Finds the record with `id`
    ///
    /// A line whose leading id matches but which fails to decode makes the
    /// lookup fail with `Corrupt` instead of `NotFound`.
    async fn locate(&self, id: Uuid) -> RepoResult<(String, T)> {
        let lines = self.file.read_all().await?;
        let mut corrupt = None;

        for line in lines {
            match T::from_line(&line) {
                Ok(entity) if entity.id() == id => return Ok((line, entity)),
                Ok(_) => {}
                Err(source) => {
                    if corrupt.is_none() && leading_id(&line) == Some(id) {
                        corrupt = Some(source);
                    }
                }
            }
        }

        match corrupt {
            Some(source) => Err(RepoError::Corrupt {
                entity: T::KIND,
                source,
            }),
            None => Err(RepoError::not_found(T::KIND, id)),
        }
    }
}

/// Maps a missing expected line onto `NotFound` for the record `id`
fn line_error(err: StoreError, entity: EntityKind, id: Uuid) -> RepoError {
    match err {
        StoreError::LineNotFound { .. } => RepoError::not_found(entity, id),
        other => other.into(),
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for FlatFileRepository<T> {
    async fn create(&self, session: &Session, entity: T) -> RepoResult<T> {
        let existing: Vec<T> = self.scan().await?.into_iter().map(|(_, e)| e).collect();
        check_create(session, &entity, &existing)?;

        self.file.append(&entity.to_line()).await?;
        info!(entity = %T::KIND, id = %entity.id(), actor = %session.username, "Record created");

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
        let existing: Vec<T> = self.scan().await?.into_iter().map(|(_, e)| e).collect();
        check_unique_among(&new, existing)?;

        self.file
            .replace(&old.to_line(), &new.to_line())
            .await
            .map_err(|e| line_error(e, T::KIND, old.id()))?;
        info!(
            entity = %T::KIND,
            id = %new.id(),
            fields = %summary.fields,
            actor = %session.username,
            "Record updated"
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

        let (line, entity) = self.locate(id).await?;
        self.file
            .delete_line(&line)
            .await
            .map_err(|e| line_error(e, T::KIND, id))?;
        info!(entity = %T::KIND, id = %id, actor = %session.username, "Record deleted");

        self.audit
            .record_change(deleted_entry(session, &entity))
            .await?;
        Ok(entity)
    }

    async fn get_by_id(&self, id: Uuid) -> RepoResult<T> {
        self.locate(id).await.map(|(_, entity)| entity)
    }

    async fn list(&self) -> RepoResult<Vec<T>> {
        Ok(self.scan().await?.into_iter().map(|(_, e)| e).collect())
    }
}

/// Audit entries in `audits.csv`
pub struct FlatFileAuditLog {
    file: FlatFile,
}

impl FlatFileAuditLog {
    pub fn new(file: FlatFile) -> Self {
        FlatFileAuditLog { file }
    }
}

#[async_trait]
impl AuditLogRepository for FlatFileAuditLog {
    async fn create(&self, entry: AuditLog) -> RepoResult<AuditLog> {
        self.file.append(&entry.to_line()).await?;
        Ok(entry)
    }

    async fn list(&self) -> RepoResult<Vec<AuditLog>> {
        let lines = self.file.read_all().await?;
        Ok(lines
            .iter()
            .filter_map(|line| match AuditLog::from_line(line) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(
                        path = %self.file.path().display(),
                        error = %e,
                        "Skipping unreadable audit entry"
                    );
                    None
                }
            })
            .collect())
    }
}
