//! Storage-membership lookups backing HTTP authorization.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::instrument;

use paperstock_auth::StorageMembership;
use paperstock_core::{MemberId, StorageId};

use crate::store::StoreError;
use crate::store::postgres::map_sqlx_error;

/// Source of (storage, member) memberships.
#[async_trait]
pub trait MembershipDirectory: Send + Sync {
    /// The non-deleted membership of `member_id` in `storage_id`, if any.
    async fn membership(
        &self,
        storage_id: StorageId,
        member_id: MemberId,
    ) -> Result<Option<StorageMembership>, StoreError>;
}

#[async_trait]
impl<D> MembershipDirectory for Arc<D>
where
    D: MembershipDirectory + ?Sized,
{
    async fn membership(
        &self,
        storage_id: StorageId,
        member_id: MemberId,
    ) -> Result<Option<StorageMembership>, StoreError> {
        (**self).membership(storage_id, member_id).await
    }
}

/// In-memory directory for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryMembershipDirectory {
    members: RwLock<HashMap<(StorageId, MemberId), StorageMembership>>,
}

impl InMemoryMembershipDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&self, membership: StorageMembership) -> Result<(), StoreError> {
        let mut members = self
            .members
            .write()
            .map_err(|_| StoreError::Database("lock poisoned".to_string()))?;
        members.insert((membership.storage_id, membership.member_id), membership);
        Ok(())
    }
}

#[async_trait]
impl MembershipDirectory for InMemoryMembershipDirectory {
    async fn membership(
        &self,
        storage_id: StorageId,
        member_id: MemberId,
    ) -> Result<Option<StorageMembership>, StoreError> {
        let members = self
            .members
            .read()
            .map_err(|_| StoreError::Database("lock poisoned".to_string()))?;
        Ok(members.get(&(storage_id, member_id)).cloned())
    }
}

/// Directory reading the `storage_member` table.
#[derive(Debug, Clone)]
pub struct PostgresMembershipDirectory {
    pool: Arc<PgPool>,
}

impl PostgresMembershipDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Insert or replace a membership.
    #[instrument(skip(self, membership), fields(storage_id = %membership.storage_id, member_id = %membership.member_id), err)]
    pub async fn grant(&self, membership: &StorageMembership) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO storage_member (storage_id, member_id, is_admin, is_active)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (storage_id, member_id) DO UPDATE SET
                is_admin = EXCLUDED.is_admin,
                is_active = EXCLUDED.is_active,
                is_deleted = FALSE
            "#,
        )
        .bind(membership.storage_id.get())
        .bind(membership.member_id.get())
        .bind(membership.is_admin)
        .bind(membership.is_active)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("grant_membership", e))?;
        Ok(())
    }
}

#[async_trait]
impl MembershipDirectory for PostgresMembershipDirectory {
    #[instrument(skip(self), fields(storage_id = %storage_id, member_id = %member_id), err)]
    async fn membership(
        &self,
        storage_id: StorageId,
        member_id: MemberId,
    ) -> Result<Option<StorageMembership>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT is_admin, is_active
            FROM storage_member
            WHERE storage_id = $1 AND member_id = $2 AND NOT is_deleted
            "#,
        )
        .bind(storage_id.get())
        .bind(member_id.get())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("membership", e))?;

        row.map(|row| {
            Ok::<_, sqlx::Error>(StorageMembership {
                storage_id,
                member_id,
                is_admin: row.try_get("is_admin")?,
                is_active: row.try_get("is_active")?,
            })
        })
        .transpose()
        .map_err(|e| map_sqlx_error("decode_membership", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_directory_returns_granted_membership() {
        let dir = InMemoryMembershipDirectory::new();
        let m = StorageMembership {
            storage_id: StorageId::new(1),
            member_id: MemberId::new(2),
            is_admin: false,
            is_active: true,
        };
        dir.grant(m.clone()).unwrap();

        assert_eq!(dir.membership(StorageId::new(1), MemberId::new(2)).await.unwrap(), Some(m));
        assert_eq!(dir.membership(StorageId::new(2), MemberId::new(2)).await.unwrap(), None);
    }
}
