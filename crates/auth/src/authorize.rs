use serde::Serialize;
use thiserror::Error;

use paperstock_core::{DomainError, StorageId};

use crate::StorageMembership;

/// Level of access an operation needs within a storage.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    /// Any active member (intake, moves, deliveries, reads).
    Member,
    /// Active administrator (deletes).
    Admin,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("not a member of storage {0}")]
    NotMember(StorageId),

    #[error("membership in storage {0} is inactive")]
    Inactive(StorageId),

    #[error("admin access to storage {0} required")]
    AdminRequired(StorageId),
}

impl From<AuthzError> for DomainError {
    fn from(err: AuthzError) -> Self {
        DomainError::forbidden(err.to_string())
    }
}

/// Authorize a member acting on `storage_id`.
///
/// - No IO
/// - No panics
/// - `membership` is whatever the directory returned for (storage, actor)
pub fn authorize(
    membership: Option<&StorageMembership>,
    storage_id: StorageId,
    required: Access,
) -> Result<(), AuthzError> {
    let membership = match membership {
        Some(m) if m.storage_id == storage_id => m,
        _ => return Err(AuthzError::NotMember(storage_id)),
    };

    if !membership.is_active {
        return Err(AuthzError::Inactive(storage_id));
    }

    match required {
        Access::Member => Ok(()),
        Access::Admin if membership.is_admin => Ok(()),
        Access::Admin => Err(AuthzError::AdminRequired(storage_id)),
    }
}

#[cfg(test)]
mod tests {
    use paperstock_core::{ErrorKind, MemberId};

    use super::*;

    fn member(storage: i64, is_admin: bool, is_active: bool) -> StorageMembership {
        StorageMembership {
            storage_id: StorageId::new(storage),
            member_id: MemberId::new(7),
            is_admin,
            is_active,
        }
    }

    #[test]
    fn active_member_may_operate() {
        let m = member(1, false, true);
        assert_eq!(authorize(Some(&m), StorageId::new(1), Access::Member), Ok(()));
    }

    #[test]
    fn delete_needs_admin() {
        let s = StorageId::new(1);
        assert_eq!(
            authorize(Some(&member(1, false, true)), s, Access::Admin),
            Err(AuthzError::AdminRequired(s))
        );
        assert_eq!(authorize(Some(&member(1, true, true)), s, Access::Admin), Ok(()));
    }

    #[test]
    fn inactive_or_foreign_membership_is_rejected() {
        let s = StorageId::new(1);
        assert_eq!(
            authorize(Some(&member(1, true, false)), s, Access::Member),
            Err(AuthzError::Inactive(s))
        );
        assert_eq!(
            authorize(Some(&member(2, true, true)), s, Access::Member),
            Err(AuthzError::NotMember(s))
        );
        assert_eq!(authorize(None, s, Access::Member), Err(AuthzError::NotMember(s)));
    }

    #[test]
    fn maps_to_forbidden() {
        let err: DomainError = AuthzError::NotMember(StorageId::new(3)).into();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }
}
