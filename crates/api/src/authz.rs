//! API-side authorization guard.
//!
//! This runs before any engine call, while the engine itself stays
//! auth-agnostic and only receives the actor id.

use paperstock_auth::{Access, authorize};
use paperstock_core::{DomainError, StorageId};
use paperstock_infra::MembershipDirectory;

use crate::context::ActorContext;

/// Check that the acting member may perform an `access`-level operation in
/// `storage_id`.
pub async fn authorize_storage(
    directory: &dyn MembershipDirectory,
    actor: &ActorContext,
    storage_id: StorageId,
    access: Access,
) -> Result<(), DomainError> {
    let membership = directory
        .membership(storage_id, actor.member_id())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, %storage_id, "membership lookup failed");
            DomainError::internal("failed to resolve membership").with_source(e)
        })?;

    authorize(membership.as_ref(), storage_id, access).map_err(|e| {
        tracing::debug!(error = %e, member_id = %actor.member_id(), "access denied");
        DomainError::from(e)
    })
}
