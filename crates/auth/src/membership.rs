use serde::{Deserialize, Serialize};

use paperstock_core::{MemberId, StorageId};

/// A member's standing in one storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageMembership {
    pub storage_id: StorageId,
    pub member_id: MemberId,
    pub is_admin: bool,
    pub is_active: bool,
}
