use std::sync::Arc;

use paperstock_infra::store::{connect, migrate};
use paperstock_infra::{
    InMemoryInventoryStore, InMemoryMembershipDirectory, InventoryService, MembershipDirectory,
    MovementEngine, PostgresInventoryStore, PostgresMembershipDirectory, StoreError,
};

use crate::config::ApiConfig;

/// Everything the handlers need, behind object-safe seams.
#[derive(Clone)]
pub struct AppServices {
    inventory: Arc<dyn InventoryService>,
    memberships: Arc<dyn MembershipDirectory>,
}

impl AppServices {
    pub fn new(
        inventory: Arc<dyn InventoryService>,
        memberships: Arc<dyn MembershipDirectory>,
    ) -> Self {
        Self {
            inventory,
            memberships,
        }
    }

    /// In-memory wiring (dev/test). The membership directory is handed back
    /// so callers can grant access.
    pub fn in_memory() -> (Self, Arc<InMemoryMembershipDirectory>) {
        let engine = MovementEngine::new(InMemoryInventoryStore::new());
        let directory = Arc::new(InMemoryMembershipDirectory::new());
        (Self::new(Arc::new(engine), directory.clone()), directory)
    }

    pub fn inventory(&self) -> &dyn InventoryService {
        self.inventory.as_ref()
    }

    pub fn memberships(&self) -> &dyn MembershipDirectory {
        self.memberships.as_ref()
    }
}

pub async fn build_services(config: &ApiConfig) -> Result<AppServices, StoreError> {
    let Some(database_url) = config.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL not set; using in-memory stores (data is lost on restart)");
        let (services, directory) = AppServices::in_memory();
        for membership in &config.dev_memberships {
            directory.grant(membership.clone())?;
        }
        tracing::info!(granted = config.dev_memberships.len(), "dev memberships granted");
        return Ok(services);
    };
    if !config.dev_memberships.is_empty() {
        tracing::warn!("DEV_MEMBERSHIPS ignored; memberships come from the database");
    }

    let pool = connect(database_url, config.database_max_connections).await?;
    if config.run_migrations {
        migrate(&pool).await?;
        tracing::info!("schema applied");
    }

    let engine = MovementEngine::new(PostgresInventoryStore::new(pool.clone()));
    let directory = PostgresMembershipDirectory::new(pool);
    Ok(AppServices::new(Arc::new(engine), Arc::new(directory)))
}
