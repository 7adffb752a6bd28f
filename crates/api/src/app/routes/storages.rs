use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use paperstock_auth::Access;
use paperstock_core::{DomainResult, Page, StorageId};
use paperstock_inventory::{Area, HistoryView, StockEntry};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/:storage_id/buffer", get(search_buffer))
        .route("/:storage_id/list", get(search_list))
        .route("/:storage_id/history", get(filter_history))
}

async fn authorized_storage(
    services: &AppServices,
    actor: &ActorContext,
    raw_id: &str,
) -> DomainResult<StorageId> {
    let storage_id: StorageId = raw_id.parse()?;
    authz::authorize_storage(services.memberships(), actor, storage_id, Access::Member).await?;
    Ok(storage_id)
}

async fn run_search(
    services: &AppServices,
    actor: &ActorContext,
    raw_storage_id: &str,
    query: &dto::StockQuery,
    area: Area,
) -> DomainResult<Page<StockEntry>> {
    let storage_id = authorized_storage(services, actor, raw_storage_id).await?;
    let filter = query.filter(storage_id)?;
    let page = query.page()?;
    match area {
        Area::Buffer => services.inventory().search_buffer(filter, page).await,
        Area::List => services.inventory().search_list(filter, page).await,
    }
}

async fn run_history(
    services: &AppServices,
    actor: &ActorContext,
    raw_storage_id: &str,
    query: &dto::HistoryQuery,
) -> DomainResult<Page<HistoryView>> {
    let storage_id = authorized_storage(services, actor, raw_storage_id).await?;
    let filter = query.filter(storage_id)?;
    let page = query.page()?;
    services.inventory().filter_history(filter, page).await
}

pub async fn search_buffer(
    services: Extension<Arc<AppServices>>,
    actor: Extension<ActorContext>,
    storage_id: Path<String>,
    query: Result<Query<dto::StockQuery>, QueryRejection>,
) -> Response {
    search(services, actor, storage_id, query, Area::Buffer).await
}

pub async fn search_list(
    services: Extension<Arc<AppServices>>,
    actor: Extension<ActorContext>,
    storage_id: Path<String>,
    query: Result<Query<dto::StockQuery>, QueryRejection>,
) -> Response {
    search(services, actor, storage_id, query, Area::List).await
}

async fn search(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(storage_id): Path<String>,
    query: Result<Query<dto::StockQuery>, QueryRejection>,
    area: Area,
) -> Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(e) => return errors::rejection(e.body_text()),
    };

    match run_search(&services, &actor, &storage_id, &query, area).await {
        Ok(page) => (
            StatusCode::OK,
            Json(dto::page_to_json(&page, dto::stock_entry_to_json)),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn filter_history(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(storage_id): Path<String>,
    query: Result<Query<dto::HistoryQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(e) => return errors::rejection(e.body_text()),
    };

    match run_history(&services, &actor, &storage_id, &query).await {
        Ok(page) => (
            StatusCode::OK,
            Json(dto::page_to_json(&page, dto::history_to_json)),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
