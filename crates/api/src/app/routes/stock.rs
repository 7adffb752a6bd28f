use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use paperstock_auth::Access;
use paperstock_core::StockEntryId;
use paperstock_inventory::{DeleteEntry, Deliver, MoveToList, StockEntry};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::ActorContext;

/// Resolve an entry by its path id and check the actor's access to the
/// storage it belongs to.
async fn authorized_entry(
    services: &AppServices,
    actor: &ActorContext,
    raw_id: &str,
    access: Access,
) -> Result<StockEntry, Response> {
    let id: StockEntryId = raw_id.parse().map_err(errors::domain_error_to_response)?;
    let entry = services
        .inventory()
        .get_entry(id)
        .await
        .map_err(errors::domain_error_to_response)?;
    authz::authorize_storage(services.memberships(), actor, entry.storage_id, access)
        .await
        .map_err(errors::domain_error_to_response)?;
    Ok(entry)
}

pub async fn store_intake(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    body: Result<Json<dto::StoreIntakeRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::rejection(e.body_text()),
    };

    let cmd = body.into_command();
    if let Err(e) = cmd.validate() {
        return errors::domain_error_to_response(e);
    }
    if let Err(e) =
        authz::authorize_storage(services.memberships(), &actor, cmd.storage_id, Access::Member).await
    {
        return errors::domain_error_to_response(e);
    }

    match services.inventory().store_intake(cmd, actor.member_id()).await {
        Ok(entry) => (StatusCode::CREATED, Json(dto::stock_entry_to_json(&entry))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_entry(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
) -> Response {
    match authorized_entry(&services, &actor, &id, Access::Member).await {
        Ok(entry) => (StatusCode::OK, Json(dto::stock_entry_to_json(&entry))).into_response(),
        Err(res) => res,
    }
}

pub async fn move_to_list(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::MoveToListRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::rejection(e.body_text()),
    };
    let entry = match authorized_entry(&services, &actor, &id, Access::Member).await {
        Ok(entry) => entry,
        Err(res) => return res,
    };

    let cmd = MoveToList {
        entry_id: entry.id,
        location: body.location,
        quantity: body.quantity,
    };
    match services.inventory().move_to_list(cmd, actor.member_id()).await {
        Ok(target) => (StatusCode::OK, Json(dto::stock_entry_to_json(&target))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn deliver(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::DeliverRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::rejection(e.body_text()),
    };
    let entry = match authorized_entry(&services, &actor, &id, Access::Member).await {
        Ok(entry) => entry,
        Err(res) => return res,
    };

    let cmd = Deliver {
        entry_id: entry.id,
        quantity: body.quantity,
    };
    match services.inventory().deliver(cmd, actor.member_id()).await {
        Ok(delivery) => (StatusCode::OK, Json(dto::delivery_to_json(&delivery))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn delete_entry(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
) -> Response {
    let entry = match authorized_entry(&services, &actor, &id, Access::Admin).await {
        Ok(entry) => entry,
        Err(res) => return res,
    };

    match services
        .inventory()
        .delete_entry(DeleteEntry { entry_id: entry.id }, actor.member_id())
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
