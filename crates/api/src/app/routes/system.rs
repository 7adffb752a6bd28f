use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use crate::context::ActorContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(actor): Extension<ActorContext>) -> impl IntoResponse {
    Json(serde_json::json!({
        "member_id": actor.member_id(),
    }))
}
