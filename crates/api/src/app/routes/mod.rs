use axum::{
    routing::{get, post, put},
    Router,
};

pub mod storages;
pub mod stock;
pub mod system;

/// Router for all actor-scoped endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/stock", post(stock::store_intake))
        .route("/stock/:id", get(stock::get_entry).delete(stock::delete_entry))
        .route("/stock/:id/move-to-list", put(stock::move_to_list))
        .route("/stock/:id/deliver", put(stock::deliver))
        .nest("/storages", storages::router())
}
