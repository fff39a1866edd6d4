use axum::routing::{get, post};
use axum::Router;

use common::api::{FETCH_BLOB_PATH, PUBLIC_KEY_PATH, STORE_BLOB_PATH};

pub mod fetch;
pub mod publish_key;
pub mod store;

use crate::ServerState;

pub fn router(state: ServerState) -> Router<ServerState> {
    Router::new()
        .route(PUBLIC_KEY_PATH, post(publish_key::handler))
        .route(STORE_BLOB_PATH, post(store::handler))
        .route(FETCH_BLOB_PATH, get(fetch::handler))
        .with_state(state)
}
