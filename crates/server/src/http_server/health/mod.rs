use axum::routing::get;
use axum::Router;

use crate::ServerState;

mod liveness;
mod version;

pub fn router(state: ServerState) -> Router<ServerState> {
    Router::new()
        .route("/livez", get(liveness::handler))
        .route("/version", get(version::handler))
        .with_state(state)
}
