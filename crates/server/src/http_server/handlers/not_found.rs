use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;

pub async fn not_found_handler(uri: Uri, headers: HeaderMap) -> Response {
    tracing::debug!(path = %uri.path(), "no route");

    let wants_json = headers
        .get(axum::http::header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("application/json"));

    if wants_json {
        let err_msg = serde_json::json!({"msg": "not found", "path": uri.path()});
        (StatusCode::NOT_FOUND, Json(err_msg)).into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            [(axum::http::header::CONTENT_TYPE, "text/plain")],
            format!("not found: {}", uri.path()),
        )
            .into_response()
    }
}
