use std::error::Error as StdError;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode, header::AUTHORIZATION},
    middleware::{Next, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::post,
};
use bytes::Bytes;
use taccuino_api_types::{UpsertPayload, WebhookPayload};

use crate::{
    application::{
        error::{ErrorReport, HttpError},
        secrets::SecretToken,
        writer::ContentWriter,
    },
    cache::ResponseCache,
};

use super::RouterState;

const SOURCE: &str = "infra::http::api";

#[derive(Clone)]
pub struct ApiState {
    pub writer: ContentWriter,
    pub publish_token: SecretToken,
    pub webhook_token: SecretToken,
    pub cache: Option<Arc<ResponseCache>>,
}

pub(super) fn router(state: &ApiState) -> Router<RouterState> {
    let publish = Router::new()
        .route("/api/blog", post(upsert))
        .layer(from_fn_with_state(
            state.publish_token.clone(),
            require_bearer,
        ));

    let webhook = Router::new()
        .route("/api/blog/webhook", post(handle_webhook))
        .layer(from_fn_with_state(
            state.webhook_token.clone(),
            require_bearer,
        ));

    publish.merge(webhook)
}

/// Reject the request before it reaches a handler unless the bearer token
/// equals the configured secret.
async fn require_bearer(
    State(token): State<SecretToken>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let presented = bearer_token(request.headers());
    if !token.matches(presented.as_deref()) {
        let mut response = (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
        ErrorReport::from_message(
            SOURCE,
            StatusCode::UNAUTHORIZED,
            "bearer token missing or mismatched",
        )
        .attach(&mut response);
        return response;
    }
    next.run(request).await
}

async fn upsert(State(state): State<ApiState>, body: Bytes) -> Response {
    let payload: UpsertPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(err) => {
            return HttpError::from_error(SOURCE, StatusCode::BAD_REQUEST, "Bad Request", &err)
                .into_response();
        }
    };

    match state.writer.upsert(payload).await {
        Ok(()) => {
            invalidate_cache(&state);
            StatusCode::NO_CONTENT.into_response()
        }
        Err(err) => write_failure(&err),
    }
}

async fn handle_webhook(State(state): State<ApiState>, body: Bytes) -> Response {
    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(err) => return write_failure(&err),
    };

    match state.writer.handle_event(payload).await {
        Ok(()) => {
            invalidate_cache(&state);
            StatusCode::NO_CONTENT.into_response()
        }
        Err(err) => write_failure(&err),
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let bearer = raw.strip_prefix("Bearer ")?;
    Some(bearer.to_string())
}

fn invalidate_cache(state: &ApiState) {
    if let Some(cache) = state.cache.as_ref() {
        cache.invalidate_all();
    }
}

/// Write-path failures carry the diagnostic chain in the body. The caller
/// is the trusted authenticated publisher, not a public client.
fn write_failure(err: &(dyn StdError + 'static)) -> Response {
    let report = ErrorReport::from_error(SOURCE, StatusCode::INTERNAL_SERVER_ERROR, err);
    let message = report.messages.join(": ");
    let mut response = (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "message": message })),
    )
        .into_response();
    report.attach(&mut response);
    response
}
