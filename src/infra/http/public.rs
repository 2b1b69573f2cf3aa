use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{Path, State},
    http::{
        HeaderMap, HeaderName, HeaderValue, StatusCode, Uri,
        header::{CACHE_CONTROL, CONTENT_TYPE, ETAG, IF_NONE_MATCH},
    },
    response::{IntoResponse, Response},
    routing::get,
};
use bytes::Bytes;
use tracing::debug;

use crate::{
    application::{
        error::HttpError,
        reader::{ArticleRead, ContentReader},
    },
    cache::{CacheKey, CachedResponse, ResponseCache},
    config::CacheSettings,
};

use super::RouterState;

const SOURCE: &str = "infra::http::public";
const FALLBACK_CACHE_CONTROL: &str = "public, max-age=300, s-maxage=30";

#[derive(Clone)]
pub struct PublicState {
    pub reader: ContentReader,
    pub cache: Option<Arc<ResponseCache>>,
    cache_control: HeaderValue,
}

impl PublicState {
    pub fn new(
        reader: ContentReader,
        cache: Option<Arc<ResponseCache>>,
        settings: &CacheSettings,
    ) -> Self {
        let directive = format!(
            "public, max-age={}, s-maxage={}",
            settings.client_max_age.as_secs(),
            settings.shared_max_age.as_secs()
        );
        let cache_control = HeaderValue::from_str(&directive)
            .unwrap_or_else(|_| HeaderValue::from_static(FALLBACK_CACHE_CONTROL));
        Self {
            reader,
            cache,
            cache_control,
        }
    }
}

pub(super) fn router() -> Router<RouterState> {
    Router::new()
        .route("/blog", get(list_articles))
        .route("/blog/{*slug}", get(get_article))
        .route("/_health", get(health))
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn list_articles(State(state): State<PublicState>, uri: Uri, headers: HeaderMap) -> Response {
    let token = validation_token(&headers);
    let key = CacheKey::new(uri.path(), uri.query().unwrap_or(""), token.as_deref());
    if let Some(hit) = cached(&state, &key) {
        return replay(hit);
    }

    let articles = match state.reader.list().await {
        Ok(articles) => articles,
        Err(err) => return err.into_response(),
    };
    let payload = match serde_json::to_vec(&articles) {
        Ok(payload) => payload,
        Err(err) => return encode_failure(&err),
    };

    let captured = CachedResponse {
        status: StatusCode::OK.as_u16(),
        headers: vec![
            header_pair(&CONTENT_TYPE, &HeaderValue::from_static("application/json")),
            header_pair(&CACHE_CONTROL, &state.cache_control),
        ],
        body: Bytes::from(payload),
    };
    store_detached(state.cache.clone(), key, captured.clone());
    replay(captured)
}

async fn get_article(
    State(state): State<PublicState>,
    Path(slug): Path<String>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let token = validation_token(&headers);
    let key = CacheKey::new(uri.path(), uri.query().unwrap_or(""), token.as_deref());
    if let Some(hit) = cached(&state, &key) {
        return replay(hit);
    }

    match state.reader.article(&slug, token.as_deref()).await {
        Ok(ArticleRead::NotModified) => {
            let mut header_pairs = vec![header_pair(&CACHE_CONTROL, &state.cache_control)];
            if let Some(token) = token.as_deref()
                && let Ok(value) = HeaderValue::from_str(token)
            {
                header_pairs.push(header_pair(&ETAG, &value));
            }
            let captured = CachedResponse {
                status: StatusCode::NOT_MODIFIED.as_u16(),
                headers: header_pairs,
                body: Bytes::new(),
            };
            store_detached(state.cache.clone(), key, captured.clone());
            replay(captured)
        }
        Ok(ArticleRead::Fresh { body, hash }) => {
            let payload = match serde_json::to_vec(&body) {
                Ok(payload) => payload,
                Err(err) => return encode_failure(&err),
            };

            let mut header_pairs = vec![
                header_pair(&CONTENT_TYPE, &HeaderValue::from_static("application/json")),
                header_pair(&CACHE_CONTROL, &state.cache_control),
            ];
            if let Some(hash) = hash.as_deref()
                && let Ok(value) = HeaderValue::from_str(hash)
            {
                header_pairs.push(header_pair(&ETAG, &value));
            }

            let captured = CachedResponse {
                status: StatusCode::OK.as_u16(),
                headers: header_pairs,
                body: Bytes::from(payload),
            };
            store_detached(state.cache.clone(), key, captured.clone());
            replay(captured)
        }
        Err(err) => err.into_response(),
    }
}

fn validation_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
}

fn cached(state: &PublicState, key: &CacheKey) -> Option<CachedResponse> {
    let cache = state.cache.as_ref()?;
    let hit = cache.get(key)?;
    debug!(target = SOURCE, path = %key.path, "served response from cache");
    Some(hit)
}

/// Population is detached from the request: the caller already has the
/// response, a lost write only costs a future cache miss.
fn store_detached(cache: Option<Arc<ResponseCache>>, key: CacheKey, captured: CachedResponse) {
    let Some(cache) = cache else {
        return;
    };
    tokio::spawn(async move {
        let path = key.path.clone();
        cache.store(key, captured);
        debug!(target = SOURCE, path = %path, "stored response in cache");
    });
}

fn replay(cached: CachedResponse) -> Response {
    let mut response = Response::new(Body::from(cached.body));
    *response.status_mut() = StatusCode::from_u16(cached.status).unwrap_or(StatusCode::OK);
    for (name, value) in cached.headers {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            response.headers_mut().append(name, value);
        }
    }
    response
}

fn header_pair(name: &HeaderName, value: &HeaderValue) -> (String, String) {
    (
        name.as_str().to_string(),
        value.to_str().unwrap_or_default().to_string(),
    )
}

fn encode_failure(err: &serde_json::Error) -> Response {
    HttpError::from_error(
        SOURCE,
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal Error",
        err,
    )
    .into_response()
}
