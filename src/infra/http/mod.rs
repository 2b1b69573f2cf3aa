mod api;
mod middleware;
mod public;

pub use api::ApiState;
pub use public::PublicState;

use axum::Router;
use axum::extract::FromRef;
use axum::middleware::from_fn;

use middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct RouterState {
    pub public: PublicState,
    pub api: ApiState,
}

impl FromRef<RouterState> for PublicState {
    fn from_ref(state: &RouterState) -> Self {
        state.public.clone()
    }
}

impl FromRef<RouterState> for ApiState {
    fn from_ref(state: &RouterState) -> Self {
        state.api.clone()
    }
}

/// Assemble the full application router: public reads, authenticated
/// writes, shared request-context and logging middleware.
pub fn build_router(state: RouterState) -> Router {
    public::router()
        .merge(api::router(&state.api))
        .with_state(state)
        .layer(from_fn(log_responses))
        .layer(from_fn(set_request_context))
}
