use crate::handlers::{logout, logout_all, me, refresh};
use crate::middleware::{require_auth, AuthGate};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};

/// Auth endpoints, to be nested under `/api/auth`
pub fn auth_routes(gate: AuthGate) -> Router {
    let gated = Router::new()
        .route("/logout-all", post(logout_all))
        .route("/me", get(me))
        .route_layer(middleware::from_fn_with_state(gate.clone(), require_auth));

    Router::new()
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .merge(gated)
        .with_state(gate)
}
