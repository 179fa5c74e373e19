//! Authentication gate for Axum services
//!
//! Wraps the refresh protocol from `auth-session` in request middleware and
//! the auth HTTP endpoints:
//!
//! - [`require_auth`] and [`optional_auth`] middleware attach an
//!   [`AuthContext`] to request extensions
//! - [`auth_routes`] serves refresh, logout, logout-all and me
//! - [`GateRejection`] maps every refresh outcome onto a status code
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use auth_gateway::{auth_routes, require_auth, AuthGate, GateConfig};
//! use axum::{middleware, routing::get, Router};
//!
//! # fn build(engine: Arc<auth_session::RefreshEngine>) -> Result<Router, auth_gateway::GateConfigError> {
//! let gate = AuthGate::new(engine, GateConfig::default(), None)?;
//!
//! let app = Router::new()
//!     .route("/api/reports", get(|| async { "reports" }))
//!     .route_layer(middleware::from_fn_with_state(gate.clone(), require_auth))
//!     .nest("/api/auth", auth_routes(gate));
//! # Ok(app)
//! # }
//! ```

pub mod config;
pub mod context;
pub mod cookie;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod router;

pub use config::{CookieConfig, Environment, GateConfig, GateConfigError};
pub use context::{AuthContext, AuthMethod};
pub use error::GateRejection;
pub use middleware::{optional_auth, require_auth, AuthGate, ACCESS_TOKEN_HEADER};
pub use router::auth_routes;
