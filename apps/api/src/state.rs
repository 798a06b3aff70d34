use std::sync::Arc;

use crate::auth::registry::UserRegistry;
use crate::auth::session::SessionStore;
use crate::config::Config;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub registry: UserRegistry,
    /// Redis in production; in-memory when `REDIS_URL` is unset.
    pub sessions: Arc<dyn SessionStore>,
    pub config: Config,
}
