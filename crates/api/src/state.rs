use std::sync::Arc;

use dispatch_core::context::DispatchContext;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Job store, worker registry and dispatcher for the selected backend.
    pub ctx: DispatchContext,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}
