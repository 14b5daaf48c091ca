//! Application state.

use std::sync::Arc;

use reelflow_supervisor::{Supervisor, SupervisorConfig, SupervisorHandle, TaskCatalog};

use crate::auth::TokenKeys;
use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub supervisor: SupervisorHandle,
    pub catalog: TaskCatalog,
    pub tokens: Arc<TokenKeys>,
}

impl AppState {
    /// Create application state and start the supervisor.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: ApiConfig, supervisor_config: SupervisorConfig) -> Self {
        let catalog = TaskCatalog::new(supervisor_config.catalog_path.clone());
        let tokens = TokenKeys::new(&config.jwt_secret, config.token_ttl);
        let supervisor = Supervisor::spawn(supervisor_config);

        Self {
            config,
            supervisor,
            catalog,
            tokens: Arc::new(tokens),
        }
    }
}
