//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::sources::SourcingService;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// configuration and the one shared [`SourcingService`] instance - one
/// instance means one credential cache across every concurrent request.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: GatewayConfig,
    sourcing: SourcingService,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: GatewayConfig) -> Self {
        let sourcing = SourcingService::new(&config);

        Self {
            inner: Arc::new(AppStateInner { config, sourcing }),
        }
    }

    /// Get a reference to the gateway configuration.
    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }

    /// Get a reference to the sourcing service.
    #[must_use]
    pub fn sourcing(&self) -> &SourcingService {
        &self.inner.sourcing
    }
}
