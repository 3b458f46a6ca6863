//! Startup orchestration.
//!
//! # Responsibilities
//! - Open the durable state store
//! - Build the registry, health store and router in dependency order
//! - Start the background prober
//! - Re-apply reloaded configuration to the live registry

use std::path::Path;
use std::sync::Arc;

use notify::RecommendedWatcher;
use tokio::task::JoinHandle;

use crate::config::watcher::ConfigWatcher;
use crate::config::{ConfigError, RouterConfig, StorageConfig};
use crate::health::{Clock, HealthStore, ProberHandle, SystemClock};
use crate::paths::PathRegistry;
use crate::routing::Router;
use crate::storage::{FileStore, KeyValueStore, MemoryStore};
use crate::transport::{HttpTransport, Transport};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("failed to watch config file: {0}")]
    Watch(#[from] notify::Error),
}

/// Open the durable store named by `config`, or an in-memory one.
///
/// Never fails: an unusable state file only costs routing history.
pub fn open_state_store(config: &StorageConfig) -> Arc<dyn KeyValueStore> {
    match &config.state_path {
        Some(path) => {
            let store = FileStore::open(path);
            tracing::info!(path = %store.path().display(), "Opened state store");
            Arc::new(store)
        }
        None => {
            tracing::info!("No state path configured, health state is in-memory only");
            Arc::new(MemoryStore::new())
        }
    }
}

/// A running router plus its background tasks.
pub struct RouterRuntime<T: Transport = HttpTransport> {
    router: Arc<Router<T>>,
    prober: Option<ProberHandle>,
}

impl RouterRuntime<HttpTransport> {
    /// Start with the reqwest transport. Must run inside a Tokio runtime.
    pub fn start(config: &RouterConfig) -> Result<Self, StartupError> {
        Ok(Self::with_transport(config, HttpTransport::new()?))
    }
}

impl<T: Transport> RouterRuntime<T> {
    pub fn with_transport(config: &RouterConfig, transport: T) -> Self {
        let durable = open_state_store(&config.storage);
        Self::assemble(config, transport, durable, Arc::new(SystemClock))
    }

    /// Wire everything from explicit parts.
    pub fn assemble(
        config: &RouterConfig,
        transport: T,
        durable: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let registry = Arc::new(PathRegistry::new(&config.paths, durable.clone()));
        let health = Arc::new(HealthStore::new(
            registry.clone(),
            durable,
            Arc::new(MemoryStore::new()),
            clock,
            config.health.clone(),
        ));
        let router = Arc::new(Router::new(config, registry, health, transport));

        let prober = if config.prober.enabled {
            Some(router.prober().spawn())
        } else {
            tracing::info!("Background prober disabled");
            None
        };

        tracing::info!(
            paths = router.registry().paths().len(),
            max_attempts = config.routing.max_attempts,
            "Router started"
        );

        Self { router, prober }
    }

    pub fn router(&self) -> &Arc<Router<T>> {
        &self.router
    }

    /// Apply a reloaded config. Only the path list is live-reloadable.
    pub fn apply_config(&self, config: &RouterConfig) {
        self.router.registry().reload(&config.paths);
    }

    /// Watch `path` and apply every valid change.
    ///
    /// The returned watcher must be kept alive for updates to flow.
    pub fn watch(&self, path: &Path) -> Result<(RecommendedWatcher, JoinHandle<()>), StartupError> {
        let (watcher, mut updates) = ConfigWatcher::new(path);
        let watcher = watcher.run()?;
        let registry = self.router.registry().clone();

        let task = tokio::spawn(async move {
            while let Some(config) = updates.recv().await {
                registry.reload(&config.paths);
            }
        });

        Ok((watcher, task))
    }

    /// Stop background tasks.
    pub async fn shutdown(self) {
        if let Some(prober) = self.prober {
            prober.stop().await;
        }
        tracing::info!("Router stopped");
    }
}
