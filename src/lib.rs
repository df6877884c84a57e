use config::{Config, WebhookSettings};
use lifecycle::{LifecycleManager, TracingLifecycleManager};
use std::sync::Arc;
use storage::{memory::MemoryStore, Cache, Store};

pub mod config;
pub mod events;
pub mod lifecycle;
pub mod storage;
#[cfg(any(test, feature = "tests"))]
pub mod tests_utils;
pub mod webhook;

pub static DEFAULT_CONFIG_FILE_PATH: &str = "zenhub-webhook.toml";

/// Collaborators shared by every request.
pub struct State {
    pub cache: Arc<dyn Cache>,
    pub store: Arc<dyn Store>,
    pub lifecycler: Arc<dyn LifecycleManager>,
    pub settings: WebhookSettings,
}

impl State {
    pub fn new(
        cache: Arc<dyn Cache>,
        store: Arc<dyn Store>,
        lifecycler: Arc<dyn LifecycleManager>,
        settings: WebhookSettings,
    ) -> Self {
        Self {
            cache,
            store,
            lifecycler,
            settings,
        }
    }

    /// Backs both the cache and the store with a [`MemoryStore`] seeded from
    /// the configuration.
    pub fn from_config(config: &Config) -> Self {
        let memory = Arc::new(MemoryStore::from_seed(&config.seed));

        Self::new(
            memory.clone(),
            memory,
            Arc::new(TracingLifecycleManager),
            config.webhook.clone(),
        )
    }
}
