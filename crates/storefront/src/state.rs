//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::{BackendConfig, StorefrontConfig};
use crate::services::auth::{IdentityProvider, MemoryIdentityProvider};
use crate::services::identity_hub::IdentityHub;
use crate::store::{DataStore, MemoryStore};
use crate::supabase::{SupabaseAuth, SupabaseClient, SupabaseStore};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// configured backends and the identity hub.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    store: Arc<dyn DataStore>,
    identity: Arc<dyn IdentityProvider>,
    hub: IdentityHub,
}

impl AppState {
    /// Create the state for the configured backend.
    #[must_use]
    pub fn new(config: StorefrontConfig) -> Self {
        let (store, identity): (Arc<dyn DataStore>, Arc<dyn IdentityProvider>) =
            match &config.backend {
                BackendConfig::Supabase(supabase) => {
                    let client = SupabaseClient::new(supabase);
                    (
                        Arc::new(SupabaseStore::new(client.clone())),
                        Arc::new(SupabaseAuth::new(client)),
                    )
                }
                BackendConfig::Memory => (
                    Arc::new(MemoryStore::seeded()),
                    Arc::new(MemoryIdentityProvider::new()),
                ),
            };

        Self::with_backends(config, store, identity)
    }

    /// Create the state around explicit backends.
    #[must_use]
    pub fn with_backends(
        config: StorefrontConfig,
        store: Arc<dyn DataStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                identity,
                hub: IdentityHub::new(),
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Shared handle to the data store.
    #[must_use]
    pub fn store(&self) -> Arc<dyn DataStore> {
        Arc::clone(&self.inner.store)
    }

    /// Get a reference to the identity provider.
    #[must_use]
    pub fn identity(&self) -> &dyn IdentityProvider {
        self.inner.identity.as_ref()
    }

    /// Get a reference to the identity change hub.
    #[must_use]
    pub fn hub(&self) -> &IdentityHub {
        &self.inner.hub
    }
}
