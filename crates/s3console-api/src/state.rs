//! Shared handler state

use s3console_auth::CredentialResolver;
use s3console_common::ConsoleSettings;
use s3console_store::StoreFactory;
use std::sync::Arc;

/// Immutable state shared by every request
pub struct AppState {
    /// Exchanges the request's user id for scoped credentials
    pub resolver: Arc<dyn CredentialResolver>,
    /// Builds a store client from those credentials
    pub stores: Arc<dyn StoreFactory>,
    pub settings: ConsoleSettings,
}

impl AppState {
    #[must_use]
    pub fn new(
        resolver: Arc<dyn CredentialResolver>,
        stores: Arc<dyn StoreFactory>,
        settings: ConsoleSettings,
    ) -> Self {
        Self {
            resolver,
            stores,
            settings,
        }
    }
}
