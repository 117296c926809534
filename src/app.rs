//! Application wiring
//!
//! Builds one instance of each component at startup and hands out shared
//! references. Nothing here is torn down before exit; logging out resets
//! the cache instead.

use crate::api::{ApiGateway, FeedApi, Transport, UreqTransport};
use crate::cache::EntityCache;
use crate::config::{Config, ConfigManager};
use crate::coordinator::MutationCoordinator;
use crate::error::FeedResult;
use crate::session::SessionStore;
use std::sync::Arc;
use tracing::debug;

/// The wired component graph
pub struct App {
    pub session: SessionStore,
    pub gateway: Arc<ApiGateway>,
    pub api: Arc<FeedApi>,
    pub cache: EntityCache,
    pub coordinator: Arc<MutationCoordinator>,
}

impl App {
    /// Wire the production graph over HTTP
    pub async fn bootstrap(config: &Config) -> FeedResult<Self> {
        let session_path = config
            .session
            .path
            .clone()
            .unwrap_or_else(ConfigManager::session_path);
        let session = SessionStore::open(session_path).await?;
        let transport = Arc::new(UreqTransport::new(config.api.timeout()));
        Ok(Self::with_transport(config, session, transport))
    }

    /// Wire the graph over an arbitrary transport
    pub fn with_transport(
        config: &Config,
        session: SessionStore,
        transport: Arc<dyn Transport>,
    ) -> Self {
        debug!(
            "Wiring against {} via {}",
            config.api.base_url,
            transport.name()
        );
        let gateway = Arc::new(ApiGateway::new(&config.api, transport, session.clone()));
        let api = Arc::new(FeedApi::new(gateway.clone(), &config.api));

        let cache = EntityCache::new(api.clone());
        cache.follow_mutations(&gateway);
        cache.follow_session(&session);

        let coordinator = Arc::new(MutationCoordinator::new(
            api.clone(),
            cache.clone(),
            session.clone(),
            &config.upload,
        ));

        Self {
            session,
            gateway,
            api,
            cache,
            coordinator,
        }
    }
}
