use std::sync::Arc;

use roster::{Gateway, RemoteError};
use tracing::info;

use super::{config::Config, session::SessionStore};

pub struct State {
    pub config: Config,
    pub gateway: Gateway,
    pub sessions: SessionStore,
}

impl State {
    pub fn new(config: Config) -> Result<Arc<Self>, RemoteError> {
        let gateway = Gateway::new(&config.gateway())?;
        info!("Backend at {}", gateway.server_url());

        let sessions = SessionStore::new(config.session_ttl);

        Ok(Arc::new(Self {
            config,
            gateway,
            sessions,
        }))
    }
}
