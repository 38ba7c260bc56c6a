use std::sync::Arc;

use db::DBService;

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;

use config::Config;

/// Shared handler state. Cloned per request; holds no mutable state of its own.
#[derive(Clone)]
pub struct DeploymentImpl {
    db: DBService,
    config: Arc<Config>,
}

impl DeploymentImpl {
    pub fn new(db: DBService, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
