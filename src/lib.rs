use config::Config;
use directory::UserDirectory;
use std::sync::Arc;

pub mod cache;
pub mod config;
pub mod database;
pub mod directory;
pub mod error;
pub mod middleware;
pub mod models;
pub mod router;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<UserDirectory>,
    pub config: Config,
}

impl AppState {
    pub fn new(directory: UserDirectory, config: Config) -> Self {
        Self {
            directory: Arc::new(directory),
            config,
        }
    }
}
