use std::{sync::Arc, time::Duration};

use crate::{
    auth::{AccessGuard, SessionResolver, TokenExchangeService},
    config::Config,
    errors::{AppError, AppResult},
    services::AttemptRegistry,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub exchange: Arc<TokenExchangeService>,
    pub guard: AccessGuard,
    pub attempts: Arc<AttemptRegistry>,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: Config) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.submit_timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        let resolver = Arc::new(SessionResolver::from_config(&config)?);
        let exchange = Arc::new(TokenExchangeService::new(http.clone(), &config)?);
        let guard = AccessGuard::new(resolver, config.admin_role.clone());

        Ok(Self {
            config: Arc::new(config),
            exchange,
            guard,
            attempts: Arc::new(AttemptRegistry::new()),
            http,
        })
    }
}
