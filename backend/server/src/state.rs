use std::sync::Arc;

use anyhow::Result;

use super::{
    auth::{IdentityProvider, IdentityToolkit},
    config::Config,
    database::{DocumentStore, init_store},
    payments::{MercadoPago, PaymentGateway},
};

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn DocumentStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub payments: Arc<dyn PaymentGateway>,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Arc<Self>> {
        let store = init_store(&config).await?;

        let identity = Arc::new(IdentityToolkit::new(
            &config.identity_api_url,
            config.identity_api_key.clone(),
        )?);

        let payments = Arc::new(MercadoPago::new(
            &config.payment_api_url,
            config.payment_access_token.clone(),
            config.payment_timeout,
        )?);

        Ok(Self::from_parts(config, store, identity, payments))
    }

    pub fn from_parts(
        config: Config,
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
        payments: Arc<dyn PaymentGateway>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            store,
            identity,
            payments,
        })
    }
}
