use std::sync::Arc;

use crate::{
    config::Config,
    mailer::{BrevoMailer, Mailer},
    store::{Store, postgres::PgStore},
};

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub async fn new() -> Arc<Self> {
        let config = Config::load();

        let store = PgStore::connect(&config.database_url)
            .await
            .expect("failed to connect to database");
        let mailer = BrevoMailer::new(config.brevo_api_key.clone());

        Arc::new(Self {
            config,
            store: Arc::new(store),
            mailer: Arc::new(mailer),
        })
    }
}
