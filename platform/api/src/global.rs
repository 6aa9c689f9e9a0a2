use std::sync::Arc;

use crate::config::AppConfig;
use crate::crypto::TokenCipher;
use crate::geocode::Geocoder;
use crate::notifier::PushClient;

/// Process-wide state. Constructed once at bootstrap; every client handle
/// (database pool, push provider, geocoder) is built here and injected, not
/// lazily initialized at first use.
pub struct GlobalState {
    pub config: AppConfig,
    pub db: Arc<sqlx::PgPool>,
    pub push: Arc<dyn PushClient>,
    pub geocoder: Geocoder,
    pub device_cipher: TokenCipher,
    pub ingest_cipher: TokenCipher,
}

impl GlobalState {
    pub fn new(config: AppConfig, db: Arc<sqlx::PgPool>, push: Arc<dyn PushClient>) -> Self {
        Self {
            geocoder: Geocoder::new(&config.geocoder),
            device_cipher: TokenCipher::new(&config.device_auth.secret),
            ingest_cipher: TokenCipher::new(&config.ingest.secret),
            config,
            db,
            push,
        }
    }
}
