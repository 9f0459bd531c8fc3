use std::sync::Arc;

use anyhow::Context;
use weather_core::{
    Config, CredentialManager, ResponseCache, SavedLocationManager, WeatherService, open_store,
    provider::{forecaster_from_config, geocoder_from_config, http_client},
};

/// Everything a handler needs, owned once and shared behind an `Arc`.
#[derive(Debug)]
pub struct AppState {
    pub weather: WeatherService,
    pub locations: SavedLocationManager,
    pub credentials: CredentialManager,
    /// Saved-location routes demand a bearer token for the same user.
    pub require_auth: bool,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(
        weather: WeatherService,
        locations: SavedLocationManager,
        credentials: CredentialManager,
        require_auth: bool,
    ) -> SharedState {
        Arc::new(Self {
            weather,
            locations,
            credentials,
            require_auth,
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<SharedState> {
        let secret = config.jwt_secret()?;
        let store = open_store(&config.database.uri).context("Failed to open user store")?;

        let weather = weather_service(config)?;
        let locations = SavedLocationManager::new(store.clone());
        let credentials = CredentialManager::new(store, secret, config.token_ttl());

        Ok(Self::new(weather, locations, credentials, config.server.require_auth))
    }
}

/// Providers plus a fresh cache, wired from config.
pub fn weather_service(config: &Config) -> anyhow::Result<WeatherService> {
    let http = http_client(config)?;
    let geocoder = geocoder_from_config(config, http.clone())?;
    let forecaster = forecaster_from_config(config, http);

    Ok(WeatherService::new(
        Arc::new(ResponseCache::new(config.cache_ttl())),
        Arc::new(geocoder),
        Arc::new(forecaster),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use weather_core::ProviderId;

    #[test]
    fn from_config_requires_signing_secret() {
        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::Mapbox, "pk".into());

        let err = AppState::from_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("No token signing secret configured"));
    }

    #[test]
    fn from_config_requires_geocode_token() {
        let mut cfg = Config::default();
        cfg.auth.jwt_secret = Some("secret".into());

        let err = AppState::from_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("No API key configured for provider 'mapbox'"));
    }

    #[test]
    fn from_config_honors_require_auth() {
        let mut cfg = Config::default();
        cfg.auth.jwt_secret = Some("secret".into());
        cfg.server.require_auth = true;
        cfg.upsert_provider_api_key(ProviderId::Mapbox, "pk".into());

        let state = AppState::from_config(&cfg).unwrap();
        assert!(state.require_auth);
    }
}
