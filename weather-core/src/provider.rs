use crate::{
    Config,
    model::{Coordinates, ForecastReport, Suggestion},
    provider::{mapbox::MapboxGeocoder, open_meteo::OpenMeteoForecaster},
};
use async_trait::async_trait;
use reqwest::Client;
use std::{convert::TryFrom, fmt::Debug};

pub mod mapbox;
pub mod open_meteo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    Mapbox,
    OpenMeteo,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Mapbox => "mapbox",
            ProviderId::OpenMeteo => "open-meteo",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::Mapbox, ProviderId::OpenMeteo]
    }

    /// Comma-separated provider names, for help and error text.
    pub fn supported() -> String {
        Self::all()
            .iter()
            .map(ProviderId::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderId::Mapbox => "https://api.mapbox.com",
            ProviderId::OpenMeteo => "https://api.open-meteo.com",
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    /// Case-insensitive; hyphens and underscores are ignored, so
    /// `Open_Meteo` and `openmeteo` both name Open-Meteo.
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let folded = |s: &str| {
            s.chars()
                .filter(|c| *c != '-' && *c != '_')
                .flat_map(char::to_lowercase)
                .collect::<String>()
        };
        let wanted = folded(value.trim());

        Self::all()
            .iter()
            .copied()
            .find(|id| folded(id.as_str()) == wanted)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown provider '{value}'. Supported providers: {}.",
                    Self::supported()
                )
            })
    }
}

/// Place search. Implementations return at most [`GEOCODE_LIMIT`] suggestions
/// in the provider's ranking order.
#[async_trait]
pub trait GeocodeProvider: Send + Sync + Debug {
    async fn search(&self, query: &str) -> anyhow::Result<Vec<Suggestion>>;
}

/// Current conditions plus daily aggregates for one coordinate pair.
#[async_trait]
pub trait ForecastProvider: Send + Sync + Debug {
    async fn fetch(&self, coords: Coordinates) -> anyhow::Result<ForecastReport>;
}

pub const GEOCODE_LIMIT: usize = 5;

/// Shared HTTP client with the configured upstream timeout.
pub fn http_client(config: &Config) -> anyhow::Result<Client> {
    Client::builder()
        .timeout(config.upstream_timeout())
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {e}"))
}

fn base_url(id: ProviderId, config: &Config) -> String {
    config
        .provider_config(id)
        .and_then(|p| p.base_url.clone())
        .unwrap_or_else(|| id.default_base_url().to_string())
}

/// Construct the geocoder from config. Mapbox requires an access token.
pub fn geocoder_from_config(config: &Config, http: Client) -> anyhow::Result<MapboxGeocoder> {
    let id = ProviderId::Mapbox;
    let api_key = config.provider_api_key(id).ok_or_else(|| {
        anyhow::anyhow!(
            "No API key configured for provider '{id}'.\n\
                 Hint: set MAPBOX_TOKEN or run `weather-server configure {id}`."
        )
    })?;

    Ok(MapboxGeocoder::new(
        http,
        base_url(id, config),
        api_key.to_owned(),
    ))
}

/// Construct the forecaster from config. Open-Meteo needs no key.
pub fn forecaster_from_config(config: &Config, http: Client) -> OpenMeteoForecaster {
    OpenMeteoForecaster::new(http, base_url(ProviderId::OpenMeteo, config))
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn provider_names_accept_common_spellings() {
        for raw in ["open-meteo", "OpenMeteo", "open_meteo", " Open-Meteo "] {
            assert_eq!(ProviderId::try_from(raw).unwrap(), ProviderId::OpenMeteo, "{raw}");
        }
        assert_eq!(ProviderId::try_from("MAPBOX").unwrap(), ProviderId::Mapbox);
    }

    #[test]
    fn unknown_provider_lists_supported_names() {
        let err = ProviderId::try_from("openweather").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unknown provider 'openweather'. Supported providers: mapbox, open-meteo."
        );
    }

    #[test]
    fn geocoder_from_config_errors_when_missing_api_key() {
        let cfg = Config::default();
        let err = geocoder_from_config(&cfg, Client::new()).unwrap_err();
        assert!(err.to_string().contains("No API key configured for provider 'mapbox'"));
    }

    #[test]
    fn geocoder_from_config_works_when_configured() {
        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::Mapbox, "pk.test".to_string());

        assert!(geocoder_from_config(&cfg, Client::new()).is_ok());
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let long = "é".repeat(300);
        let out = truncate_body(&long);

        assert!(out.ends_with("..."));
        assert_eq!(out.chars().count(), 203);
        assert_eq!(truncate_body("short"), "short");
    }
}
