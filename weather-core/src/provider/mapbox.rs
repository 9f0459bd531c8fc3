use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::model::Suggestion;

use super::{GEOCODE_LIMIT, GeocodeProvider, truncate_body};

/// Mapbox place search (`/geocoding/v5/mapbox.places/{query}.json`).
#[derive(Debug, Clone)]
pub struct MapboxGeocoder {
    http: Client,
    base_url: String,
    access_token: String,
}

impl MapboxGeocoder {
    pub fn new(http: Client, base_url: String, access_token: String) -> Self {
        Self {
            http,
            base_url,
            access_token,
        }
    }

    fn search_url(&self, query: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("Invalid Mapbox base URL: {}", self.base_url))?;

        url.path_segments_mut()
            .map_err(|_| anyhow!("Mapbox base URL cannot carry a path: {}", self.base_url))?
            .pop_if_empty()
            .extend(["geocoding", "v5", "mapbox.places"])
            .push(&format!("{query}.json"));

        Ok(url)
    }
}

#[derive(Debug, Deserialize)]
struct MbFeature {
    id: String,
    place_name: String,
    /// `[lon, lat]`
    center: (f64, f64),
}

#[derive(Debug, Deserialize)]
struct MbResponse {
    features: Vec<MbFeature>,
}

impl From<MbFeature> for Suggestion {
    fn from(f: MbFeature) -> Self {
        let (lon, lat) = f.center;
        Suggestion {
            id: f.id,
            name: f.place_name,
            lat,
            lon,
        }
    }
}

#[async_trait]
impl GeocodeProvider for MapboxGeocoder {
    async fn search(&self, query: &str) -> Result<Vec<Suggestion>> {
        let url = self.search_url(query)?;
        let limit = GEOCODE_LIMIT.to_string();

        tracing::debug!(%query, "Mapbox place search");

        let res = self
            .http
            .get(url)
            .query(&[
                ("access_token", self.access_token.as_str()),
                ("limit", limit.as_str()),
                ("types", "place"),
            ])
            .send()
            .await
            // The request URL carries the access token.
            .map_err(reqwest::Error::without_url)
            .context("Failed to send request to Mapbox (geocoding)")?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(reqwest::Error::without_url)
            .context("Failed to read Mapbox geocoding response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "Mapbox geocoding request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        let parsed: MbResponse =
            serde_json::from_str(&body).context("Failed to parse Mapbox geocoding JSON")?;

        Ok(parsed
            .features
            .into_iter()
            .take(GEOCODE_LIMIT)
            .map(Suggestion::from)
            .collect())
    }
}
