use anyhow::{Context, Result, anyhow, ensure};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;

use crate::model::{Coordinates, CurrentWeather, DailyConditions, ForecastReport};

use super::{ForecastProvider, truncate_body};

const DAILY_FIELDS: &str = concat!(
    "temperature_2m_max,temperature_2m_min,weathercode,",
    "precipitation_probability_max,windspeed_10m_max",
);

/// Open-Meteo forecast API (`/v1/forecast`), timezone resolved upstream.
#[derive(Debug, Clone)]
pub struct OpenMeteoForecaster {
    http: Client,
    base_url: String,
}

impl OpenMeteoForecaster {
    pub fn new(http: Client, base_url: String) -> Self {
        Self { http, base_url }
    }
}

#[derive(Debug, Deserialize)]
struct OmCurrent {
    temperature: f64,
    windspeed: f64,
    relativehumidity: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OmDaily {
    time: Vec<String>,
    temperature_2m_max: Vec<Option<f64>>,
    temperature_2m_min: Vec<Option<f64>>,
    weathercode: Vec<Option<i64>>,
    precipitation_probability_max: Vec<Option<f64>>,
    windspeed_10m_max: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct OmResponse {
    timezone: String,
    current_weather: OmCurrent,
    daily: OmDaily,
}

/// `YYYY-MM-DD` to the epoch seconds of that day's UTC midnight.
fn day_epoch(date: &str) -> Result<i64> {
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .with_context(|| format!("Invalid daily date '{date}'"))?;
    let midnight = day
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow!("Invalid daily date '{date}'"))?;
    Ok(midnight.and_utc().timestamp())
}

impl TryFrom<OmResponse> for ForecastReport {
    type Error = anyhow::Error;

    fn try_from(r: OmResponse) -> Result<Self> {
        let d = &r.daily;
        let n = d.time.len();
        ensure!(
            [
                d.temperature_2m_max.len(),
                d.temperature_2m_min.len(),
                d.weathercode.len(),
                d.precipitation_probability_max.len(),
                d.windspeed_10m_max.len(),
            ]
            .iter()
            .all(|len| *len == n),
            "Open-Meteo daily arrays have mismatched lengths"
        );

        let days = (0..n)
            .map(|i| {
                Ok(DailyConditions {
                    dt: day_epoch(&d.time[i])?,
                    temp_max: d.temperature_2m_max[i],
                    temp_min: d.temperature_2m_min[i],
                    weather_code: d.weathercode[i],
                    precipitation_probability: d.precipitation_probability_max[i],
                    wind_speed_max: d.windspeed_10m_max[i],
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ForecastReport {
            timezone: r.timezone,
            current: CurrentWeather {
                temp: r.current_weather.temperature,
                humidity: r.current_weather.relativehumidity.unwrap_or(0.0),
                wind_speed: r.current_weather.windspeed,
            },
            days,
        })
    }
}

#[async_trait]
impl ForecastProvider for OpenMeteoForecaster {
    async fn fetch(&self, coords: Coordinates) -> Result<ForecastReport> {
        let url = format!("{}/v1/forecast", self.base_url.trim_end_matches('/'));

        tracing::debug!(
            lat = coords.lat,
            lon = coords.lon,
            "Open-Meteo forecast request"
        );

        let res = self
            .http
            .get(&url)
            .query(&[
                ("latitude", coords.lat.to_string()),
                ("longitude", coords.lon.to_string()),
                ("current_weather", "true".to_string()),
                ("daily", DAILY_FIELDS.to_string()),
                ("timezone", "auto".to_string()),
            ])
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("Failed to send request to Open-Meteo (forecast)")?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(reqwest::Error::without_url)
            .context("Failed to read Open-Meteo forecast response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "Open-Meteo forecast request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        let parsed: OmResponse =
            serde_json::from_str(&body).context("Failed to parse Open-Meteo forecast JSON")?;

        ForecastReport::try_from(parsed)
    }
}
