use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::{Password, Text};
use std::path::PathBuf;
use weather_core::{
    Config, ProviderId, WeatherData, forecast, parse_coordinates,
    provider::{ForecastProvider, forecaster_from_config, http_client},
};

use weather_server::state::weather_service;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-server", version, about = "Weather alerts API server")]
pub struct Cli {
    /// Config file to use instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP API.
    Serve {
        /// Listening port; overrides config and PORT.
        #[arg(long)]
        port: Option<u16>,
    },

    /// Configure credentials for a specific provider.
    Configure {
        /// Provider short name, e.g. "mapbox" or "open-meteo".
        provider: String,
    },

    /// Look up place suggestions.
    Geocode {
        /// Free-text place name.
        query: String,
    },

    /// Show the forecast and alerts for a coordinate pair.
    Forecast {
        #[arg(long, allow_hyphen_values = true)]
        lat: String,

        #[arg(long, allow_hyphen_values = true)]
        lon: String,
    },
}

impl Cli {
    fn config_path(&self) -> anyhow::Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => Config::config_file_path(),
        }
    }

    /// File values overlaid with the environment.
    fn effective_config(&self) -> anyhow::Result<Config> {
        let mut config = Config::load_from(&self.config_path()?)?;
        config.apply_env()?;
        Ok(config)
    }

    pub async fn run(self) -> anyhow::Result<()> {
        match &self.command {
            Command::Serve { port } => {
                let mut config = self.effective_config()?;
                if let Some(port) = port {
                    config.server.port = *port;
                }
                weather_server::start_server(config).await?;
            }
            Command::Configure { provider } => {
                let id = ProviderId::try_from(provider.as_str())?;
                let path = self.config_path()?;
                // Only file values are persisted, never the environment overlay.
                let mut config = Config::load_from(&path)?;
                configure(&mut config, id)?;
                config.save_to(&path)?;
                println!("Saved {id} settings to {}", path.display());
            }
            Command::Geocode { query } => {
                let service = weather_service(&self.effective_config()?)?;
                let suggestions = service.geocode(query).await?;

                if suggestions.is_empty() {
                    println!("No places found for '{}'", query.trim());
                }
                for s in suggestions {
                    println!("{} ({:.4}, {:.4}) [{}]", s.name, s.lat, s.lon, s.id);
                }
            }
            Command::Forecast { lat, lon } => {
                let config = self.effective_config()?;
                let coords = parse_coordinates(Some(lat.as_str()), Some(lon.as_str()))?;
                let forecaster = forecaster_from_config(&config, http_client(&config)?);
                let report = forecaster
                    .fetch(coords)
                    .await
                    .context("Forecast request failed")?;

                print_forecast(&forecast::normalize(report));
            }
        }

        Ok(())
    }
}

fn configure(config: &mut Config, id: ProviderId) -> anyhow::Result<()> {
    match id {
        ProviderId::Mapbox => {
            let key = Password::new("Mapbox access token:")
                .without_confirmation()
                .prompt()
                .context("Failed to read access token")?;
            config.upsert_provider_api_key(id, key.trim().to_string());
        }
        ProviderId::OpenMeteo => {
            let url = Text::new("Open-Meteo base URL:")
                .with_default(id.default_base_url())
                .prompt()
                .context("Failed to read base URL")?;
            config.set_provider_base_url(id, url.trim().to_string());
        }
    }
    Ok(())
}

fn print_forecast(data: &WeatherData) {
    println!("{}", data.location_name);
    println!(
        "Now: {} °C, humidity {}%, wind {} m/s",
        data.current.temp, data.current.humidity, data.current.wind_speed
    );

    for day in &data.daily {
        let date = chrono::DateTime::from_timestamp(day.dt, 0)
            .map(|d| d.format("%a %Y-%m-%d").to_string())
            .unwrap_or_else(|| day.dt.to_string());
        let summary = day
            .weather
            .first()
            .map(|w| w.description.as_str())
            .unwrap_or("unknown");
        let max = celsius(day.temp.max);
        let min = celsius(day.temp.min);
        println!("  {date}  {max:>5} / {min:<5} °C  {summary}");
    }

    if data.alerts.is_empty() {
        println!("No alerts.");
    }
    for alert in &data.alerts {
        println!("! {}: {}", alert.title, alert.message);
    }
}

fn celsius(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
