//! Core library for the weather alerts service.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Adapters over the geocoding and forecast providers
//! - Forecast normalization and alert derivation
//! - Saved-location rules and the user store
//! - Shared domain models and the error taxonomy
//!
//! It is used by `weather-server`, but can also be reused by other binaries or services.

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod forecast;
pub mod locations;
pub mod model;
pub mod provider;
pub mod service;
pub mod store;

pub use auth::{Claims, CredentialManager};
pub use cache::ResponseCache;
pub use config::{Config, ProviderConfig};
pub use error::{Error, Result, StoreError};
pub use locations::{MAX_SAVED_LOCATIONS, SavedLocationManager};
pub use model::*;
pub use provider::{ForecastProvider, GeocodeProvider, ProviderId};
pub use service::{WeatherService, parse_coordinates};
pub use store::{MemoryUserStore, SqliteUserStore, UserStore, open_store};
