use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A candidate place returned by geocoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

/// A user's persisted favorite place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedLocation {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

impl From<Suggestion> for SavedLocation {
    fn from(s: Suggestion) -> Self {
        Self {
            id: s.id,
            name: s.name,
            lat: s.lat,
            lon: s.lon,
        }
    }
}

/// A validated coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    /// Cache key with each coordinate rounded to 4 decimal places, so nearby
    /// repeated queries share an entry.
    pub fn cache_key(&self) -> String {
        format!("om:{:.4}:{:.4}", self.lat, self.lon)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    pub temp: f64,
    pub humidity: f64,
    pub wind_speed: f64,
}

/// Either bound is `null` when the provider has no value for that day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureRange {
    pub max: Option<f64>,
    pub min: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSummary {
    pub description: String,
    pub icon: String,
}

/// One forecast day as exposed to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyWeather {
    /// Epoch seconds of the day (UTC midnight).
    pub dt: i64,
    pub temp: TemperatureRange,
    pub weather: Vec<WeatherSummary>,
}

/// A generated advisory tied to one forecast day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertItem {
    pub id: String,
    pub title: String,
    pub message: String,
}

/// Normalized current conditions, multi-day forecast and derived alerts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherData {
    #[serde(rename = "locationName")]
    pub location_name: String,
    pub current: CurrentWeather,
    pub daily: Vec<DailyWeather>,
    pub alerts: Vec<AlertItem>,
}

/// Provider-neutral daily aggregates, before code lookup and alerting.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyConditions {
    pub dt: i64,
    pub temp_max: Option<f64>,
    pub temp_min: Option<f64>,
    pub weather_code: Option<i64>,
    /// Precipitation probability in percent.
    pub precipitation_probability: Option<f64>,
    /// Max wind speed in m/s.
    pub wind_speed_max: Option<f64>,
}

/// What a forecast provider hands back: already in canonical units, not yet
/// normalized into [`WeatherData`].
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastReport {
    /// Timezone identifier resolved by the provider; surfaces as `locationName`.
    pub timezone: String,
    pub current: CurrentWeather,
    pub days: Vec<DailyConditions>,
}

/// Stored user document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub saved_locations: Vec<SavedLocation>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to create a user; the store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// User record safe to return to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl From<&User> for PublicUser {
    fn from(u: &User) -> Self {
        Self {
            id: u.id.clone(),
            name: u.name.clone(),
            email: u.email.clone(),
        }
    }
}

/// Result of a successful register or login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub token: String,
    pub user: PublicUser,
}
