//! Forecast normalization and alert derivation.
//!
//! Turns a provider's [`ForecastReport`] into the client-facing [`WeatherData`]:
//! WMO weather codes become `{description, icon}` pairs and each day is checked
//! against the rain/wind/heat thresholds.

use chrono::DateTime;

use crate::model::{
    AlertItem, DailyConditions, DailyWeather, ForecastReport, TemperatureRange, WeatherData,
    WeatherSummary,
};

pub const RAIN_PROBABILITY_THRESHOLD: f64 = 70.0;
pub const WIND_SPEED_THRESHOLD_MPS: f64 = 15.0;
pub const HEAT_THRESHOLD_C: f64 = 32.0;

const UNKNOWN: (&str, &str) = ("unknown", "unknown");

/// Maps a WMO weather code to `(description, icon)`.
pub fn describe_weather_code(code: i64) -> (&'static str, &'static str) {
    match code {
        0 => ("clear sky", "clear_day"),
        1 => ("mainly clear", "mostly_clear"),
        2 => ("partly cloudy", "partly_cloudy"),
        3 => ("overcast", "cloudy"),
        45 => ("fog", "fog"),
        48 => ("depositing rime fog", "fog"),
        51 => ("light drizzle", "drizzle"),
        53 => ("moderate drizzle", "drizzle"),
        55 => ("dense drizzle", "drizzle"),
        61 => ("slight rain", "rain"),
        63 => ("moderate rain", "rain"),
        65 => ("heavy rain", "rain"),
        71 => ("slight snow", "snow"),
        73 => ("moderate snow", "snow"),
        75 => ("heavy snow", "snow"),
        80 => ("rain showers", "showers"),
        95 => ("thunderstorm", "thunder"),
        99 => ("hail thunderstorm", "hail"),
        _ => UNKNOWN,
    }
}

fn summary(code: Option<i64>) -> WeatherSummary {
    let (description, icon) = code.map(describe_weather_code).unwrap_or(UNKNOWN);
    WeatherSummary {
        description: description.to_string(),
        icon: icon.to_string(),
    }
}

/// Builds the canonical forecast, alerts included.
pub fn normalize(report: ForecastReport) -> WeatherData {
    let alerts = derive_alerts(&report.days);

    let daily = report
        .days
        .iter()
        .map(|d| DailyWeather {
            dt: d.dt,
            temp: TemperatureRange {
                max: d.temp_max,
                min: d.temp_min,
            },
            weather: vec![summary(d.weather_code)],
        })
        .collect();

    WeatherData {
        location_name: report.timezone,
        current: report.current,
        daily,
        alerts,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Rain,
    Wind,
    Heat,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Rain => "rain",
            AlertKind::Wind => "wind",
            AlertKind::Heat => "heat",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            AlertKind::Rain => "Heavy rain likely",
            AlertKind::Wind => "Strong wind",
            AlertKind::Heat => "High temperature",
        }
    }
}

/// English weekday name for a UTC epoch, independent of the host locale.
pub fn weekday_name(epoch_secs: i64) -> String {
    DateTime::from_timestamp(epoch_secs, 0)
        .map(|dt| dt.format("%A").to_string())
        .unwrap_or_else(|| "Unknown day".to_string())
}

fn alert(day: &DailyConditions, kind: AlertKind, message: String) -> AlertItem {
    AlertItem {
        id: format!("{}-{}", day.dt, kind.as_str()),
        title: kind.title().to_string(),
        message,
    }
}

/// Evaluates every day independently; a day may raise several alerts, always
/// in rain, wind, heat order. Pure and deterministic.
pub fn derive_alerts(days: &[DailyConditions]) -> Vec<AlertItem> {
    let mut alerts = Vec::new();

    for day in days {
        let weekday = weekday_name(day.dt);

        if let Some(pop) = day
            .precipitation_probability
            .filter(|p| *p >= RAIN_PROBABILITY_THRESHOLD)
        {
            let message = format!("{weekday}: Chance of rain ~{pop}%");
            alerts.push(alert(day, AlertKind::Rain, message));
        }
        if let Some(wind) = day.wind_speed_max.filter(|w| *w >= WIND_SPEED_THRESHOLD_MPS) {
            let message = format!("{weekday}: Gusts up to {wind} m/s");
            alerts.push(alert(day, AlertKind::Wind, message));
        }
        if let Some(high) = day.temp_max.filter(|t| *t >= HEAT_THRESHOLD_C) {
            let message = format!("{weekday}: High of {high} °C");
            alerts.push(alert(day, AlertKind::Heat, message));
        }
    }

    alerts
}
