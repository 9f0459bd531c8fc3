use std::sync::Arc;

use crate::{
    cache::ResponseCache,
    error::{Error, Result},
    forecast,
    model::{Coordinates, Suggestion, WeatherData},
    provider::{ForecastProvider, GeocodeProvider},
};

/// Parses raw `lat`/`lon` inputs; both must be present and finite.
pub fn parse_coordinates(lat: Option<&str>, lon: Option<&str>) -> Result<Coordinates> {
    let parse = |raw: Option<&str>| {
        raw.and_then(|s| s.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .ok_or(Error::InvalidCoordinates)
    };

    Ok(Coordinates {
        lat: parse(lat)?,
        lon: parse(lon)?,
    })
}

/// Geocoding and forecasts behind the shared response cache.
#[derive(Debug, Clone)]
pub struct WeatherService {
    cache: Arc<ResponseCache>,
    geocoder: Arc<dyn GeocodeProvider>,
    forecaster: Arc<dyn ForecastProvider>,
}

impl WeatherService {
    pub fn new(
        cache: Arc<ResponseCache>,
        geocoder: Arc<dyn GeocodeProvider>,
        forecaster: Arc<dyn ForecastProvider>,
    ) -> Self {
        Self {
            cache,
            geocoder,
            forecaster,
        }
    }

    /// Place suggestions for a free-text query, cached under `geo:<lowercased query>`.
    pub async fn geocode(&self, query: &str) -> Result<Vec<Suggestion>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidQuery);
        }

        let key = format!("geo:{}", query.to_lowercase());
        if let Some(hit) = self.cache.get::<Vec<Suggestion>>(&key) {
            tracing::debug!(%key, "geocode cache hit");
            return Ok(hit);
        }

        let suggestions = self.geocoder.search(query).await.map_err(Error::Upstream)?;

        self.cache.set(&key, &suggestions);
        Ok(suggestions)
    }

    /// Normalized forecast with alerts, cached per coordinates rounded to 4 decimals.
    pub async fn forecast(&self, coords: Coordinates) -> Result<WeatherData> {
        if !coords.lat.is_finite() || !coords.lon.is_finite() {
            return Err(Error::InvalidCoordinates);
        }

        let key = coords.cache_key();
        if let Some(hit) = self.cache.get::<WeatherData>(&key) {
            tracing::debug!(%key, "forecast cache hit");
            return Ok(hit);
        }

        let report = self.forecaster.fetch(coords).await.map_err(Error::Upstream)?;
        let data = forecast::normalize(report);

        self.cache.set(&key, &data);
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CurrentWeather, DailyConditions, ForecastReport};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Debug, Default)]
    struct Recorder {
        queries: Mutex<Vec<String>>,
        fetches: Mutex<Vec<Coordinates>>,
        fail: bool,
    }

    #[async_trait]
    impl GeocodeProvider for Recorder {
        async fn search(&self, query: &str) -> anyhow::Result<Vec<Suggestion>> {
            self.queries.lock().push(query.to_string());
            if self.fail {
                anyhow::bail!("upstream down");
            }
            Ok(vec![Suggestion {
                id: "place.1".into(),
                name: query.into(),
                lat: 1.0,
                lon: 2.0,
            }])
        }
    }

    #[async_trait]
    impl ForecastProvider for Recorder {
        async fn fetch(&self, coords: Coordinates) -> anyhow::Result<ForecastReport> {
            self.fetches.lock().push(coords);
            if self.fail {
                anyhow::bail!("upstream down");
            }
            Ok(ForecastReport {
                timezone: "Europe/Rome".into(),
                current: CurrentWeather {
                    temp: 20.0,
                    humidity: 0.0,
                    wind_speed: 2.0,
                },
                days: vec![DailyConditions {
                    dt: 1_719_792_000,
                    temp_max: Some(20.0),
                    temp_min: Some(10.0),
                    weather_code: Some(61),
                    precipitation_probability: Some(75.0),
                    wind_speed_max: Some(10.0),
                }],
            })
        }
    }

    fn service(fail: bool) -> (WeatherService, Arc<Recorder>) {
        let recorder = Arc::new(Recorder {
            fail,
            ..Default::default()
        });
        let svc = WeatherService::new(
            Arc::new(ResponseCache::default()),
            recorder.clone(),
            recorder.clone(),
        );
        (svc, recorder)
    }

    #[test]
    fn coordinates_must_be_finite_numbers() {
        assert_eq!(
            parse_coordinates(Some("41.9"), Some(" 12.5 ")).unwrap(),
            Coordinates {
                lat: 41.9,
                lon: 12.5
            }
        );

        let rejected = [
            (Some("foo"), Some("bar")),
            (Some("1"), None),
            (Some("NaN"), Some("1")),
            (Some("inf"), Some("1")),
        ];
        for (lat, lon) in rejected {
            let res = parse_coordinates(lat, lon);
            assert!(matches!(res, Err(Error::InvalidCoordinates)), "{lat:?} {lon:?}");
        }
    }

    #[tokio::test]
    async fn blank_query_is_rejected_without_upstream_call() {
        let (svc, rec) = service(false);

        assert!(matches!(svc.geocode("").await, Err(Error::InvalidQuery)));
        assert!(matches!(svc.geocode("   \t").await, Err(Error::InvalidQuery)));
        assert!(rec.queries.lock().is_empty());
    }

    #[tokio::test]
    async fn geocode_trims_and_caches_case_insensitively() {
        let (svc, rec) = service(false);

        let first = svc.geocode("  Rome ").await.unwrap();
        let second = svc.geocode("ROME").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(*rec.queries.lock(), vec!["Rome".to_string()]);
    }

    #[tokio::test]
    async fn nearby_coordinates_share_a_cached_forecast() {
        let (svc, rec) = service(false);

        let near = |lat, lon| Coordinates { lat, lon };
        let a = svc.forecast(near(41.90001, 12.50001)).await.unwrap();
        let b = svc.forecast(near(41.90004, 12.49996)).await.unwrap();

        assert_eq!(a, b);
        assert_eq!(rec.fetches.lock().len(), 1);
        assert_eq!(a.alerts.len(), 1);
        assert_eq!(a.alerts[0].id, "1719792000-rain");
    }

    #[tokio::test]
    async fn upstream_failures_surface_and_are_not_cached() {
        let (svc, rec) = service(true);

        assert!(matches!(svc.geocode("Rome").await, Err(Error::Upstream(_))));
        assert!(matches!(svc.geocode("Rome").await, Err(Error::Upstream(_))));
        assert_eq!(rec.queries.lock().len(), 2);

        let coords = Coordinates { lat: 1.0, lon: 1.0 };
        assert!(matches!(svc.forecast(coords).await, Err(Error::Upstream(_))));
    }
}
