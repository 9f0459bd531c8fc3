//! Integration tests for the provider adapters using wiremock.
//!
//! These tests verify request shape, payload mapping and cache reuse against a
//! mock HTTP server.

use std::sync::Arc;

use weather_core::{
    Config, Coordinates, Error, ProviderId, ResponseCache, WeatherService,
    provider::{
        ForecastProvider, GeocodeProvider, forecaster_from_config, geocoder_from_config,
        http_client,
    },
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> Config {
    let mut cfg = Config::default();
    cfg.upsert_provider_api_key(ProviderId::Mapbox, "pk.test".into());
    cfg.set_provider_base_url(ProviderId::Mapbox, server.uri());
    cfg.set_provider_base_url(ProviderId::OpenMeteo, server.uri());
    cfg
}

fn feature(id: &str, name: &str, lon: f64, lat: f64) -> serde_json::Value {
    serde_json::json!({ "id": id, "place_name": name, "center": [lon, lat] })
}

fn open_meteo_body() -> serde_json::Value {
    serde_json::json!({
        "latitude": 41.9,
        "longitude": 12.5,
        "timezone": "Europe/Rome",
        "current_weather": {
            "temperature": 29.3,
            "windspeed": 11.2,
            "winddirection": 200,
            "weathercode": 2
        },
        "daily": {
            "time": ["2024-07-01", "2024-07-02", "2024-07-03"],
            "temperature_2m_max": [20.0, 34.5, 25.0],
            "temperature_2m_min": [14.0, 22.0, 16.0],
            "weathercode": [61, 0, 42],
            "precipitation_probability_max": [75, 10, 20],
            "windspeed_10m_max": [10.0, 16.2, 5.0]
        }
    })
}

#[tokio::test]
async fn test_mapbox_search_keeps_first_five_in_order() {
    let mock_server = MockServer::start().await;

    let features: Vec<_> = (1..=7)
        .map(|i| feature(&format!("place.{i}"), &format!("Springfield {i}"), -89.6, 39.8))
        .collect();

    Mock::given(method("GET"))
        .and(path("/geocoding/v5/mapbox.places/Springfield.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "features": features })),
        )
        .mount(&mock_server)
        .await;

    let cfg = config_for(&mock_server);
    let geocoder = geocoder_from_config(&cfg, http_client(&cfg).unwrap()).unwrap();

    let suggestions = geocoder.search("Springfield").await.unwrap();
    let ids: Vec<_> = suggestions.iter().map(|s| s.id.as_str()).collect();

    assert_eq!(ids, vec!["place.1", "place.2", "place.3", "place.4", "place.5"]);
}

#[tokio::test]
async fn test_unreachable_geocoder_keeps_token_out_of_error() {
    let mut cfg = Config::default();
    cfg.upsert_provider_api_key(ProviderId::Mapbox, "pk.SECRET_TOKEN".into());
    // Nothing listens on port 1.
    cfg.set_provider_base_url(ProviderId::Mapbox, "http://127.0.0.1:1".into());

    let http = http_client(&cfg).unwrap();
    let service = WeatherService::new(
        Arc::new(ResponseCache::default()),
        Arc::new(geocoder_from_config(&cfg, http.clone()).unwrap()),
        Arc::new(forecaster_from_config(&cfg, http)),
    );

    let err = service.geocode("Rome").await.unwrap_err();
    assert!(matches!(err, Error::Upstream(_)));

    let message = err.to_string();
    assert!(!message.contains("SECRET_TOKEN"), "{message}");
}

#[tokio::test]
async fn test_mapbox_search_maps_features() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geocoding/v5/mapbox.places/Rome.json"))
        .and(query_param("access_token", "pk.test"))
        .and(query_param("limit", "5"))
        .and(query_param("types", "place"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "type": "FeatureCollection",
            "features": [
                feature("place.1", "Rome, Lazio, Italy", 12.4964, 41.9028),
                feature("place.2", "Rome, Georgia, United States", -85.1647, 34.2570),
            ]
        })))
        .mount(&mock_server)
        .await;

    let cfg = config_for(&mock_server);
    let geocoder = geocoder_from_config(&cfg, http_client(&cfg).unwrap()).unwrap();
    let suggestions = geocoder.search("Rome").await.unwrap();

    assert_eq!(suggestions.len(), 2);
    assert_eq!(suggestions[0].id, "place.1");
    assert_eq!(suggestions[0].name, "Rome, Lazio, Italy");
    assert_eq!(suggestions[0].lat, 41.9028);
    assert_eq!(suggestions[0].lon, 12.4964);
    assert_eq!(suggestions[1].id, "place.2");
}

#[tokio::test]
async fn test_mapbox_error_status_is_reported() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Not Authorized - Invalid Token"))
        .mount(&mock_server)
        .await;

    let cfg = config_for(&mock_server);
    let geocoder = geocoder_from_config(&cfg, http_client(&cfg).unwrap()).unwrap();
    let err = geocoder.search("Rome").await.unwrap_err();

    let msg = err.to_string();
    assert!(msg.contains("401"));
    assert!(msg.contains("Invalid Token"));
}

#[tokio::test]
async fn test_open_meteo_request_and_mapping() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("latitude", "41.9"))
        .and(query_param("longitude", "12.5"))
        .and(query_param("current_weather", "true"))
        .and(query_param("timezone", "auto"))
        .and(query_param(
            "daily",
            "temperature_2m_max,temperature_2m_min,weathercode,precipitation_probability_max,windspeed_10m_max",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(open_meteo_body()))
        .mount(&mock_server)
        .await;

    let cfg = config_for(&mock_server);
    let forecaster = forecaster_from_config(&cfg, http_client(&cfg).unwrap());
    let rome = Coordinates {
        lat: 41.9,
        lon: 12.5,
    };
    let report = forecaster.fetch(rome).await.unwrap();

    assert_eq!(report.timezone, "Europe/Rome");
    assert_eq!(report.current.temp, 29.3);
    assert_eq!(report.current.humidity, 0.0);
    assert_eq!(report.days.len(), 3);
    assert_eq!(report.days[1].temp_max, Some(34.5));
}

#[tokio::test]
async fn test_forecast_service_normalizes_and_caches() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(open_meteo_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let cfg = config_for(&mock_server);
    let http = http_client(&cfg).unwrap();
    let service = WeatherService::new(
        Arc::new(ResponseCache::new(cfg.cache_ttl())),
        Arc::new(geocoder_from_config(&cfg, http.clone()).unwrap()),
        Arc::new(forecaster_from_config(&cfg, http)),
    );

    let coords = Coordinates {
        lat: 41.9,
        lon: 12.5,
    };
    let nearby = Coordinates {
        lat: 41.90002,
        lon: 12.49998,
    };
    let data = service.forecast(coords).await.unwrap();
    let again = service.forecast(nearby).await.unwrap();
    assert_eq!(data, again);

    assert_eq!(data.location_name, "Europe/Rome");
    assert_eq!(data.daily.len(), 3);
    assert_eq!(data.daily[0].weather[0].description, "slight rain");
    assert_eq!(data.daily[2].weather[0].description, "unknown");

    let ids: Vec<_> = data.alerts.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["1719792000-rain", "1719878400-wind", "1719878400-heat"]);
    assert_eq!(data.alerts[0].message, "Monday: Chance of rain ~75%");
    assert_eq!(data.alerts[1].message, "Tuesday: Gusts up to 16.2 m/s");
    assert_eq!(data.alerts[2].message, "Tuesday: High of 34.5 °C");
}

#[tokio::test]
async fn test_geocode_service_hits_upstream_once_per_query() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geocoding/v5/mapbox.places/Paris.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "features": [feature("place.9", "Paris, France", 2.35, 48.85)]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let cfg = config_for(&mock_server);
    let http = http_client(&cfg).unwrap();
    let service = WeatherService::new(
        Arc::new(ResponseCache::default()),
        Arc::new(geocoder_from_config(&cfg, http.clone()).unwrap()),
        Arc::new(forecaster_from_config(&cfg, http)),
    );

    let first = service.geocode("Paris").await.unwrap();
    let second = service.geocode(" paris ").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first[0].lat, 48.85);
}

#[tokio::test]
async fn test_upstream_failure_maps_to_upstream_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let cfg = config_for(&mock_server);
    let http = http_client(&cfg).unwrap();
    let service = WeatherService::new(
        Arc::new(ResponseCache::default()),
        Arc::new(geocoder_from_config(&cfg, http.clone()).unwrap()),
        Arc::new(forecaster_from_config(&cfg, http)),
    );

    let coords = Coordinates { lat: 1.0, lon: 1.0 };
    let err = service.forecast(coords).await.unwrap_err();
    assert!(matches!(err, Error::Upstream(_)));
    assert!(err.to_string().contains("500"));
}
