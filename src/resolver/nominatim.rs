use crate::resolver::error::GeocodeError;
use crate::resolver::geocoder::Geocoder;
use crate::types::config::GeocodeConfig;
use crate::types::geo_result::{GeoResult, LatLon};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, Url};
use serde::Deserialize;

/// Client for the `/search` endpoint of a Nominatim-compatible geocoding service.
pub struct NominatimGeocoder {
    search_url: Url,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct Place {
    lat: Coordinate,
    lon: Coordinate,
}

// Nominatim sends coordinates as strings, some mirrors send numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Coordinate {
    Number(f64),
    Text(String),
}

impl Coordinate {
    fn value(&self) -> Option<f64> {
        match self {
            Coordinate::Number(n) => Some(*n),
            Coordinate::Text(s) => s.trim().parse().ok(),
        }
    }

    fn raw(&self) -> String {
        match self {
            Coordinate::Number(n) => n.to_string(),
            Coordinate::Text(s) => s.clone(),
        }
    }
}

impl NominatimGeocoder {
    /// Builds a client from the endpoint, user agent and request timeout of `config`.
    pub fn new(config: &GeocodeConfig) -> Result<Self, GeocodeError> {
        let base = config.endpoint.trim_end_matches('/');
        let search_url = Url::parse(&format!("{}/search", base))
            .map_err(|_| GeocodeError::InvalidEndpoint(config.endpoint.clone()))?;
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout)
            .build()
            .map_err(GeocodeError::ClientBuild)?;
        Ok(Self { search_url, client })
    }

    fn parse_places(name: &str, places: &[Place]) -> Result<GeoResult, GeocodeError> {
        let Some(best) = places.first() else {
            return Ok(GeoResult::Miss);
        };
        let (Some(lat), Some(lon)) = (best.lat.value(), best.lon.value()) else {
            return Err(GeocodeError::InvalidCoordinate {
                name: name.to_string(),
                value: format!("{}, {}", best.lat.raw(), best.lon.raw()),
            });
        };
        let lat_lon = LatLon(lat, lon);
        if !lat_lon.is_valid() {
            return Err(GeocodeError::InvalidCoordinate {
                name: name.to_string(),
                value: lat_lon.to_string(),
            });
        }
        Ok(GeoResult::Found(lat_lon))
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, name: &str) -> Result<GeoResult, GeocodeError> {
        let url = self.search_url.to_string();
        debug!("Querying {} for '{}'", url, name);

        let response = self
            .client
            .get(self.search_url.clone())
            .query(&[("q", name), ("format", "jsonv2"), ("limit", "1")])
            .send()
            .await
            .map_err(|e| GeocodeError::NetworkRequest(url.clone(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("HTTP error for {}: {:?}", url, e);
                return Err(if let Some(status) = e.status() {
                    GeocodeError::HttpStatus {
                        url,
                        status,
                        source: e,
                    }
                } else {
                    GeocodeError::NetworkRequest(url, e)
                });
            }
        };

        let body = response
            .bytes()
            .await
            .map_err(|e| GeocodeError::NetworkRequest(url.clone(), e))?;
        let places: Vec<Place> =
            serde_json::from_slice(&body).map_err(|e| GeocodeError::JsonParse(url, e))?;

        Self::parse_places(name, &places)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use std::time::Duration;

    fn config_for(server: &mockito::Server) -> GeocodeConfig {
        GeocodeConfig::builder()
            .endpoint(server.url())
            .user_agent("aqi-geo-tests")
            .request_timeout(Duration::from_secs(5))
            .build()
    }

    #[tokio::test]
    async fn test_found_parses_string_coordinates() -> Result<(), GeocodeError> {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "Springfield, United States".into()),
                Matcher::UrlEncoded("format".into(), "jsonv2".into()),
                Matcher::UrlEncoded("limit".into(), "1".into()),
            ]))
            .match_header("user-agent", "aqi-geo-tests")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"place_id": 1, "lat": "39.7990175", "lon": "-89.6439575", "display_name": "Springfield"}]"#)
            .create_async()
            .await;

        let geocoder = NominatimGeocoder::new(&config_for(&server))?;
        let result = geocoder.geocode("Springfield, United States").await?;

        assert_eq!(result, GeoResult::Found(LatLon(39.7990175, -89.6439575)));
        mock.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn test_numeric_coordinates_are_accepted() -> Result<(), GeocodeError> {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/search")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"[{"lat": 48.8566, "lon": 2.3522}]"#)
            .create_async()
            .await;

        let geocoder = NominatimGeocoder::new(&config_for(&server))?;
        let result = geocoder.geocode("Paris").await?;
        assert_eq!(result, GeoResult::Found(LatLon(48.8566, 2.3522)));
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_result_is_a_miss() -> Result<(), GeocodeError> {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/search")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let geocoder = NominatimGeocoder::new(&config_for(&server))?;
        assert_eq!(geocoder.geocode("Nowhereville").await?, GeoResult::Miss);
        Ok(())
    }

    #[tokio::test]
    async fn test_throttling_is_a_transient_status_error() -> Result<(), GeocodeError> {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/search")
            .match_query(Matcher::Any)
            .with_status(429)
            .create_async()
            .await;

        let geocoder = NominatimGeocoder::new(&config_for(&server))?;
        let err = geocoder.geocode("Paris").await.unwrap_err();
        assert!(matches!(
            err,
            GeocodeError::HttpStatus { status, .. } if status == reqwest::StatusCode::TOO_MANY_REQUESTS
        ));
        assert!(err.is_transient());
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_body_is_a_parse_error() -> Result<(), GeocodeError> {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/search")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>busy</html>")
            .create_async()
            .await;

        let geocoder = NominatimGeocoder::new(&config_for(&server))?;
        let err = geocoder.geocode("Paris").await.unwrap_err();
        assert!(matches!(err, GeocodeError::JsonParse(..)));
        Ok(())
    }

    #[tokio::test]
    async fn test_out_of_range_coordinate_is_rejected() -> Result<(), GeocodeError> {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/search")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"[{"lat": "123.0", "lon": "0.0"}]"#)
            .create_async()
            .await;

        let geocoder = NominatimGeocoder::new(&config_for(&server))?;
        let err = geocoder.geocode("Atlantis").await.unwrap_err();
        assert!(matches!(err, GeocodeError::InvalidCoordinate { .. }));
        assert!(!err.is_transient());
        Ok(())
    }

    #[test]
    fn test_invalid_endpoint() {
        let config = GeocodeConfig::builder().endpoint("not a url").build();
        assert!(matches!(
            NominatimGeocoder::new(&config),
            Err(GeocodeError::InvalidEndpoint(_))
        ));
    }
}
