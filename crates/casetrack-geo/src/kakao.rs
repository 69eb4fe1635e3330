//! Kakao Local address search as a [`Geocoder`].

use async_trait::async_trait;
use casetrack_core::LatLng;
use serde::Deserialize;
use tracing::debug;

use crate::GeocodeError;
use crate::geocoder::Geocoder;

const DEFAULT_BASE_URL: &str = "https://dapi.kakao.com";

/// Geocoder backed by the Kakao Local REST API.
pub struct KakaoGeocoder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    documents: Vec<Document>,
}

/// Kakao returns coordinates as decimal strings: `x` is longitude, `y` latitude.
#[derive(Deserialize)]
struct Document {
    x: String,
    y: String,
}

impl KakaoGeocoder {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL.to_string(), api_key)
    }

    /// Point at a different host, e.g. a local mock.
    pub fn with_base_url(base_url: String, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl Geocoder for KakaoGeocoder {
    async fn geocode(&self, query: &str) -> Result<Option<LatLng>, GeocodeError> {
        let url = format!("{}/v2/local/search/address.json", self.base_url);

        debug!(query, "kakao address search");
        let resp = self
            .client
            .get(&url)
            .header("Authorization", format!("KakaoAK {}", self.api_key))
            .query(&[("query", query)])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GeocodeError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let body: SearchResponse = resp.json().await?;
        first_position(query, body)
    }
}

fn first_position(query: &str, body: SearchResponse) -> Result<Option<LatLng>, GeocodeError> {
    let Some(doc) = body.documents.into_iter().next() else {
        return Ok(None);
    };
    let parse = |field: &str, raw: &str| {
        raw.trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| GeocodeError::Malformed {
                query: query.to_string(),
                detail: format!("{field}={raw:?}"),
            })
    };
    let lng = parse("x", &doc.x)?;
    let lat = parse("y", &doc.y)?;
    Ok(Some(LatLng::new(lat, lng)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<Option<LatLng>, GeocodeError> {
        let body: SearchResponse = serde_json::from_str(json).unwrap();
        first_position("q", body)
    }

    #[test]
    fn first_document_wins() {
        let json = r#"{
            "meta": {"total_count": 2},
            "documents": [
                {"address_name": "서울 중구 세종대로 110", "x": "126.978652258823", "y": "37.56682420267543"},
                {"address_name": "elsewhere", "x": "127.0", "y": "37.0"}
            ]
        }"#;
        let p = parse(json).unwrap().unwrap();
        assert!((p.lat - 37.566_824).abs() < 1e-6);
        assert!((p.lng - 126.978_652).abs() < 1e-6);
    }

    #[test]
    fn no_documents_is_a_miss() {
        assert!(parse(r#"{"documents": []}"#).unwrap().is_none());
        assert!(parse(r#"{}"#).unwrap().is_none());
    }

    #[test]
    fn unparseable_coordinate_is_malformed() {
        let err = parse(r#"{"documents": [{"x": "east", "y": "37.5"}]}"#).unwrap_err();
        assert!(matches!(err, GeocodeError::Malformed { .. }));
        assert!(err.to_string().contains("x=\"east\""));
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let geo = KakaoGeocoder::with_base_url("http://localhost:9999/".into(), "key");
        assert_eq!(geo.base_url, "http://localhost:9999");
    }
}
