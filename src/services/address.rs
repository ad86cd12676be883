//! Postal code to address lookup backed by zipcloud.

use crate::errors::ServiceError;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AddressLookup {
    /// Formatted as `XXX-XXXX`
    pub postal_code: String,
    pub prefecture: String,
    pub city: String,
    pub address: String,
}

#[derive(Debug, Deserialize)]
struct ZipcloudResponse {
    status: u16,
    message: Option<String>,
    results: Option<Vec<ZipcloudResult>>,
}

#[derive(Debug, Deserialize)]
struct ZipcloudResult {
    address1: String,
    address2: String,
    address3: String,
}

/// Digits of a postal code with hyphens removed, when exactly seven remain.
pub fn normalize_postal_code(raw: &str) -> Result<String, ServiceError> {
    let digits: String = raw.trim().chars().filter(|c| *c != '-').collect();
    if digits.len() != 7 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ServiceError::BadRequest(
            "郵便番号は7桁の数字で入力してください".to_string(),
        ));
    }
    Ok(digits)
}

#[derive(Clone)]
pub struct AddressService {
    http: reqwest::Client,
    base_url: String,
}

impl AddressService {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: crate::notifications::http_client(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    #[instrument(skip(self))]
    pub async fn lookup(&self, postal_code: &str) -> Result<AddressLookup, ServiceError> {
        let digits = normalize_postal_code(postal_code)?;
        let url = format!("{}/api/search", self.base_url);

        let response = self
            .http
            .get(&url)
            .query(&[("zipcode", digits.as_str())])
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "zipcloud request failed");
                ServiceError::ExternalServiceError(format!("zipcloud: {}", e))
            })?;
        if !response.status().is_success() {
            return Err(ServiceError::ExternalServiceError(format!(
                "zipcloud returned {}",
                response.status()
            )));
        }
        let body: ZipcloudResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("zipcloud: {}", e)))?;

        if body.status != 200 {
            return Err(ServiceError::ExternalServiceError(format!(
                "zipcloud status {}: {}",
                body.status,
                body.message.unwrap_or_default()
            )));
        }
        let result = body
            .results
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| ServiceError::not_found("Address for postal code", &digits))?;

        Ok(AddressLookup {
            postal_code: format!("{}-{}", &digits[..3], &digits[3..]),
            prefecture: result.address1,
            city: result.address2,
            address: result.address3,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn normalize_accepts_hyphenated_and_rejects_short() {
        assert_eq!(normalize_postal_code("100-0001").unwrap(), "1000001");
        assert_eq!(normalize_postal_code("1000001").unwrap(), "1000001");
        assert_matches!(normalize_postal_code("100-001"), Err(ServiceError::BadRequest(_)));
        assert_matches!(normalize_postal_code("abc-defg"), Err(ServiceError::BadRequest(_)));
    }

    #[tokio::test]
    async fn lookup_formats_first_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/search"))
            .and(query_param("zipcode", "1000001"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": null,
                "results": [{
                    "address1": "東京都",
                    "address2": "千代田区",
                    "address3": "千代田",
                    "kana1": "ﾄｳｷｮｳﾄ",
                    "kana2": "ﾁﾖﾀﾞｸ",
                    "kana3": "ﾁﾖﾀﾞ",
                    "prefcode": "13",
                    "zipcode": "1000001"
                }],
                "status": 200
            })))
            .expect(1)
            .mount(&server)
            .await;

        let found = AddressService::new(server.uri()).lookup("100-0001").await.unwrap();
        assert_eq!(
            found,
            AddressLookup {
                postal_code: "100-0001".into(),
                prefecture: "東京都".into(),
                city: "千代田区".into(),
                address: "千代田".into(),
            }
        );
    }

    #[tokio::test]
    async fn lookup_without_results_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": null,
                "results": null,
                "status": 200
            })))
            .mount(&server)
            .await;

        let result = AddressService::new(server.uri()).lookup("9999999").await;
        assert_matches!(result, Err(ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn upstream_failure_is_bad_gateway() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = AddressService::new(server.uri()).lookup("1000001").await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_GATEWAY);
    }
}
