//! Platform event catalog lookup.
//!
//! Declared events are resolved to the platform's internal event ids in one
//! call. The v1 subscriber API addresses events by these ids.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::clients::{DataType, HttpClient, HttpError, HttpMethod, HttpRequest};

use super::types::EventKey;

/// Path of the event catalog query.
pub(crate) const EVENT_CATALOG_PATH: &str =
    "/service/common/webhook/v1.0/events/query-event-details";

#[derive(Debug, Serialize)]
struct EventQuery<'a> {
    event_category: &'a str,
    event_name: &'a str,
    event_type: &'a str,
    version: &'a str,
}

#[derive(Debug, Deserialize)]
struct EventDetails {
    id: i64,
    event_category: String,
    event_name: String,
    event_type: String,
    #[serde(deserialize_with = "version_string")]
    version: String,
}

#[derive(Debug, Deserialize)]
struct CatalogResponse {
    #[serde(default)]
    event_configs: Vec<EventDetails>,
}

fn version_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    crate::auth::session::string_or_number(deserializer).map(Option::unwrap_or_default)
}

/// Queries the catalog for `events`, returning ids keyed by versioned slug.
///
/// Events the catalog does not know are absent from the result. A response
/// that is not a catalog listing fails with [`HttpError::Json`].
pub(crate) async fn fetch_event_ids(
    http: &HttpClient,
    events: &[EventKey],
) -> Result<HashMap<String, i64>, HttpError> {
    let query: Vec<EventQuery<'_>> = events
        .iter()
        .map(|key| EventQuery {
            event_category: &key.category,
            event_name: &key.name,
            event_type: &key.event_type,
            version: &key.version,
        })
        .collect();

    let request = HttpRequest::builder(HttpMethod::Post, EVENT_CATALOG_PATH)
        .body(serde_json::to_value(&query)?)
        .body_type(DataType::Json)
        .build()?;

    let response = http.request(request).await?;
    let catalog: CatalogResponse = response.json()?;

    Ok(catalog
        .event_configs
        .into_iter()
        .map(|details| {
            let key = EventKey {
                category: details.event_category,
                name: details.event_name,
                event_type: details.event_type,
                version: details.version,
            };
            (key.slug(), details.id)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::ClientAuth;
    use crate::config::{ApiKey, ApiSecretKey, ExtensionConfig, HostUrl};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn catalog_client(server: &MockServer) -> HttpClient {
        let config = ExtensionConfig::builder()
            .api_key(ApiKey::new("key").unwrap())
            .api_secret_key(ApiSecretKey::new("secret").unwrap())
            .base_url(HostUrl::new("https://ext.example.com").unwrap())
            .build()
            .unwrap();
        HttpClient::new(server.uri(), ClientAuth::None, &config).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_event_ids_maps_by_slug() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(EVENT_CATALOG_PATH))
            .and(body_partial_json(serde_json::json!([
                {"event_category": "company", "event_name": "product", "event_type": "create", "version": "1"}
            ])))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "event_configs": [
                    {"id": 10, "event_category": "company", "event_name": "product", "event_type": "create", "version": 1}
                ]
            })))
            .mount(&server)
            .await;

        let http = catalog_client(&server);
        let events = vec![
            EventKey::parse("company/product/create", "1").unwrap(),
            EventKey::parse("company/product/delete", "1").unwrap(),
        ];

        let ids = fetch_event_ids(&http, &events).await.unwrap();
        assert_eq!(ids.get("company/product/create/v1"), Some(&10));
        assert!(!ids.contains_key("company/product/delete/v1"));
    }

    #[tokio::test]
    async fn test_malformed_catalog_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(EVENT_CATALOG_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "event_configs": [{"id": "abc"}]
            })))
            .mount(&server)
            .await;

        let http = catalog_client(&server);
        let events = vec![EventKey::parse("company/product/create", "1").unwrap()];

        let result = fetch_event_ids(&http, &events).await;
        assert!(matches!(result, Err(HttpError::Json(_))));
    }
}
