//! Subscriber API protocol versions.
//!
//! The v2 API stores structured event slugs and one subscriber per
//! provider. The legacy v1 API only knows REST subscribers and addresses
//! events by catalog id. The registry tries v2 first and falls back to v1
//! when v2 answers `404`.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::clients::{DataType, HttpError, HttpMethod, HttpRequest, HttpResponse};

use super::types::{EventKey, Provider, SubscriberConfig, SubscriberEvent};

/// A subscriber write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SubscriberWrite {
    Register,
    Update,
}

impl SubscriberWrite {
    const fn method(self) -> HttpMethod {
        match self {
            Self::Register => HttpMethod::Post,
            Self::Update => HttpMethod::Put,
        }
    }

    pub(crate) const fn operation(self) -> &'static str {
        match self {
            Self::Register => "register subscriber",
            Self::Update => "update subscriber",
        }
    }

    pub(crate) const fn retry_name(self) -> &'static str {
        match self {
            Self::Register => "register_subscriber",
            Self::Update => "update_subscriber",
        }
    }
}

/// A subscriber API version.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SubscriberApi {
    V2,
    V1,
}

impl SubscriberApi {
    const fn version(self) -> &'static str {
        match self {
            Self::V2 => "v2.0",
            Self::V1 => "v1.0",
        }
    }

    /// Returns whether this version can store subscribers for `provider`.
    pub(crate) const fn supports(self, provider: Provider) -> bool {
        matches!((self, provider), (Self::V2, _) | (Self::V1, Provider::Rest))
    }

    /// Request listing the extension's subscribers for `company_id`.
    pub(crate) fn list_request(self, company_id: &str, api_key: &str) -> Result<HttpRequest, HttpError> {
        let path = format!(
            "/service/platform/webhook/{}/company/{}/extension/{}/subscriber",
            self.version(),
            urlencoding::encode(company_id),
            urlencoding::encode(api_key),
        );
        Ok(HttpRequest::builder(HttpMethod::Get, path)
            .query_param("page_size", "100")
            .build()?)
    }

    /// Parses a list response into pruned subscriber configs.
    ///
    /// A record that does not parse fails the whole listing, since dropping
    /// it would make the subscriber look absent.
    pub(crate) fn parse_list(
        self,
        response: &HttpResponse,
    ) -> Result<Vec<SubscriberConfig>, HttpError> {
        let items = response
            .body
            .get("items")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        items
            .into_iter()
            .map(|item| match self {
                Self::V2 => serde_json::from_value::<SubscriberConfig>(item),
                Self::V1 => serde_json::from_value::<LegacySubscriber>(item)
                    .map(LegacySubscriber::into_config),
            })
            .collect::<Result<_, _>>()
            .map_err(HttpError::from)
    }

    /// Request writing `config`.
    ///
    /// For v1 the structured events are translated to catalog ids; `config`
    /// itself is never altered.
    pub(crate) fn write_request(
        self,
        write: SubscriberWrite,
        company_id: &str,
        config: &SubscriberConfig,
        event_ids: &HashMap<String, i64>,
    ) -> Result<HttpRequest, HttpError> {
        let path = format!(
            "/service/platform/webhook/{}/company/{}/subscriber/",
            self.version(),
            urlencoding::encode(company_id),
        );
        let body = match self {
            Self::V2 => serde_json::to_value(config)?,
            Self::V1 => legacy_body(config, event_ids),
        };
        Ok(HttpRequest::builder(write.method(), path)
            .body(body)
            .body_type(DataType::Json)
            .build()?)
    }
}

fn legacy_body(config: &SubscriberConfig, event_ids: &HashMap<String, i64>) -> Value {
    let ids: Vec<i64> = config
        .events
        .iter()
        .filter_map(|event| event_ids.get(&event.slug).copied())
        .collect();

    let mut body = json!({
        "name": config.name,
        "webhook_url": config.webhook_url,
        "association": config.association,
        "status": config.status,
        "auth_meta": config.auth_meta,
        "event_id": ids,
        "email_id": config.email_id,
    });
    if let Some(id) = &config.id {
        body["id"] = json!(id);
    }
    body
}

#[derive(Debug, Deserialize)]
struct LegacyEvent {
    event_category: String,
    event_name: String,
    event_type: String,
    #[serde(deserialize_with = "crate::auth::session::string_or_number")]
    version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LegacySubscriber {
    #[serde(flatten)]
    config: SubscriberConfig,
    #[serde(
        default,
        rename = "event_configs",
        deserialize_with = "super::types::null_as_default"
    )]
    legacy_events: Vec<LegacyEvent>,
}

impl LegacySubscriber {
    fn into_config(self) -> SubscriberConfig {
        let mut config = self.config;
        config.provider = Provider::Rest;
        config.events = self
            .legacy_events
            .into_iter()
            .map(|event| SubscriberEvent {
                slug: EventKey {
                    category: event.event_category,
                    name: event.event_name,
                    event_type: event.event_type,
                    version: event.version.unwrap_or_default(),
                }
                .slug(),
                topic: None,
            })
            .collect();
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webhooks::types::{Association, AuthMeta, Criteria, SubscriberStatus};

    fn config() -> SubscriberConfig {
        SubscriberConfig {
            id: Some("5".to_string()),
            name: "key".to_string(),
            webhook_url: Some("https://ext.example.com/webhook".to_string()),
            provider: Provider::Rest,
            association: Association {
                company_id: Some("1".to_string()),
                application_id: Vec::new(),
                criteria: Criteria::All,
            },
            status: SubscriberStatus::Active,
            auth_meta: AuthMeta::hmac("secret"),
            events: vec![
                SubscriberEvent {
                    slug: "company/product/create/v1".to_string(),
                    topic: None,
                },
                SubscriberEvent {
                    slug: "company/product/update/v1".to_string(),
                    topic: None,
                },
            ],
            email_id: "dev@example.com".to_string(),
        }
    }

    #[test]
    fn test_v1_body_uses_event_ids_and_leaves_config_untouched() {
        let config = config();
        let before = config.clone();
        let ids = HashMap::from([
            ("company/product/create/v1".to_string(), 10),
            ("company/product/update/v1".to_string(), 11),
        ]);

        let request = SubscriberApi::V1
            .write_request(SubscriberWrite::Update, "1", &config, &ids)
            .unwrap();

        let body = request.body.unwrap();
        assert_eq!(body["event_id"], json!([10, 11]));
        assert!(body.get("events").is_none());
        assert_eq!(body["id"], json!("5"));
        assert_eq!(request.path, "/service/platform/webhook/v1.0/company/1/subscriber/");
        assert_eq!(config, before);
    }

    #[test]
    fn test_v1_only_supports_rest() {
        assert!(SubscriberApi::V1.supports(Provider::Rest));
        assert!(!SubscriberApi::V1.supports(Provider::Kafka));
        assert!(SubscriberApi::V2.supports(Provider::Kafka));
    }

    #[test]
    fn test_parse_v1_list_restores_slugs() {
        let response = HttpResponse::new(
            200,
            HashMap::new(),
            json!({"items": [{
                "id": 3,
                "name": "key",
                "association": {"company_id": 1, "application_id": [], "criteria": "ALL"},
                "auth_meta": {"type": "hmac", "secret": "secret"},
                "event_configs": [
                    {"id": 10, "event_category": "company", "event_name": "product", "event_type": "create", "version": "1"}
                ]
            }]}),
        );
        let configs = SubscriberApi::V1.parse_list(&response).unwrap();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].provider, Provider::Rest);
        assert_eq!(configs[0].events[0].slug, "company/product/create/v1");
    }

    #[test]
    fn test_unparseable_record_fails_the_listing() {
        let response = HttpResponse::new(
            200,
            HashMap::new(),
            json!({"items": [
                {"id": 3, "name": "key", "provider": "rest"},
                {"id": 4, "name": "key", "provider": "carrier-pigeon"}
            ]}),
        );
        assert!(matches!(
            SubscriberApi::V2.parse_list(&response),
            Err(HttpError::Json(_))
        ));
    }
}
