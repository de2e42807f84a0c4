//! Webhook configuration and subscriber types.
//!
//! # Example
//!
//! ```rust
//! use fdk_extension::webhooks::{
//!     EventSubscription, HandlerError, SalesChannelScope, WebhookConfig, WebhookEvent,
//! };
//!
//! let config = WebhookConfig::builder()
//!     .api_path("/api/v1/webhooks")
//!     .notification_email("dev@example.com")
//!     .subscribed_saleschannel(SalesChannelScope::Specific)
//!     .event(
//!         "company/product/create",
//!         EventSubscription::rest("1", |event: WebhookEvent| async move {
//!             println!("{} for company {}", event.name, event.company_id);
//!             Ok::<(), HandlerError>(())
//!         }),
//!     )
//!     .event(
//!         "application/coupon/update",
//!         EventSubscription::kafka("1", "fynd-coupon-updates"),
//!     )
//!     .build();
//!
//! assert_eq!(config.event_map().len(), 2);
//! assert!(config.subscribe_on_install());
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};

use crate::auth::session::string_or_number;
use crate::BoxFuture;

/// Error type returned by webhook handlers.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// A structured `(category, name, type, version)` event identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventKey {
    /// Event category, e.g. `company` or `application`.
    pub category: String,
    /// Event name, e.g. `product`.
    pub name: String,
    /// Event type, e.g. `create`.
    pub event_type: String,
    /// Event schema version.
    pub version: String,
}

impl EventKey {
    /// Parses a `category/name/type` map key.
    ///
    /// Returns `None` unless the key has exactly three non-empty segments.
    #[must_use]
    pub fn parse(key: &str, version: &str) -> Option<Self> {
        let mut parts = key.split('/');
        let (Some(category), Some(name), Some(event_type), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return None;
        };
        if category.is_empty() || name.is_empty() || event_type.is_empty() {
            return None;
        }
        Some(Self {
            category: category.to_string(),
            name: name.to_string(),
            event_type: event_type.to_string(),
            version: version.to_string(),
        })
    }

    /// Returns the versioned slug `category/name/type/v{version}`.
    #[must_use]
    pub fn slug(&self) -> String {
        format!(
            "{}/{}/{}/v{}",
            self.category, self.name, self.event_type, self.version
        )
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.slug())
    }
}

/// How the platform delivers an event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// HTTP POST to the extension.
    #[default]
    Rest,
    /// Publish to a Kafka topic.
    Kafka,
}

impl Provider {
    /// All providers, in sync order.
    pub const ALL: [Self; 2] = [Self::Rest, Self::Kafka];

    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rest => "rest",
            Self::Kafka => "kafka",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A delivered webhook, as passed to a [`WebhookHandler`].
#[derive(Clone, Debug)]
pub struct WebhookEvent {
    /// `name/type` of the event, e.g. `product/create`.
    pub name: String,
    /// The versioned slug the handler was registered under.
    pub slug: String,
    /// The untouched delivery body.
    pub body: serde_json::Value,
    /// The company the event belongs to.
    pub company_id: String,
    /// The sales channel, for application events.
    pub application_id: Option<String>,
}

/// Handles one kind of delivered event.
///
/// Implemented for any `Fn(WebhookEvent) -> impl Future<Output = Result<(), HandlerError>>`.
pub trait WebhookHandler: Send + Sync {
    /// Processes `event`.
    fn handle(&self, event: WebhookEvent) -> BoxFuture<'static, Result<(), HandlerError>>;
}

impl<F, Fut> WebhookHandler for F
where
    F: Fn(WebhookEvent) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    fn handle(&self, event: WebhookEvent) -> BoxFuture<'static, Result<(), HandlerError>> {
        Box::pin(self(event))
    }
}

/// Where a subscribed event is delivered.
#[derive(Clone)]
pub enum Delivery {
    /// Delivered over HTTP and dispatched to a local handler.
    Rest(Arc<dyn WebhookHandler>),
    /// Published to a Kafka topic the extension consumes itself.
    Kafka {
        /// The topic name.
        topic: String,
    },
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rest(_) => f.write_str("Rest(<handler>)"),
            Self::Kafka { topic } => f.debug_struct("Kafka").field("topic", topic).finish(),
        }
    }
}

/// One entry of the declared event map.
#[derive(Clone, Debug)]
pub struct EventSubscription {
    /// Event schema version.
    pub version: String,
    /// Delivery target.
    pub delivery: Delivery,
}

impl EventSubscription {
    /// Subscribes `handler` to REST deliveries of the event.
    #[must_use]
    pub fn rest(version: impl Into<String>, handler: impl WebhookHandler + 'static) -> Self {
        Self {
            version: version.into(),
            delivery: Delivery::Rest(Arc::new(handler)),
        }
    }

    /// Subscribes the event to a Kafka topic.
    #[must_use]
    pub fn kafka(version: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            delivery: Delivery::Kafka {
                topic: topic.into(),
            },
        }
    }
}

/// Which sales channels the subscriber listens to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SalesChannelScope {
    /// Every sales channel of the company.
    #[default]
    All,
    /// Only channels enabled through
    /// [`WebhookRegistry::enable_sales_channel_webhook`](super::WebhookRegistry::enable_sales_channel_webhook).
    Specific,
}

/// Webhook declarations of an extension.
///
/// Build with [`WebhookConfig::builder`]. Validation happens in
/// [`WebhookRegistry::initialize`](super::WebhookRegistry::initialize).
#[derive(Clone, Debug)]
pub struct WebhookConfig {
    api_path: String,
    notification_email: String,
    subscribe_on_install: bool,
    subscribed_saleschannel: SalesChannelScope,
    event_map: Vec<(String, EventSubscription)>,
}

impl WebhookConfig {
    /// Creates a new builder.
    #[must_use]
    pub fn builder() -> WebhookConfigBuilder {
        WebhookConfigBuilder::new()
    }

    /// Path on the extension receiving REST deliveries.
    #[must_use]
    pub fn api_path(&self) -> &str {
        &self.api_path
    }

    /// Address the platform notifies about delivery failures.
    #[must_use]
    pub fn notification_email(&self) -> &str {
        &self.notification_email
    }

    /// Whether the auth flow syncs subscribers after install.
    #[must_use]
    pub const fn subscribe_on_install(&self) -> bool {
        self.subscribe_on_install
    }

    /// Sales channel scope.
    #[must_use]
    pub const fn subscribed_saleschannel(&self) -> SalesChannelScope {
        self.subscribed_saleschannel
    }

    /// Declared `(category/name/type, subscription)` entries.
    #[must_use]
    pub fn event_map(&self) -> &[(String, EventSubscription)] {
        &self.event_map
    }
}

/// Builder for [`WebhookConfig`].
#[derive(Debug)]
pub struct WebhookConfigBuilder {
    api_path: String,
    notification_email: String,
    subscribe_on_install: bool,
    subscribed_saleschannel: SalesChannelScope,
    event_map: Vec<(String, EventSubscription)>,
}

impl Default for WebhookConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WebhookConfigBuilder {
    /// Creates a builder that subscribes on install to all sales channels.
    #[must_use]
    pub fn new() -> Self {
        Self {
            api_path: String::new(),
            notification_email: String::new(),
            subscribe_on_install: true,
            subscribed_saleschannel: SalesChannelScope::All,
            event_map: Vec::new(),
        }
    }

    /// Sets the delivery path (must start with `/`).
    #[must_use]
    pub fn api_path(mut self, path: impl Into<String>) -> Self {
        self.api_path = path.into();
        self
    }

    /// Sets the notification email.
    #[must_use]
    pub fn notification_email(mut self, email: impl Into<String>) -> Self {
        self.notification_email = email.into();
        self
    }

    /// Sets whether subscribers are synced after install.
    #[must_use]
    pub const fn subscribe_on_install(mut self, subscribe: bool) -> Self {
        self.subscribe_on_install = subscribe;
        self
    }

    /// Sets the sales channel scope.
    #[must_use]
    pub const fn subscribed_saleschannel(mut self, scope: SalesChannelScope) -> Self {
        self.subscribed_saleschannel = scope;
        self
    }

    /// Declares an event. A later declaration of the same key and version
    /// replaces the earlier one.
    #[must_use]
    pub fn event(mut self, key: impl Into<String>, subscription: EventSubscription) -> Self {
        let key = key.into();
        self.event_map
            .retain(|(k, s)| !(k == &key && s.version == subscription.version));
        self.event_map.push((key, subscription));
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> WebhookConfig {
        WebhookConfig {
            api_path: self.api_path,
            notification_email: self.notification_email,
            subscribe_on_install: self.subscribe_on_install,
            subscribed_saleschannel: self.subscribed_saleschannel,
            event_map: self.event_map,
        }
    }
}

/// Association criteria of a subscriber.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Criteria {
    /// All sales channels.
    #[default]
    All,
    /// The listed sales channels.
    Specific,
    /// Scoped to specific channels, none enabled yet.
    Empty,
}

impl Criteria {
    /// Derives the criteria from the scope and the attached application ids.
    ///
    /// ```rust
    /// use fdk_extension::webhooks::{Criteria, SalesChannelScope};
    ///
    /// assert_eq!(Criteria::for_scope(SalesChannelScope::Specific, &[]), Criteria::Empty);
    /// assert_eq!(
    ///     Criteria::for_scope(SalesChannelScope::Specific, &["a".to_string()]),
    ///     Criteria::Specific
    /// );
    /// assert_eq!(Criteria::for_scope(SalesChannelScope::All, &[]), Criteria::All);
    /// ```
    #[must_use]
    pub fn for_scope(scope: SalesChannelScope, application_ids: &[String]) -> Self {
        match scope {
            SalesChannelScope::All => Self::All,
            SalesChannelScope::Specific if application_ids.is_empty() => Self::Empty,
            SalesChannelScope::Specific => Self::Specific,
        }
    }
}

/// Subscriber status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriberStatus {
    /// Deliveries are sent.
    #[default]
    Active,
    /// Deliveries are paused.
    Inactive,
}

impl SubscriberStatus {
    /// Maps an enable flag to a status.
    #[must_use]
    pub const fn from_enabled(enabled: bool) -> Self {
        if enabled {
            Self::Active
        } else {
            Self::Inactive
        }
    }
}

/// Which company and sales channels a subscriber covers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
    /// The company id.
    #[serde(default, deserialize_with = "string_or_number")]
    pub company_id: Option<String>,
    /// Enabled sales channels.
    #[serde(default, deserialize_with = "null_as_default")]
    pub application_id: Vec<String>,
    /// Derived criteria.
    #[serde(default, deserialize_with = "null_as_default")]
    pub criteria: Criteria,
}

/// Delivery signing settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthMeta {
    /// Always `hmac`.
    #[serde(rename = "type", default = "AuthMeta::hmac_type", deserialize_with = "auth_kind")]
    pub kind: String,
    /// The signing secret.
    #[serde(default, deserialize_with = "null_as_default")]
    pub secret: String,
}

impl Default for AuthMeta {
    fn default() -> Self {
        Self::hmac("")
    }
}

fn auth_kind<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(AuthMeta::hmac_type))
}

impl AuthMeta {
    /// Creates HMAC settings for `secret`.
    #[must_use]
    pub fn hmac(secret: impl Into<String>) -> Self {
        Self {
            kind: Self::hmac_type(),
            secret: secret.into(),
        }
    }

    fn hmac_type() -> String {
        "hmac".to_string()
    }
}

/// An event a subscriber receives.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriberEvent {
    /// Versioned event slug.
    pub slug: String,
    /// Kafka topic, for Kafka subscribers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

/// A remote subscriber record, pruned to the fields the registry manages.
///
/// Deserializing drops every server-only field, so two records compare
/// equal whenever the managed state is the same.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberConfig {
    /// Remote id, absent until registered.
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "string_or_number")]
    pub id: Option<String>,
    /// Subscriber name (the extension API key).
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Delivery URL, for REST subscribers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    /// Delivery provider.
    #[serde(default, deserialize_with = "null_as_default")]
    pub provider: Provider,
    /// Company and sales channel association.
    #[serde(default, deserialize_with = "null_as_default")]
    pub association: Association,
    /// Whether deliveries are active.
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: SubscriberStatus,
    /// Delivery signing settings.
    #[serde(default, deserialize_with = "null_as_default")]
    pub auth_meta: AuthMeta,
    /// Subscribed events.
    #[serde(default, deserialize_with = "null_as_default")]
    pub events: Vec<SubscriberEvent>,
    /// Notification email.
    #[serde(default, deserialize_with = "null_as_default")]
    pub email_id: String,
}

/// Reads an explicit `null` as the field's default.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Result of syncing one provider's subscriber.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    /// A new subscriber was created.
    Registered(Provider),
    /// An existing subscriber was updated.
    Updated(Provider),
    /// Local and remote state already agree; nothing was written.
    Unchanged(Provider),
    /// Nothing was written for this provider.
    Skipped {
        /// The provider.
        provider: Provider,
        /// Why the provider was skipped.
        reason: String,
    },
}

// Verify public types are Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<WebhookConfig>();
    assert_send_sync::<SubscriberConfig>();
    assert_send_sync::<SyncOutcome>();
};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_key_requires_three_segments() {
        assert!(EventKey::parse("company/product/create", "1").is_some());
        assert!(EventKey::parse("company/product", "1").is_none());
        assert!(EventKey::parse("company/product/create/extra", "1").is_none());
        assert!(EventKey::parse("company//create", "1").is_none());
    }

    #[test]
    fn test_event_key_slug() {
        let key = EventKey::parse("application/coupon/update", "2").unwrap();
        assert_eq!(key.slug(), "application/coupon/update/v2");
    }

    #[test]
    fn test_builder_replaces_same_key_and_version() {
        let config = WebhookConfig::builder()
            .event("company/product/create", EventSubscription::kafka("1", "a"))
            .event("company/product/create", EventSubscription::kafka("1", "b"))
            .event("company/product/create", EventSubscription::kafka("2", "c"))
            .build();
        assert_eq!(config.event_map().len(), 2);
    }

    #[test]
    fn test_subscriber_config_prunes_server_fields() {
        let remote = json!({
            "id": 12,
            "name": "key",
            "webhook_url": "https://ext.example.com/webhook",
            "provider": "rest",
            "association": {"company_id": 1, "application_id": [], "criteria": "ALL", "extension_id": "x"},
            "status": "active",
            "auth_meta": {"type": "hmac", "secret": "s"},
            "events": [{"slug": "company/product/create/v1", "event_id": 5, "created_on": "2024-01-01"}],
            "email_id": "dev@example.com",
            "created_on": "2024-01-01",
            "modified_by": "someone"
        });
        let config: SubscriberConfig = serde_json::from_value(remote).unwrap();
        assert_eq!(config.id.as_deref(), Some("12"));
        assert_eq!(config.association.company_id.as_deref(), Some("1"));

        let value = serde_json::to_value(&config).unwrap();
        assert!(value.get("created_on").is_none());
        assert_eq!(
            value["events"],
            json!([{"slug": "company/product/create/v1"}])
        );
    }

    #[test]
    fn test_subscriber_config_reads_null_as_default() {
        let config: SubscriberConfig = serde_json::from_value(json!({
            "id": 7,
            "name": "key",
            "provider": "rest",
            "association": {"company_id": 1, "application_id": null, "criteria": null},
            "status": null,
            "auth_meta": {"type": null, "secret": "secret"},
            "events": null,
            "email_id": null
        }))
        .unwrap();

        assert!(config.association.application_id.is_empty());
        assert_eq!(config.association.criteria, Criteria::All);
        assert_eq!(config.status, SubscriberStatus::Active);
        assert_eq!(config.auth_meta, AuthMeta::hmac("secret"));
        assert!(config.events.is_empty());
        assert_eq!(config.email_id, "");

        let without_auth: SubscriberConfig =
            serde_json::from_value(json!({"name": "key", "auth_meta": null})).unwrap();
        assert_eq!(without_auth.auth_meta, AuthMeta::default());
    }

    #[test]
    fn test_criteria_serializes_uppercase() {
        assert_eq!(serde_json::to_value(Criteria::Empty).unwrap(), json!("EMPTY"));
    }

    #[tokio::test]
    async fn test_closure_handler() {
        let handler = |event: WebhookEvent| async move {
            if event.company_id == "1" {
                Ok(())
            } else {
                Err(HandlerError::from("unexpected company"))
            }
        };
        let event = WebhookEvent {
            name: "product/create".to_string(),
            slug: "company/product/create/v1".to_string(),
            body: json!({}),
            company_id: "1".to_string(),
            application_id: None,
        };
        assert!(handler.handle(event).await.is_ok());
    }
}
