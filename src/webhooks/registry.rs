//! Webhook registry and subscriber reconciliation.
//!
//! The [`WebhookRegistry`] owns the validated event map of an extension and
//! keeps the platform's subscriber records in line with it.
//!
//! # Lifecycle
//!
//! 1. [`initialize`](WebhookRegistry::initialize) validates a
//!    [`WebhookConfig`] and resolves every declared event against the
//!    platform catalog. Any failure leaves the previous state in place.
//! 2. [`sync_events`](WebhookRegistry::sync_events) fetches the company's
//!    subscribers and, per provider, registers or updates them only when the
//!    local declaration differs from the remote record.
//! 3. [`process_webhook`](WebhookRegistry::process_webhook) verifies an
//!    inbound delivery and dispatches it to its handler.
//!
//! Every outbound call goes through the registry's
//! [`RetryManager`](crate::RetryManager), keyed by operation, company and
//! API key.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::clients::{ClientAuth, HttpClient, HttpError, HttpRequest, HttpResponse, PlatformClient};
use crate::config::ExtensionConfig;
use crate::retry::RetryManager;

use super::catalog::fetch_event_ids;
use super::errors::WebhookError;
use super::protocol::{SubscriberApi, SubscriberWrite};
use super::types::{
    Association, AuthMeta, Criteria, Delivery, EventKey, Provider, SalesChannelScope,
    SubscriberConfig, SubscriberEvent, SubscriberStatus, SyncOutcome, WebhookConfig,
    WebhookEvent, WebhookHandler,
};
use super::verification::{verify_delivery, WebhookDelivery};

/// Event name of the platform's connectivity check.
pub const PING_EVENT: &str = "ping";

/// The validated, catalog-resolved event map.
struct RegistryState {
    config: WebhookConfig,
    handlers: HashMap<String, Arc<dyn WebhookHandler>>,
    topics: HashMap<String, String>,
    event_ids: HashMap<String, i64>,
}

impl RegistryState {
    /// Desired subscriber events for `provider`, ordered by slug.
    ///
    /// Events without a catalog id are dropped.
    fn events_for(&self, provider: Provider) -> Vec<SubscriberEvent> {
        let mut events: Vec<SubscriberEvent> = match provider {
            Provider::Rest => self
                .handlers
                .keys()
                .map(|slug| SubscriberEvent {
                    slug: slug.clone(),
                    topic: None,
                })
                .collect(),
            Provider::Kafka => self
                .topics
                .iter()
                .map(|(slug, topic)| SubscriberEvent {
                    slug: slug.clone(),
                    topic: Some(topic.clone()),
                })
                .collect(),
        };
        events.retain(|event| self.event_ids.contains_key(&event.slug));
        events.sort_by(|a, b| a.slug.cmp(&b.slug));
        events
    }
}

/// Registry of declared webhook events.
///
/// # Thread Safety
///
/// `WebhookRegistry` is `Send + Sync`. Initialization swaps in a complete
/// new state, so concurrent syncs observe either the old or the new event
/// map, never a mix.
pub struct WebhookRegistry {
    config: Arc<ExtensionConfig>,
    catalog: HttpClient,
    retry: RetryManager,
    state: RwLock<Option<Arc<RegistryState>>>,
}

impl fmt::Debug for WebhookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookRegistry")
            .field("api_key", self.config.api_key())
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

// Verify WebhookRegistry is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<WebhookRegistry>();
};

impl WebhookRegistry {
    /// Creates an uninitialized registry for the extension.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Network`] if the catalog client cannot be built.
    pub fn new(config: Arc<ExtensionConfig>) -> Result<Self, HttpError> {
        let catalog = HttpClient::new(config.cluster().as_ref(), ClientAuth::None, &config)?;
        let retry = RetryManager::new(config.retry_policy().clone());
        Ok(Self {
            config,
            catalog,
            retry,
            state: RwLock::new(None),
        })
    }

    /// Validates `webhook_config` and resolves its events.
    ///
    /// # Errors
    ///
    /// - [`WebhookError::InvalidConfig`] for a malformed declaration, or when
    ///   the catalog does not know some events; the message lists all of them
    /// - [`WebhookError::Registration`] when the catalog call fails
    pub async fn initialize(&self, webhook_config: WebhookConfig) -> Result<(), WebhookError> {
        let declared = validate(&webhook_config)?;

        let keys: Vec<EventKey> = declared.iter().map(|(key, _)| key.clone()).collect();
        let retry_key = format!("fetch_event_catalog_{}", self.config.api_key());
        let event_ids = self
            .retry
            .execute_with_retry(&retry_key, || fetch_event_ids(&self.catalog, &keys))
            .await
            .map_err(|source| WebhookError::Registration {
                operation: "fetch event catalog",
                source,
            })?;

        let missing: Vec<String> = keys
            .iter()
            .map(EventKey::slug)
            .filter(|slug| !event_ids.contains_key(slug))
            .collect();
        if !missing.is_empty() {
            return Err(WebhookError::InvalidConfig {
                reason: format!("Webhooks events {} not found", missing.join(", ")),
            });
        }

        let mut handlers = HashMap::new();
        let mut topics = HashMap::new();
        for (key, delivery) in declared {
            match delivery {
                Delivery::Rest(handler) => {
                    handlers.insert(key.slug(), handler);
                }
                Delivery::Kafka { topic } => {
                    topics.insert(key.slug(), topic);
                }
            }
        }

        tracing::info!(
            "Webhook registry initialized with {} REST and {} Kafka events",
            handlers.len(),
            topics.len()
        );

        *self.state.write().await = Some(Arc::new(RegistryState {
            config: webhook_config,
            handlers,
            topics,
            event_ids,
        }));
        Ok(())
    }

    /// Returns whether [`initialize`](Self::initialize) has succeeded.
    pub async fn is_initialized(&self) -> bool {
        self.state.read().await.is_some()
    }

    /// Returns whether the auth flow should sync subscribers after install.
    pub async fn subscribe_on_install(&self) -> bool {
        self.state
            .read()
            .await
            .as_ref()
            .is_some_and(|state| state.config.subscribe_on_install())
    }

    async fn snapshot(&self) -> Result<Arc<RegistryState>, WebhookError> {
        self.state
            .read()
            .await
            .clone()
            .ok_or(WebhookError::NotInitialized)
    }

    /// Brings the company's subscribers in line with the declared events.
    ///
    /// `override_config` re-initializes the registry first. `enable_webhooks`
    /// forces the subscriber status when set.
    ///
    /// Returns one outcome per provider. A second call with unchanged local
    /// and remote state performs no writes.
    ///
    /// # Errors
    ///
    /// - [`WebhookError::NotInitialized`] before initialization
    /// - [`WebhookError::Registration`] when a platform call fails after
    ///   retries
    pub async fn sync_events(
        &self,
        client: &PlatformClient,
        override_config: Option<WebhookConfig>,
        enable_webhooks: Option<bool>,
    ) -> Result<Vec<SyncOutcome>, WebhookError> {
        if let Some(config) = override_config {
            self.initialize(config).await?;
        }
        let state = self.snapshot().await?;

        let subscribers = self.fetch_subscribers(client).await?;

        let mut outcomes = Vec::with_capacity(Provider::ALL.len());
        for provider in Provider::ALL {
            let existing = subscribers
                .iter()
                .find(|config| config.provider == provider)
                .cloned();
            let outcome = self
                .sync_subscriber(client, &state, provider, existing, enable_webhooks)
                .await?;
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    async fn sync_subscriber(
        &self,
        client: &PlatformClient,
        state: &RegistryState,
        provider: Provider,
        existing: Option<SubscriberConfig>,
        enable_webhooks: Option<bool>,
    ) -> Result<SyncOutcome, WebhookError> {
        let desired = state.events_for(provider);

        let Some(mut current) = existing else {
            if desired.is_empty() {
                tracing::debug!("No {provider} events declared; skipping subscriber registration");
                return Ok(SyncOutcome::Skipped {
                    provider,
                    reason: "no events to subscribe".to_string(),
                });
            }

            let config = self.new_subscriber(client, &state.config, provider, desired, enable_webhooks);
            if !self.write(client, state, SubscriberWrite::Register, &config).await? {
                return Ok(unsupported(provider));
            }
            tracing::info!(
                "Registered {provider} webhook subscriber for company {}",
                client.company_id()
            );
            return Ok(SyncOutcome::Registered(provider));
        };

        let mut config_updated = false;

        let secret = self.config.api_secret_key().as_ref();
        if current.auth_meta.secret != secret {
            current.auth_meta = AuthMeta::hmac(secret);
            config_updated = true;
        }

        if let Some(enabled) = enable_webhooks {
            let status = SubscriberStatus::from_enabled(enabled);
            if current.status != status {
                current.status = status;
                config_updated = true;
            }
        }

        if self.apply_config_drift(&mut current, &state.config, provider) {
            config_updated = true;
        }

        let existing_events: BTreeSet<&SubscriberEvent> = current.events.iter().collect();
        let desired_events: BTreeSet<&SubscriberEvent> = desired.iter().collect();
        let events_changed = existing_events
            .symmetric_difference(&desired_events)
            .next()
            .is_some();

        if !events_changed && !config_updated {
            tracing::debug!(
                "{provider} webhook subscriber for company {} is up to date",
                client.company_id()
            );
            return Ok(SyncOutcome::Unchanged(provider));
        }

        current.events = desired;
        if !self.write(client, state, SubscriberWrite::Update, &current).await? {
            return Ok(unsupported(provider));
        }
        tracing::info!(
            "Updated {provider} webhook subscriber for company {}",
            client.company_id()
        );
        Ok(SyncOutcome::Updated(provider))
    }

    fn new_subscriber(
        &self,
        client: &PlatformClient,
        webhook_config: &WebhookConfig,
        provider: Provider,
        events: Vec<SubscriberEvent>,
        enable_webhooks: Option<bool>,
    ) -> SubscriberConfig {
        let scope = webhook_config.subscribed_saleschannel();
        SubscriberConfig {
            id: None,
            name: self.config.api_key().to_string(),
            webhook_url: (provider == Provider::Rest).then(|| self.webhook_url(webhook_config)),
            provider,
            association: Association {
                company_id: Some(client.company_id().to_string()),
                application_id: Vec::new(),
                criteria: Criteria::for_scope(scope, &[]),
            },
            status: enable_webhooks.map_or(SubscriberStatus::Active, SubscriberStatus::from_enabled),
            auth_meta: AuthMeta::hmac(self.config.api_secret_key().as_ref()),
            events,
            email_id: webhook_config.notification_email().to_string(),
        }
    }

    fn webhook_url(&self, webhook_config: &WebhookConfig) -> String {
        self.config.base_url().join(webhook_config.api_path())
    }

    /// Corrects criteria, email and URL drift on `current`. Returns whether
    /// anything changed.
    fn apply_config_drift(
        &self,
        current: &mut SubscriberConfig,
        webhook_config: &WebhookConfig,
        provider: Provider,
    ) -> bool {
        let mut updated = false;

        let criteria = Criteria::for_scope(
            webhook_config.subscribed_saleschannel(),
            &current.association.application_id,
        );
        if current.association.criteria != criteria {
            current.association.criteria = criteria;
            updated = true;
        }

        if current.email_id != webhook_config.notification_email() {
            current.email_id = webhook_config.notification_email().to_string();
            updated = true;
        }

        if provider == Provider::Rest {
            let url = self.webhook_url(webhook_config);
            if current.webhook_url.as_deref() != Some(url.as_str()) {
                current.webhook_url = Some(url);
                updated = true;
            }
        }

        updated
    }

    /// Adds `application_id` to every subscriber of the company.
    ///
    /// A no-op when the id is already present.
    ///
    /// # Errors
    ///
    /// - [`WebhookError::NotInitialized`] before initialization
    /// - [`WebhookError::InvalidConfig`] unless the sales channel scope is
    ///   [`SalesChannelScope::Specific`]
    /// - [`WebhookError::SubscriberNotFound`] when no subscriber exists
    /// - [`WebhookError::Registration`] when a platform call fails
    pub async fn enable_sales_channel_webhook(
        &self,
        client: &PlatformClient,
        application_id: &str,
    ) -> Result<(), WebhookError> {
        self.update_sales_channel(client, application_id, true).await
    }

    /// Removes `application_id` from every subscriber of the company.
    ///
    /// A no-op when the id is absent.
    ///
    /// # Errors
    ///
    /// Same as [`enable_sales_channel_webhook`](Self::enable_sales_channel_webhook).
    pub async fn disable_sales_channel_webhook(
        &self,
        client: &PlatformClient,
        application_id: &str,
    ) -> Result<(), WebhookError> {
        self.update_sales_channel(client, application_id, false).await
    }

    async fn update_sales_channel(
        &self,
        client: &PlatformClient,
        application_id: &str,
        enable: bool,
    ) -> Result<(), WebhookError> {
        let state = self.snapshot().await?;
        if state.config.subscribed_saleschannel() != SalesChannelScope::Specific {
            return Err(WebhookError::InvalidConfig {
                reason: "`subscribed_saleschannel` is not set to `specific`".to_string(),
            });
        }

        let subscribers = self.fetch_subscribers(client).await?;
        if subscribers.is_empty() {
            return Err(WebhookError::SubscriberNotFound {
                company_id: client.company_id().to_string(),
            });
        }

        for mut config in subscribers {
            let ids = &mut config.association.application_id;
            let position = ids.iter().position(|id| id == application_id);
            let changed = match (enable, position) {
                (true, None) => {
                    ids.push(application_id.to_string());
                    true
                }
                (false, Some(index)) => {
                    ids.remove(index);
                    true
                }
                _ => false,
            };
            if !changed {
                tracing::debug!(
                    "Sales channel {application_id} already {} for {} subscriber",
                    if enable { "enabled" } else { "disabled" },
                    config.provider
                );
                continue;
            }

            config.association.criteria =
                Criteria::for_scope(SalesChannelScope::Specific, &config.association.application_id);
            self.write(client, &state, SubscriberWrite::Update, &config)
                .await?;
            tracing::info!(
                "Sales channel {application_id} {} for {} subscriber of company {}",
                if enable { "enabled" } else { "disabled" },
                config.provider,
                client.company_id()
            );
        }
        Ok(())
    }

    /// Verifies `delivery` and dispatches it to its handler.
    ///
    /// The ping event is acknowledged without verification or dispatch. The
    /// body is passed to the handler untouched.
    ///
    /// # Errors
    ///
    /// - [`WebhookError::InvalidSignature`] when verification fails
    /// - [`WebhookError::NotInitialized`] before initialization
    /// - [`WebhookError::HandlerNotFound`] when no handler is registered
    /// - [`WebhookError::Process`] for malformed bodies and handler failures
    pub async fn process_webhook(&self, delivery: &WebhookDelivery) -> Result<(), WebhookError> {
        let body = delivery.body();
        let event = body.get("event").unwrap_or(&Value::Null);

        let name = event.get("name").and_then(Value::as_str);
        if name == Some(PING_EVENT) {
            tracing::debug!("Received webhook ping");
            return Ok(());
        }

        let state = self.snapshot().await?;
        verify_delivery(delivery, self.config.api_secret_key().as_ref(), Utc::now())?;

        let field = |name: &str| event.get(name).and_then(value_to_string);
        let (Some(category), Some(name), Some(event_type), Some(version)) =
            (field("category"), field("name"), field("type"), field("version"))
        else {
            return Err(WebhookError::Process {
                message: "delivery body has no complete `event` descriptor".to_string(),
            });
        };
        let key = EventKey {
            category,
            name,
            event_type,
            version,
        };
        let slug = key.slug();

        let handler = state
            .handlers
            .get(&slug)
            .cloned()
            .ok_or_else(|| WebhookError::HandlerNotFound { event: slug.clone() })?;

        let event = WebhookEvent {
            name: format!("{}/{}", key.name, key.event_type),
            slug,
            body: body.clone(),
            company_id: body
                .get("company_id")
                .and_then(value_to_string)
                .unwrap_or_default(),
            application_id: body.get("application_id").and_then(value_to_string),
        };

        handler
            .handle(event)
            .await
            .map_err(|e| WebhookError::Process {
                message: e.to_string(),
            })
    }

    fn retry_key(&self, operation: &str, company_id: &str) -> String {
        format!("{operation}_{company_id}_{}", self.config.api_key())
    }

    async fn fetch_subscribers(
        &self,
        client: &PlatformClient,
    ) -> Result<Vec<SubscriberConfig>, WebhookError> {
        let api_key = self.config.api_key().as_ref();
        let response = self
            .send(
                client,
                "fetch_subscribers",
                "fetch subscriber config",
                Provider::Rest,
                |api| api.list_request(client.company_id(), api_key),
            )
            .await?;
        let Some((api, response)) = response else {
            return Ok(Vec::new());
        };
        api.parse_list(&response)
            .map_err(|source| WebhookError::Registration {
                operation: "fetch subscriber config",
                source,
            })
    }

    /// Writes `config`; returns `false` when no API version supports its
    /// provider.
    async fn write(
        &self,
        client: &PlatformClient,
        state: &RegistryState,
        write: SubscriberWrite,
        config: &SubscriberConfig,
    ) -> Result<bool, WebhookError> {
        let response = self
            .send(
                client,
                write.retry_name(),
                write.operation(),
                config.provider,
                |api| api.write_request(write, client.company_id(), config, &state.event_ids),
            )
            .await?;
        Ok(response.is_some())
    }

    /// Sends a subscriber call, v2 first and v1 on `404`.
    ///
    /// Returns `None` when v2 is unavailable and v1 does not support
    /// `provider`.
    async fn send(
        &self,
        client: &PlatformClient,
        retry_name: &str,
        operation: &'static str,
        provider: Provider,
        build: impl Fn(SubscriberApi) -> Result<HttpRequest, HttpError>,
    ) -> Result<Option<(SubscriberApi, HttpResponse)>, WebhookError> {
        let key = self.retry_key(retry_name, client.company_id());
        let registration = |source| WebhookError::Registration { operation, source };

        let request = build(SubscriberApi::V2).map_err(registration)?;
        match self
            .retry
            .execute_with_retry(&key, || client.request(request.clone()))
            .await
        {
            Ok(response) => return Ok(Some((SubscriberApi::V2, response))),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(registration(e)),
        }

        if !SubscriberApi::V1.supports(provider) {
            tracing::warn!("Webhook v2 API unavailable and v1 does not support {provider} subscribers; skipping {operation}");
            return Ok(None);
        }

        tracing::warn!("Webhook v2 API not found; falling back to v1 to {operation}");
        let request = build(SubscriberApi::V1).map_err(registration)?;
        self.retry
            .execute_with_retry(&key, || client.request(request.clone()))
            .await
            .map(|response| Some((SubscriberApi::V1, response)))
            .map_err(registration)
    }
}

fn unsupported(provider: Provider) -> SyncOutcome {
    SyncOutcome::Skipped {
        provider,
        reason: format!("{provider} subscribers are not supported by the v1 webhook API"),
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !email.chars().any(char::is_whitespace)
        && !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|part| !part.is_empty())
}

/// Checks the declaration and parses its keys.
fn validate(config: &WebhookConfig) -> Result<Vec<(EventKey, Delivery)>, WebhookError> {
    let invalid = |reason: String| WebhookError::InvalidConfig { reason };

    if !is_valid_email(config.notification_email()) {
        return Err(invalid(format!(
            "Invalid or missing notification_email: {:?}",
            config.notification_email()
        )));
    }
    if !config.api_path().starts_with('/') {
        return Err(invalid(format!(
            "api_path must start with '/': {:?}",
            config.api_path()
        )));
    }
    if config.event_map().is_empty() {
        return Err(invalid("event_map is empty".to_string()));
    }

    config
        .event_map()
        .iter()
        .map(|(name, subscription)| {
            if subscription.version.is_empty() {
                return Err(invalid(format!("Missing version in webhook event {name}")));
            }
            let key = EventKey::parse(name, &subscription.version).ok_or_else(|| {
                invalid(format!(
                    "Invalid webhook event map key {name}: expected category/name/type"
                ))
            })?;
            if let Delivery::Kafka { topic } = &subscription.delivery {
                if topic.is_empty() {
                    return Err(invalid(format!("Missing topic in webhook event {name}")));
                }
            }
            Ok((key, subscription.delivery.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiKey, ApiSecretKey, HostUrl};
    use crate::webhooks::types::{EventSubscription, HandlerError, WebhookConfigBuilder};

    fn noop(_event: WebhookEvent) -> std::future::Ready<Result<(), HandlerError>> {
        std::future::ready(Ok(()))
    }

    fn base() -> WebhookConfigBuilder {
        WebhookConfig::builder()
            .api_path("/api/v1/webhooks")
            .notification_email("dev@example.com")
    }

    fn registry() -> WebhookRegistry {
        let config = ExtensionConfig::builder()
            .api_key(ApiKey::new("key").unwrap())
            .api_secret_key(ApiSecretKey::new("secret").unwrap())
            .base_url(HostUrl::new("https://ext.example.com").unwrap())
            .cluster(HostUrl::new("http://127.0.0.1:9").unwrap())
            .build()
            .unwrap();
        WebhookRegistry::new(Arc::new(config)).unwrap()
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("dev@example.com"));
        assert!(!is_valid_email("dev@example"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("dev example@example.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_validate_rejects_relative_api_path() {
        let config = base()
            .api_path("webhooks")
            .event("company/product/create", EventSubscription::rest("1", noop))
            .build();
        assert!(matches!(validate(&config), Err(WebhookError::InvalidConfig { .. })));
    }

    #[test]
    fn test_validate_rejects_empty_event_map() {
        let err = validate(&base().build()).unwrap_err();
        assert!(err.to_string().contains("event_map is empty"));
    }

    #[test]
    fn test_validate_rejects_two_segment_key() {
        let config = base()
            .event("product/create", EventSubscription::rest("1", noop))
            .build();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("product/create"));
    }

    #[test]
    fn test_validate_rejects_missing_version_and_topic() {
        let config = base()
            .event("company/product/create", EventSubscription::rest("", noop))
            .build();
        assert!(validate(&config).unwrap_err().to_string().contains("version"));

        let config = base()
            .event("company/product/create", EventSubscription::kafka("1", ""))
            .build();
        assert!(validate(&config).unwrap_err().to_string().contains("topic"));
    }

    #[tokio::test]
    async fn test_invalid_config_fails_before_any_network_call() {
        let registry = registry();
        let result = registry.initialize(base().build()).await;
        assert!(matches!(result, Err(WebhookError::InvalidConfig { .. })));
        assert!(!registry.is_initialized().await);
    }

    #[tokio::test]
    async fn test_ping_is_acknowledged_without_initialization() {
        let registry = registry();
        let delivery = WebhookDelivery::new(serde_json::json!({"event": {"name": "ping"}}));
        assert!(registry.process_webhook(&delivery).await.is_ok());
    }

    #[tokio::test]
    async fn test_process_before_initialize_fails() {
        let registry = registry();
        let delivery = WebhookDelivery::new(serde_json::json!({
            "event": {"category": "company", "name": "product", "type": "create", "version": "1"}
        }));
        assert!(matches!(
            registry.process_webhook(&delivery).await,
            Err(WebhookError::NotInitialized)
        ));
    }

    #[test]
    fn test_events_for_drops_unresolved_events() {
        let handler: Arc<dyn WebhookHandler> = Arc::new(noop);
        let state = RegistryState {
            config: base().build(),
            handlers: HashMap::from([
                ("company/product/update/v1".to_string(), handler.clone()),
                ("company/product/create/v1".to_string(), handler),
            ]),
            topics: HashMap::from([(
                "application/coupon/update/v1".to_string(),
                "coupons".to_string(),
            )]),
            event_ids: HashMap::from([
                ("company/product/create/v1".to_string(), 1),
                ("company/product/update/v1".to_string(), 2),
            ]),
        };

        let rest = state.events_for(Provider::Rest);
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[0].slug, "company/product/create/v1");
        assert!(state.events_for(Provider::Kafka).is_empty());
    }
}
