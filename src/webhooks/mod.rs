//! Webhook subscription management and delivery processing.
//!
//! The extension declares the events it wants in a [`WebhookConfig`]: each
//! `category/name/type` key maps to a version and a [`Delivery`], either a
//! local REST handler or a Kafka topic. The [`WebhookRegistry`] validates
//! that declaration against the platform event catalog and keeps the
//! company's subscriber records in line with it.
//!
//! # Overview
//!
//! - [`WebhookRegistry`]: initialization, sync, sales channel toggles and
//!   inbound dispatch
//! - [`WebhookConfig`] / [`EventSubscription`]: the declared event map
//! - [`SubscriberConfig`]: the pruned remote subscriber record
//! - [`Criteria`]: association criteria derived from the sales channel scope
//! - [`WebhookDelivery`] / [`verify_delivery`]: inbound authenticity checks
//! - [`WebhookError`]: error types
//!
//! # Idempotent sync
//!
//! [`WebhookRegistry::sync_events`] only writes when the secret, status,
//! criteria, notification email, delivery URL or event set differ from the
//! remote record. Repeated syncs with unchanged declarations issue reads
//! only.
//!
//! # API versions
//!
//! Subscriber calls use the v2 API and fall back to v1 when v2 answers
//! `404`. v1 only stores REST subscribers; Kafka subscribers are reported as
//! [`SyncOutcome::Skipped`] in that case.

mod catalog;
mod errors;
mod protocol;
mod registry;
mod types;
mod verification;

pub use errors::WebhookError;
pub use registry::{WebhookRegistry, PING_EVENT};
pub use types::{
    Association, AuthMeta, Criteria, Delivery, EventKey, EventSubscription, HandlerError,
    Provider, SalesChannelScope, SubscriberConfig, SubscriberEvent, SubscriberStatus, SyncOutcome,
    WebhookConfig, WebhookConfigBuilder, WebhookEvent, WebhookHandler,
};
pub use verification::{verify_delivery, WebhookDelivery};
