//! HTTP client types for platform API communication.
//!
//! This module provides the HTTP layer used for token exchange, the webhook
//! event catalog and subscriber management.
//!
//! # Overview
//!
//! - [`HttpClient`]: The async HTTP client for API communication
//! - [`ClientAuth`]: Bearer or basic credentials attached to each request
//! - [`HttpRequest`]: A request to be sent to the API
//! - [`HttpResponse`]: A parsed response from the API
//! - [`HttpMethod`]: Supported HTTP methods (GET, POST, PUT, DELETE)
//! - [`DataType`]: Content types for request bodies
//! - [`PlatformClient`]: A company-scoped, bearer-authenticated client
//!
//! # Retry Behavior
//!
//! The client does not retry. [`HttpError`] classifies timeouts and
//! `502`/`503`/`504` responses as retryable, and the webhook registry routes
//! its calls through a [`RetryManager`](crate::RetryManager).

mod errors;
mod http_client;
mod http_request;
mod http_response;
mod platform;

pub use errors::{HttpError, HttpResponseError, InvalidHttpRequestError};
pub use http_client::{ClientAuth, HttpClient, SDK_VERSION};
pub use http_request::{DataType, HttpMethod, HttpRequest, HttpRequestBuilder};
pub use http_response::HttpResponse;
pub use platform::PlatformClient;
