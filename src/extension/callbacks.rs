//! Integrator callbacks invoked at the end of each flow.

use crate::auth::{Session, Tenant};
use crate::BoxFuture;

use super::request::ExtensionRequest;

/// Error type returned by integrator callbacks.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// What a callback sees about the request that triggered it.
#[derive(Clone, Debug)]
pub struct CallbackContext {
    /// The inbound request.
    pub request: ExtensionRequest,
    /// The tenant the flow ran for.
    pub tenant: Tenant,
    /// The session the flow produced or consumed, when one exists.
    pub session: Option<Session>,
}

/// Hooks the extension supplies to the install, uninstall and auto-install
/// flows.
///
/// # Example
///
/// ```rust
/// use fdk_extension::BoxFuture;
/// use fdk_extension::extension::{CallbackContext, CallbackError, ExtensionCallbacks};
///
/// struct MyCallbacks;
///
/// impl ExtensionCallbacks for MyCallbacks {
///     fn auth<'a>(&'a self, ctx: &'a CallbackContext) -> BoxFuture<'a, Result<String, CallbackError>> {
///         Box::pin(async move { Ok(format!("https://myext.example.com/company/{}", ctx.tenant.id())) })
///     }
///
///     fn uninstall<'a>(&'a self, _ctx: &'a CallbackContext) -> BoxFuture<'a, Result<(), CallbackError>> {
///         Box::pin(async { Ok(()) })
///     }
/// }
/// ```
pub trait ExtensionCallbacks: Send + Sync {
    /// Called after a successful auth callback; returns the redirect URL.
    fn auth<'a>(&'a self, ctx: &'a CallbackContext) -> BoxFuture<'a, Result<String, CallbackError>>;

    /// Called after the extension was uninstalled.
    fn uninstall<'a>(&'a self, ctx: &'a CallbackContext) -> BoxFuture<'a, Result<(), CallbackError>>;

    /// Called after a server-to-server install. Does nothing by default.
    fn auto_install<'a>(
        &'a self,
        _ctx: &'a CallbackContext,
    ) -> BoxFuture<'a, Result<(), CallbackError>> {
        Box::pin(async { Ok(()) })
    }
}
