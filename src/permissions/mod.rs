//! Permission dispatch for `can_use_tool` requests
//!
//! At most one callback decides whether a tool may run. The decision fails
//! closed: an error, a panic, or an overrun is a deny, never an allow.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{ClaudeError, Result};
use crate::supervise::{Supervised, supervise};
use crate::types::permissions::{
    CanUseToolCallback, PermissionResult, ToolPermissionContext,
};

/// Permission manager wrapping the session's permission callback
#[derive(Clone)]
pub struct PermissionManager {
    callback: Option<CanUseToolCallback>,
    timeout: Duration,
}

impl PermissionManager {
    /// Create a manager around an optional callback
    #[must_use]
    pub fn new(callback: Option<CanUseToolCallback>, timeout: Duration) -> Self {
        Self { callback, timeout }
    }

    /// Whether a callback is configured
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.callback.is_some()
    }

    /// Ask the callback about one tool use
    ///
    /// # Errors
    /// Returns `ControlProtocol` when no callback is configured; callback
    /// failures are not errors, they come back as [`PermissionResult::Deny`]
    pub async fn decide(&self, context: ToolPermissionContext) -> Result<PermissionResult> {
        let Some(ref callback) = self.callback else {
            return Err(ClaudeError::control_protocol(
                "can_use_tool received but no permission callback is configured",
            ));
        };

        let tool = context.tool_name.clone();
        let callback = Arc::clone(callback);
        match supervise(self.timeout, None, move || callback(context)).await {
            Supervised::Completed(result) => {
                log::debug!(
                    "Permission for {tool}: {}",
                    if result.is_allow() { "allow" } else { "deny" }
                );
                Ok(result)
            }
            Supervised::Failed(reason) => {
                log::warn!("Permission callback failed for {tool}, denying: {reason}");
                Ok(PermissionResult::deny(format!(
                    "Permission callback failed: {reason}"
                )))
            }
            Supervised::TimedOut => {
                log::warn!(
                    "Permission callback for {tool} exceeded {:?}, denying",
                    self.timeout
                );
                Ok(PermissionResult::deny(format!(
                    "Permission callback timed out after {:?}",
                    self.timeout
                )))
            }
        }
    }

    /// Create a permission callback from a closure
    pub fn callback<F, Fut>(f: F) -> CanUseToolCallback
    where
        F: Fn(ToolPermissionContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<PermissionResult>> + Send + 'static,
    {
        Arc::new(move |context| Box::pin(f(context)))
    }
}

impl std::fmt::Debug for PermissionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionManager")
            .field("callback", &self.callback.as_ref().map(|_| "<callback>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}
