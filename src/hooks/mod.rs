//! Hook system for intercepting agent events
//!
//! Hooks are registered per event from [`ClaudeAgentOptions::hooks`]. Every
//! callback gets its own id (`hook_0`, `hook_1`, ...), announced to the CLI in
//! the initialize request. When the CLI sends `hook_callback` with one of
//! those ids, the callback runs under its time budget; a callback that fails,
//! panics, or overruns yields the neutral output instead.
//!
//! [`ClaudeAgentOptions::hooks`]: crate::types::options::ClaudeAgentOptions::hooks

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::{ClaudeError, Result};
use crate::supervise::{Supervised, supervise};
use crate::types::hooks::{HookCallback, HookContext, HookEvent, HookMatcher, HookOutput};
use crate::types::identifiers::SessionId;

/// Which tools a registration fires for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolMatcher {
    /// A tool name, or `|`-separated alternatives
    Exact(String),
    /// Any tool
    Wildcard,
    /// Always, tool or not
    Unconditional,
}

impl ToolMatcher {
    /// Interpret a matcher pattern
    #[must_use]
    pub fn parse(pattern: Option<&str>) -> Self {
        match pattern.map(str::trim) {
            None | Some("") => Self::Unconditional,
            Some("*") => Self::Wildcard,
            Some(name) => Self::Exact(name.to_string()),
        }
    }

    /// Pattern as sent to the CLI
    #[must_use]
    pub fn pattern(&self) -> Option<&str> {
        match self {
            Self::Exact(name) => Some(name),
            Self::Wildcard => Some("*"),
            Self::Unconditional => None,
        }
    }

    /// Check if the matcher fires for `tool_name`
    ///
    /// # Examples
    /// ```
    /// use kodegen_claude_control::hooks::ToolMatcher;
    ///
    /// assert!(ToolMatcher::Wildcard.matches(Some("Bash")));
    /// assert!(ToolMatcher::parse(Some("Read|Write")).matches(Some("Write")));
    /// assert!(!ToolMatcher::parse(Some("Bash")).matches(None));
    /// assert!(ToolMatcher::parse(None).matches(None));
    /// ```
    #[must_use]
    pub fn matches(&self, tool_name: Option<&str>) -> bool {
        match (self, tool_name) {
            (Self::Unconditional, _) => true,
            (Self::Wildcard, tool) => tool.is_some(),
            (Self::Exact(pattern), Some(name)) => {
                pattern == name || pattern.split('|').any(|p| p.trim() == name)
            }
            (Self::Exact(_), None) => false,
        }
    }
}

/// One registered callback
#[derive(Clone)]
pub struct HookRegistration {
    /// Id announced at initialize
    pub id: String,
    /// Event the callback belongs to
    pub event: HookEvent,
    /// Tool filter
    pub matcher: ToolMatcher,
    /// The callback
    pub callback: HookCallback,
    /// Budget set on the matcher, if any
    pub timeout: Option<Duration>,
}

impl std::fmt::Debug for HookRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistration")
            .field("id", &self.id)
            .field("event", &self.event)
            .field("matcher", &self.matcher)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Hook manager for registering and invoking hooks
pub struct HookManager {
    registrations: HashMap<String, HookRegistration>,
    // Initialize payload, grouped the way the matchers were configured
    announced: Vec<(HookEvent, Vec<AnnouncedMatcher>)>,
    default_timeout: Duration,
}

struct AnnouncedMatcher {
    matcher: ToolMatcher,
    ids: Vec<String>,
    timeout: Option<Duration>,
}

impl HookManager {
    /// Create a hook manager without registrations
    #[must_use]
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            registrations: HashMap::new(),
            announced: Vec::new(),
            default_timeout,
        }
    }

    /// Build registrations from configured matchers
    ///
    /// Ids are assigned in event order, then matcher order, then callback
    /// order, so the same configuration always yields the same ids.
    #[must_use]
    pub fn from_config(
        hooks: Option<&HashMap<HookEvent, Vec<HookMatcher>>>,
        default_timeout: Duration,
    ) -> Self {
        let mut manager = Self::new(default_timeout);
        let Some(hooks) = hooks else {
            return manager;
        };
        for event in HookEvent::ALL {
            if let Some(matchers) = hooks.get(&event) {
                for matcher in matchers {
                    manager.register(event, matcher.clone());
                }
            }
        }
        manager
    }

    /// Register every callback of `matcher` under `event`
    ///
    /// Returns the ids handed out.
    pub fn register(&mut self, event: HookEvent, matcher: HookMatcher) -> Vec<String> {
        let tool_matcher = ToolMatcher::parse(matcher.matcher.as_deref());
        let mut ids = Vec::with_capacity(matcher.hooks.len());
        for callback in matcher.hooks {
            let id = format!("hook_{}", self.registrations.len());
            self.registrations.insert(
                id.clone(),
                HookRegistration {
                    id: id.clone(),
                    event,
                    matcher: tool_matcher.clone(),
                    callback,
                    timeout: matcher.timeout,
                },
            );
            ids.push(id);
        }
        if ids.is_empty() {
            return ids;
        }

        let entry = AnnouncedMatcher {
            matcher: tool_matcher,
            ids: ids.clone(),
            timeout: matcher.timeout,
        };
        match self.announced.iter_mut().find(|(known, _)| *known == event) {
            Some((_, matchers)) => matchers.push(entry),
            None => self.announced.push((event, vec![entry])),
        }
        ids
    }

    /// Whether nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Number of registered callbacks
    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Look up a registration
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&HookRegistration> {
        self.registrations.get(id)
    }

    /// `hooks` field of the initialize request, `None` without registrations
    #[must_use]
    pub fn initialize_payload(&self) -> Option<Value> {
        if self.announced.is_empty() {
            return None;
        }
        let mut events = serde_json::Map::new();
        for (event, matchers) in &self.announced {
            let entries: Vec<Value> = matchers
                .iter()
                .map(|announced| {
                    let mut entry = serde_json::json!({
                        "matcher": announced.matcher.pattern(),
                        "hookCallbackIds": announced.ids,
                    });
                    if let Some(timeout) = announced.timeout {
                        entry["timeout"] = Value::from(timeout.as_secs_f64());
                    }
                    entry
                })
                .collect();
            events.insert(event.as_str().to_string(), Value::Array(entries));
        }
        Some(Value::Object(events))
    }

    /// Run the callback registered under `callback_id`
    ///
    /// The callback only runs when its matcher accepts the tool named in
    /// `input`. Failures, panics, and overruns are logged and answered with
    /// [`HookOutput::default`].
    ///
    /// # Errors
    /// Returns `Hook` when no callback is registered under `callback_id`
    pub async fn invoke_by_id(
        &self,
        callback_id: &str,
        input: Value,
        tool_use_id: Option<String>,
        session_id: Option<SessionId>,
    ) -> Result<HookOutput> {
        let registration = self
            .registrations
            .get(callback_id)
            .ok_or_else(|| ClaudeError::hook(format!("No hook callback found for ID: {callback_id}")))?;

        // Events without a tool were already routed by the CLI
        if let Some(tool_name) = input.get("tool_name").and_then(Value::as_str)
            && !registration.matcher.matches(Some(tool_name))
        {
            log::debug!(
                "Hook {callback_id} ({}) skipped: matcher does not accept {tool_name}",
                registration.event
            );
            return Ok(HookOutput::default());
        }

        let budget = registration.timeout.unwrap_or(self.default_timeout);
        let cancellation = CancellationToken::new();
        let context = HookContext {
            session_id,
            cancellation: cancellation.clone(),
        };
        let callback = Arc::clone(&registration.callback);

        match supervise(budget, Some(&cancellation), move || {
            callback(input, tool_use_id, context)
        })
        .await
        {
            Supervised::Completed(output) => Ok(output),
            Supervised::Failed(reason) => {
                log::warn!("Hook {callback_id} ({}) failed: {reason}", registration.event);
                Ok(HookOutput::default())
            }
            Supervised::TimedOut => {
                log::warn!(
                    "Hook {callback_id} ({}) exceeded its {budget:?} budget",
                    registration.event
                );
                Ok(HookOutput::default())
            }
        }
    }

    /// Create a hook callback from a closure
    pub fn callback<F, Fut>(f: F) -> HookCallback
    where
        F: Fn(Value, Option<String>, HookContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<HookOutput>> + Send + 'static,
    {
        Arc::new(move |input, tool_use_id, context| Box::pin(f(input, tool_use_id, context)))
    }
}

impl Default for HookManager {
    fn default() -> Self {
        Self::new(crate::types::options::DEFAULT_HOOK_TIMEOUT)
    }
}

/// Builder for creating hook matchers
pub struct HookMatcherBuilder {
    matcher: Option<String>,
    hooks: Vec<HookCallback>,
    timeout: Option<Duration>,
}

impl HookMatcherBuilder {
    /// Create a new hook matcher builder
    ///
    /// # Arguments
    /// * `pattern` - Matcher pattern (None for all, `"*"` for any tool, or a tool name)
    pub fn new(pattern: Option<impl Into<String>>) -> Self {
        Self {
            matcher: pattern.map(std::convert::Into::into),
            hooks: Vec::new(),
            timeout: None,
        }
    }

    /// Add a hook callback
    #[must_use]
    pub fn add_hook(mut self, hook: HookCallback) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Time budget for each callback of this matcher
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the hook matcher
    #[must_use]
    pub fn build(self) -> HookMatcher {
        HookMatcher {
            matcher: self.matcher,
            hooks: self.hooks,
            timeout: self.timeout,
        }
    }
}
