//! Control features detected from configuration
//!
//! Each flag names a configured feature that needs the control channel. The
//! set drives mode selection and is logged when a session starts.

use bitflags::bitflags;

use crate::types::options::ClaudeAgentOptions;
use crate::types::permissions::PermissionMode;

bitflags! {
    /// Configured features that require the control protocol
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ControlFeatures: u8 {
        /// At least one hook registration
        const HOOKS = 0b0_0001;
        /// At least one in-process tool server
        const SDK_MCP = 0b0_0010;
        /// A permission callback
        const PERMISSION_CALLBACK = 0b0_0100;
        /// One or more named agents
        const AGENTS = 0b0_1000;
        /// A permission mode other than the default
        const PERMISSION_MODE = 0b1_0000;
    }
}

impl ControlFeatures {
    /// Detect the features configured in `options`
    #[must_use]
    pub fn detect(options: &ClaudeAgentOptions) -> Self {
        let mut features = Self::empty();
        if options
            .hooks
            .as_ref()
            .is_some_and(|hooks| hooks.values().any(|matchers| !matchers.is_empty()))
        {
            features |= Self::HOOKS;
        }
        if options.mcp_servers.sdk_servers().next().is_some() {
            features |= Self::SDK_MCP;
        }
        if options.can_use_tool.is_some() {
            features |= Self::PERMISSION_CALLBACK;
        }
        if options.agents.as_ref().is_some_and(|agents| !agents.is_empty()) {
            features |= Self::AGENTS;
        }
        if options
            .permission_mode
            .is_some_and(|mode| mode != PermissionMode::Default)
        {
            features |= Self::PERMISSION_MODE;
        }
        features
    }
}
