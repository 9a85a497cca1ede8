//! Launch spec building for the CLI subprocess

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::Map;
use tokio::process::Command;

use crate::VERSION;
use crate::error::{ClaudeError, Result};
use crate::types::agent::SystemPrompt;
use crate::types::mcp::McpServers;
use crate::types::options::ClaudeAgentOptions;

use super::config::{ALLOWED_EXTRA_FLAGS, DANGEROUS_ENV_VARS, PromptInput};

/// Everything needed to spawn the CLI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    /// Executable path
    pub program: PathBuf,
    /// Arguments, in order
    pub args: Vec<String>,
    /// Variables set on top of the inherited environment
    pub env: HashMap<String, String>,
    /// Working directory
    pub cwd: Option<PathBuf>,
}

impl LaunchSpec {
    /// Spec running `program` with no arguments
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: HashMap::new(),
            cwd: None,
        }
    }

    /// Append an argument
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Whether `flag` is present
    #[must_use]
    pub fn has_flag(&self, flag: &str) -> bool {
        self.args.iter().any(|arg| arg == flag)
    }

    /// Value following `flag`, if present
    #[must_use]
    pub fn flag_value(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|arg| arg == flag)
            .and_then(|index| self.args.get(index + 1))
            .map(String::as_str)
    }

    pub(super) fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).envs(&self.env);
        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }
        cmd
    }
}

/// Command builder for Claude CLI
pub struct CommandBuilder<'a> {
    cli_path: &'a Path,
    prompt: &'a PromptInput,
    options: &'a ClaudeAgentOptions,
}

impl<'a> CommandBuilder<'a> {
    /// Create a new command builder
    #[must_use]
    pub const fn new(
        cli_path: &'a Path,
        prompt: &'a PromptInput,
        options: &'a ClaudeAgentOptions,
    ) -> Self {
        Self {
            cli_path,
            prompt,
            options,
        }
    }

    /// Build the launch spec with all arguments and environment
    ///
    /// # Errors
    /// Returns `InvalidConfig` when a permission callback and a permission
    /// prompt tool are both set, or when a config value cannot be serialized
    pub fn build(&self) -> Result<LaunchSpec> {
        let mut args: Vec<String> = vec![
            "--output-format".into(),
            "stream-json".into(),
            "--verbose".into(),
        ];

        if let Some(ref system_prompt) = self.options.system_prompt {
            match system_prompt {
                SystemPrompt::String(s) => {
                    args.push("--system-prompt".into());
                    args.push(s.clone());
                }
                SystemPrompt::Preset(preset) => {
                    if let Some(ref append) = preset.append {
                        args.push("--append-system-prompt".into());
                        args.push(append.clone());
                    }
                }
            }
        }

        self.add_tool_args(&mut args);
        self.add_configuration_args(&mut args)?;
        self.add_session_args(&mut args)?;
        self.add_mcp_args(&mut args)?;
        self.add_extra_args(&mut args);

        match self.prompt {
            PromptInput::Stream => {
                args.push("--input-format".into());
                args.push("stream-json".into());
            }
            PromptInput::String(s) => {
                args.push("--print".into());
                args.push("--".into());
                args.push(s.clone());
            }
        }

        Ok(LaunchSpec {
            program: self.cli_path.to_path_buf(),
            args,
            env: self.build_env(),
            cwd: self.options.cwd.clone(),
        })
    }

    fn build_env(&self) -> HashMap<String, String> {
        let mut env: HashMap<String, String> = self
            .options
            .env
            .iter()
            .filter(|(key, _)| {
                let dangerous = DANGEROUS_ENV_VARS.contains(&key.as_str());
                if dangerous {
                    log::warn!("Dropping environment variable {key} for the CLI process");
                }
                !dangerous
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        env.insert("CLAUDE_CODE_ENTRYPOINT".to_string(), "sdk-rust".to_string());
        env.insert("CLAUDE_AGENT_SDK_VERSION".to_string(), VERSION.to_string());
        if let Some(ref cwd) = self.options.cwd {
            env.insert("PWD".to_string(), cwd.to_string_lossy().to_string());
        }
        env
    }

    /// Add tool-related arguments
    fn add_tool_args(&self, args: &mut Vec<String>) {
        if !self.options.allowed_tools.is_empty() {
            let tools: Vec<&str> = self
                .options
                .allowed_tools
                .iter()
                .map(crate::types::ToolName::as_str)
                .collect();
            args.push("--allowedTools".into());
            args.push(tools.join(","));
        }

        if !self.options.disallowed_tools.is_empty() {
            let tools: Vec<&str> = self
                .options
                .disallowed_tools
                .iter()
                .map(crate::types::ToolName::as_str)
                .collect();
            args.push("--disallowedTools".into());
            args.push(tools.join(","));
        }
    }

    /// Add configuration arguments (model, max turns, permissions)
    fn add_configuration_args(&self, args: &mut Vec<String>) -> Result<()> {
        if let Some(max_turns) = self.options.max_turns {
            args.push("--max-turns".into());
            args.push(max_turns.to_string());
        }

        if let Some(ref model) = self.options.model {
            args.push("--model".into());
            args.push(model.clone());
        }

        // The permission callback is reached through control requests on stdio
        match (
            self.options.can_use_tool.is_some(),
            &self.options.permission_prompt_tool_name,
        ) {
            (true, Some(_)) => {
                return Err(ClaudeError::invalid_config(
                    "can_use_tool and permission_prompt_tool_name are mutually exclusive",
                ));
            }
            (true, None) => {
                args.push("--permission-prompt-tool".into());
                args.push("stdio".into());
            }
            (false, Some(tool)) => {
                args.push("--permission-prompt-tool".into());
                args.push(tool.clone());
            }
            (false, None) => {}
        }

        if let Some(mode) = self.options.permission_mode {
            args.push("--permission-mode".into());
            args.push(mode.as_str().to_string());
        }
        Ok(())
    }

    /// Add session-related arguments
    fn add_session_args(&self, args: &mut Vec<String>) -> Result<()> {
        if self.options.continue_conversation {
            args.push("--continue".into());
        }

        if let Some(ref session_id) = self.options.resume {
            args.push("--resume".into());
            args.push(session_id.as_str().to_string());
        }

        if let Some(ref settings) = self.options.settings {
            args.push("--settings".into());
            args.push(settings.to_string_lossy().to_string());
        }

        for dir in &self.options.add_dirs {
            args.push("--add-dir".into());
            args.push(dir.to_string_lossy().to_string());
        }

        if self.options.include_partial_messages {
            args.push("--include-partial-messages".into());
        }

        if self.options.fork_session {
            args.push("--fork-session".into());
        }

        if let Some(ref agents) = self.options.agents {
            let agents_json = serde_json::to_string(agents)
                .map_err(|e| ClaudeError::invalid_config(format!("agents: {e}")))?;
            args.push("--agents".into());
            args.push(agents_json);
        }
        Ok(())
    }

    /// Add MCP server configuration, announcing in-process servers as `sdk`
    fn add_mcp_args(&self, args: &mut Vec<String>) -> Result<()> {
        match &self.options.mcp_servers {
            McpServers::Dict(servers) => {
                if !servers.is_empty() {
                    let mut config_map = Map::new();
                    for (name, config) in servers {
                        let value = config.to_launch_value(name).map_err(|e| {
                            ClaudeError::invalid_config(format!("mcp server {name}: {e}"))
                        })?;
                        config_map.insert(name.clone(), value);
                    }
                    let config_json = serde_json::json!({ "mcpServers": config_map });
                    args.push("--mcp-config".into());
                    args.push(config_json.to_string());
                }
            }
            McpServers::Path(path) => {
                args.push("--mcp-config".into());
                args.push(path.to_string_lossy().to_string());
            }
            McpServers::None => {}
        }
        Ok(())
    }

    /// Add setting sources and extra arguments
    fn add_extra_args(&self, args: &mut Vec<String>) {
        args.push("--setting-sources".into());
        args.push(
            self.options
                .setting_sources
                .as_ref()
                .map(|sources| {
                    sources
                        .iter()
                        .map(|s| match s {
                            crate::types::SettingSource::User => "user",
                            crate::types::SettingSource::Project => "project",
                            crate::types::SettingSource::Local => "local",
                        })
                        .collect::<Vec<_>>()
                        .join(",")
                })
                .unwrap_or_default(),
        );

        for (flag, value) in &self.options.extra_args {
            if !ALLOWED_EXTRA_FLAGS.contains(&flag.as_str()) {
                log::warn!("Ignoring extra CLI flag --{flag}: not in the allow-list");
                continue;
            }
            args.push(format!("--{flag}"));
            if let Some(v) = value {
                args.push(v.clone());
            }
        }
    }
}
