//! In-process tool servers and their tool descriptors

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// One block of tool output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolContent {
    /// Text output
    Text {
        /// The text
        text: String,
    },
    /// Base64 image output
    Image {
        /// Base64 data
        data: String,
        /// MIME type, e.g. `image/png`
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
}

/// Result of one tool call, in MCP `tools/call` shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    /// Output blocks
    pub content: Vec<ToolContent>,
    /// Whether the tool reports a failure
    #[serde(default)]
    pub is_error: bool,
}

impl ToolResult {
    /// Successful result with one text block
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Error result with one text block
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: message.into(),
            }],
            is_error: true,
        }
    }

    /// Concatenated text of all text blocks
    #[must_use]
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ToolContent::Text { text } => Some(text.as_str()),
                ToolContent::Image { .. } => None,
            })
            .collect()
    }
}

/// Async tool handler taking the call arguments
pub type ToolHandler =
    Arc<dyn Fn(Value) -> Pin<Box<dyn Future<Output = Result<ToolResult>> + Send>> + Send + Sync>;

/// Tool descriptor: name, description, input schema, and handler
#[derive(Clone)]
pub struct SdkMcpTool {
    /// Tool name, unique within its server
    pub name: String,
    /// Description shown to the model
    pub description: String,
    /// JSON Schema of the arguments
    pub input_schema: Value,
    /// The handler
    pub handler: ToolHandler,
}

impl SdkMcpTool {
    /// Create a tool from a closure
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        handler: F,
    ) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolResult>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            handler: Arc::new(move |args| Box::pin(handler(args))),
        }
    }

    /// Create a tool whose schema is derived from `T`
    pub fn with_schema<T, F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        handler: F,
    ) -> Self
    where
        T: JsonSchema,
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolResult>> + Send + 'static,
    {
        Self::new(name, description, schema_of::<T>(), handler)
    }

    /// Entry for a `tools/list` result
    #[must_use]
    pub fn descriptor(&self) -> Value {
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema,
        })
    }
}

impl std::fmt::Debug for SdkMcpTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SdkMcpTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .finish_non_exhaustive()
    }
}

/// JSON Schema of `T` without the `$schema` marker
#[must_use]
pub fn schema_of<T: JsonSchema>() -> Value {
    let mut schema = serde_json::to_value(schemars::schema_for!(T))
        .unwrap_or_else(|_| serde_json::json!({ "type": "object", "properties": {} }));
    if let Some(obj) = schema.as_object_mut() {
        obj.remove("$schema");
    }
    schema
}

/// Named registry of in-process tools
///
/// Cloning is cheap; clones share the same tools.
#[derive(Clone)]
pub struct SdkMcpServer {
    name: String,
    version: String,
    tools: Arc<Vec<SdkMcpTool>>,
    index: Arc<HashMap<String, usize>>,
}

impl SdkMcpServer {
    /// Create an empty server
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: "1.0.0".to_string(),
            tools: Arc::new(Vec::new()),
            index: Arc::new(HashMap::new()),
        }
    }

    /// Set the version reported by `initialize`
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Add a tool; a tool with the same name is replaced
    #[must_use]
    pub fn tool(mut self, tool: SdkMcpTool) -> Self {
        let tools = Arc::make_mut(&mut self.tools);
        let index = Arc::make_mut(&mut self.index);
        match index.get(&tool.name) {
            Some(&position) => tools[position] = tool,
            None => {
                index.insert(tool.name.clone(), tools.len());
                tools.push(tool);
            }
        }
        self
    }

    /// Server name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Server version
    #[must_use]
    pub fn server_version(&self) -> &str {
        &self.version
    }

    /// Tools in registration order
    #[must_use]
    pub fn tools(&self) -> &[SdkMcpTool] {
        &self.tools
    }

    /// Look up a tool
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SdkMcpTool> {
        self.index.get(name).and_then(|&position| self.tools.get(position))
    }
}

impl std::fmt::Debug for SdkMcpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SdkMcpServer")
            .field("name", &self.name)
            .field("version", &self.version)
            .field(
                "tools",
                &self.tools.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
