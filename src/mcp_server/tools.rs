/// <module>
///   <name>tools</name>
///   <purpose>Per-exchange MCP tools over the adapter registry</purpose>
///   <description>
///     Every adapter contributes `<prefix>_methods` and
///     `<prefix>_method_detail`.
///   </description>
/// </module>
use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::types::{ToolDefinition, ToolResult};
use crate::adapter::{AdapterRegistry, ExchangeAdapter, MethodSummary};
use crate::core::{DocsError, Result};
use crate::exchange::ExchangeId;

/// Arguments of `<prefix>_methods`
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct MethodsArgs {}

/// Arguments of `<prefix>_method_detail`
#[derive(Debug, Deserialize, JsonSchema)]
pub struct MethodDetailArgs {
    /// The specific method name to query
    pub method: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    Methods,
    MethodDetail,
}

/// A registered tool bound to its exchange
#[derive(Debug, Clone)]
pub struct ExchangeTool {
    pub exchange: ExchangeId,
    pub kind: ToolKind,
    pub definition: ToolDefinition,
}

/// Text of the `<prefix>_methods` tool
#[derive(Debug, Serialize)]
struct MethodsPayload {
    available_methods: Vec<MethodSummary>,
    #[serde(rename = "SDK_documentation")]
    sdk_documentation: String,
}

/// `{"type": "object", ...}` schema of a tool argument struct
pub fn input_schema<T: JsonSchema>() -> Value {
    let settings = SchemaSettings::draft07().with(|s| {
        s.inline_subschemas = true;
        s.meta_schema = None;
    });
    let schema = settings.into_generator().into_root_schema_for::<T>();
    let mut value = serde_json::to_value(schema).unwrap_or_default();
    if let Some(object) = value.as_object_mut() {
        object.remove("title");
        object.remove("description");
        object
            .entry("properties")
            .or_insert_with(|| Value::Object(Default::default()));
    }
    value
}

pub fn methods_tool_name(id: ExchangeId) -> String {
    format!("{}_methods", id.tool_prefix())
}

pub fn method_detail_tool_name(id: ExchangeId) -> String {
    format!("{}_method_detail", id.tool_prefix())
}

fn methods_description(display_name: &str) -> String {
    format!(
        "Get all API method lists and related documentation supported by {}. This tool returns a complete method inventory, including basic descriptions and usage instructions for each method, helping developers understand available functional interfaces.",
        display_name
    )
}

fn method_detail_description(display_name: &str) -> String {
    format!(
        "Query detailed usage information for specific API methods in {}. Provides complete technical documentation including request parameters, response formats, usage examples, error handling, etc., helping developers correctly integrate and use corresponding API interfaces.",
        display_name
    )
}

/// Tool table in registration order
#[derive(Debug, Clone, Default)]
pub struct ToolTable {
    tools: Vec<ExchangeTool>,
}

impl ToolTable {
    pub fn from_registry(registry: &AdapterRegistry) -> Self {
        let mut tools = Vec::with_capacity(registry.len() * 2);

        for adapter in registry.iter() {
            let id = adapter.id();
            let display_name = adapter.display_name();
            info!("Registering {} tools...", display_name);

            tools.push(ExchangeTool {
                exchange: id,
                kind: ToolKind::Methods,
                definition: ToolDefinition {
                    name: methods_tool_name(id),
                    description: methods_description(&display_name),
                    input_schema: input_schema::<MethodsArgs>(),
                },
            });
            tools.push(ExchangeTool {
                exchange: id,
                kind: ToolKind::MethodDetail,
                definition: ToolDefinition {
                    name: method_detail_tool_name(id),
                    description: method_detail_description(&display_name),
                    input_schema: input_schema::<MethodDetailArgs>(),
                },
            });
        }

        Self { tools }
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition.clone()).collect()
    }

    pub fn find(&self, name: &str) -> Option<&ExchangeTool> {
        self.tools.iter().find(|t| t.definition.name == name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Runs one tool. Malformed arguments are `DocsError::InvalidParams`;
/// an unknown method is reported inside the tool result.
pub fn call_tool(adapter: &dyn ExchangeAdapter, kind: ToolKind, arguments: Option<Value>) -> Result<ToolResult> {
    let arguments = arguments.unwrap_or_else(|| Value::Object(Default::default()));

    match kind {
        ToolKind::Methods => {
            let payload = MethodsPayload {
                available_methods: adapter.list_methods(),
                sdk_documentation: adapter.get_readme(),
            };
            Ok(ToolResult::text(serde_json::to_string(&payload)?))
        }
        ToolKind::MethodDetail => {
            let args: MethodDetailArgs = serde_json::from_value(arguments)
                .map_err(|e| DocsError::InvalidParams(format!("method_detail arguments: {}", e)))?;

            match adapter.get_doc(&args.method) {
                Ok(entry) => Ok(ToolResult::text(serde_json::to_string(entry)?)),
                Err(error @ DocsError::MethodNotFound { .. }) => Ok(ToolResult::error(not_found_message(&error))),
                Err(e) => Err(e),
            }
        }
    }
}

fn not_found_message(error: &DocsError) -> String {
    match error {
        DocsError::MethodNotFound { suggestions, .. } if !suggestions.is_empty() => {
            format!("{}. Did you mean: {}?", error, suggestions.join(", "))
        }
        _ => format!("{}. Use the methods tool to list available methods.", error),
    }
}
