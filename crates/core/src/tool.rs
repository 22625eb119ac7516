//! ToolProvider trait — the abstraction over external capabilities.
//!
//! Providers are discovered and registered outside the core (subprocess
//! servers, network services, in-process functions) and presented to the
//! executor as a uniform capability map from tool name to callable. The
//! core never inspects how a provider is implemented.

use crate::error::ToolError;
use crate::value::ArgMap;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// The result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the tool executed successfully
    pub success: bool,

    /// The output content
    pub output: String,

    /// Optional structured data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    /// Error text, when the tool reported a failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Execution duration in milliseconds
    #[serde(default)]
    pub duration_ms: u64,
}

impl ToolResult {
    /// A successful result with the given output.
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            data: None,
            error: None,
            duration_ms: 0,
        }
    }

    /// A failed result with the given error text.
    pub fn failure(error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            success: false,
            output: format!("Error: {error}"),
            data: None,
            error: Some(error),
            duration_ms: 0,
        }
    }

    /// Attach structured data.
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// The core capability trait.
///
/// Each capability (shell, file_read, run_tests, ...) implements this
/// trait. Providers are registered in the [`CapabilityMap`] and invoked by
/// the tool executor without knowledge of their implementation.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// The unique name of this tool (e.g., "file_read").
    fn name(&self) -> &str;

    /// A description of what this tool does (surfaced to the reasoning model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments.
    async fn execute(&self, arguments: ArgMap) -> Result<ToolResult, ToolError>;
}

/// A uniform map from tool name to callable provider.
///
/// Shared across turns and sessions; it holds no per-session state.
#[derive(Default)]
pub struct CapabilityMap {
    providers: HashMap<String, Arc<dyn ToolProvider>>,
}

impl CapabilityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider. Replaces any existing provider with the same name.
    pub fn register(&mut self, provider: Arc<dyn ToolProvider>) {
        let name = provider.name().to_string();
        self.providers.insert(name, provider);
    }

    /// Get a provider by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ToolProvider>> {
        self.providers.get(name)
    }

    /// Whether a provider with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.providers.keys().map(|s| s.as_str()).collect()
    }

    /// Execute a named capability with a per-call timeout.
    ///
    /// A call exceeding its timeout is reported as [`ToolError::Timeout`];
    /// the in-flight future is dropped, which cancels in-process work.
    pub async fn execute(
        &self,
        name: &str,
        arguments: ArgMap,
        timeout: Duration,
    ) -> Result<ToolResult, ToolError> {
        let provider = self
            .providers
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        let start = std::time::Instant::now();
        match tokio::time::timeout(timeout, provider.execute(arguments)).await {
            Ok(result) => result.map(|mut r| {
                r.duration_ms = start.elapsed().as_millis() as u64;
                r
            }),
            Err(_) => Err(ToolError::Timeout {
                tool_name: name.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ArgValue;

    /// A simple test tool for unit tests.
    struct EchoTool;

    #[async_trait]
    impl ToolProvider for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes back the input"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" }
                },
                "required": ["text"]
            })
        }
        async fn execute(&self, arguments: ArgMap) -> Result<ToolResult, ToolError> {
            let text = arguments
                .get("text")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            Ok(ToolResult::ok(text))
        }
    }

    struct SlowTool;

    #[async_trait]
    impl ToolProvider for SlowTool {
        fn name(&self) -> &str {
            "slow"
        }
        fn description(&self) -> &str {
            "Sleeps for a long time"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object", "properties": {}})
        }
        async fn execute(&self, _arguments: ArgMap) -> Result<ToolResult, ToolError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            unreachable!()
        }
    }

    fn args(text: &str) -> ArgMap {
        [("text".to_string(), ArgValue::String(text.to_string()))]
            .into_iter()
            .collect()
    }

    #[test]
    fn register_and_lookup() {
        let mut map = CapabilityMap::new();
        map.register(Arc::new(EchoTool));
        assert!(map.contains("echo"));
        assert!(!map.contains("nonexistent"));
        assert_eq!(map.names(), vec!["echo"]);
    }

    #[tokio::test]
    async fn execute_tool() {
        let mut map = CapabilityMap::new();
        map.register(Arc::new(EchoTool));

        let result = map
            .execute("echo", args("hello world"), Duration::from_secs(5))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.output, "hello world");
    }

    #[tokio::test]
    async fn execute_missing_tool() {
        let map = CapabilityMap::new();
        let err = map
            .execute("nonexistent", ArgMap::new(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[tokio::test]
    async fn execute_times_out() {
        let mut map = CapabilityMap::new();
        map.register(Arc::new(SlowTool));

        let err = map
            .execute("slow", ArgMap::new(), Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Timeout { .. }));
        assert!(err.is_transient());
    }
}
