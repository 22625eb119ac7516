//! Scripted reasoning clients and tools shared across engine tests.

use async_trait::async_trait;
use reactor_core::error::{ReasoningError, ToolError};
use reactor_core::reasoning::{ChatChoice, ChatRequest, ChatResponse, ReasoningClient, Usage};
use reactor_core::message::Message;
use reactor_core::tool::{CapabilityMap, ToolProvider, ToolResult};
use reactor_core::value::ArgMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub(crate) type CallLog = Arc<Mutex<Vec<String>>>;

pub(crate) fn new_call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// A reasoning client that replays a script of responses.
///
/// Once the script is exhausted, the last entry repeats, so loop tests can
/// run as many turns as they need off a short script.
pub(crate) struct ScriptedClient {
    script: Vec<Result<ChatResponse, ReasoningError>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl ScriptedClient {
    pub(crate) fn new(script: Vec<Result<ChatResponse, ReasoningError>>) -> Self {
        assert!(!script.is_empty(), "script must have at least one entry");
        Self {
            script,
            calls: AtomicUsize::new(0),
            delay: None,
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn single_text(content: &str) -> Self {
        Self::new(vec![Ok(text_response(content))])
    }

    pub(crate) fn failing(error: ReasoningError) -> Self {
        Self::new(vec![Err(error)])
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReasoningClient for ScriptedClient {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse, ReasoningError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        let index = index.min(self.script.len() - 1);
        self.script[index].clone()
    }
}

pub(crate) fn text_response(content: &str) -> ChatResponse {
    ChatResponse {
        choices: vec![ChatChoice {
            message: Message::assistant(content),
            finish_reason: Some("stop".into()),
        }],
        usage: Some(Usage {
            prompt_tokens: 40,
            completion_tokens: 20,
            total_tokens: 60,
        }),
        model: "mock-model".into(),
    }
}

/// Build the structured thought contract as the model would emit it.
pub(crate) fn thought_text(analysis: &str, steps: &[&str], confidence: f32) -> String {
    serde_json::json!({
        "analysis": analysis,
        "strategy": "scripted",
        "reasoning_steps": steps,
        "confidence": confidence,
        "alternatives": []
    })
    .to_string()
}

/// A configurable scripted tool: can succeed, fail a set number of times,
/// and sleep before answering. Records its invocations in an optional log.
pub(crate) struct ScriptedTool {
    name: String,
    delay: Option<Duration>,
    fails_remaining: AtomicUsize,
    log: Option<CallLog>,
}

impl ScriptedTool {
    pub(crate) fn ok(name: &str) -> Self {
        Self {
            name: name.to_string(),
            delay: None,
            fails_remaining: AtomicUsize::new(0),
            log: None,
        }
    }

    /// Fails every invocation.
    pub(crate) fn failing(name: &str) -> Self {
        Self {
            fails_remaining: AtomicUsize::new(usize::MAX),
            ..Self::ok(name)
        }
    }

    /// Fails the first `times` invocations, then succeeds.
    pub(crate) fn flaky(name: &str, times: usize) -> Self {
        Self {
            fails_remaining: AtomicUsize::new(times),
            ..Self::ok(name)
        }
    }

    pub(crate) fn sleeping(name: &str, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::ok(name)
        }
    }

    pub(crate) fn with_log(mut self, log: CallLog) -> Self {
        self.log = Some(log);
        self
    }
}

#[async_trait]
impl ToolProvider for ScriptedTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "scripted test tool"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, arguments: ArgMap) -> Result<ToolResult, ToolError> {
        if let Some(log) = &self.log {
            log.lock().unwrap().push(self.name.clone());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let remaining = self.fails_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            if remaining != usize::MAX {
                self.fails_remaining.fetch_sub(1, Ordering::SeqCst);
            }
            return Err(ToolError::ExecutionFailed {
                tool_name: self.name.clone(),
                reason: "scripted failure".into(),
            });
        }

        let echo = arguments
            .get("text")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} done", self.name));
        Ok(ToolResult::ok(echo))
    }
}

pub(crate) fn capabilities(tools: Vec<ScriptedTool>) -> Arc<CapabilityMap> {
    let mut map = CapabilityMap::new();
    for tool in tools {
        map.register(Arc::new(tool));
    }
    Arc::new(map)
}
