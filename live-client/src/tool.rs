//! Tool call dispatch.
//!
//! The model issues batches of function calls; each call is matched against
//! the registered tools and executed off the receive path. Responses for a
//! batch are aggregated into a single `toolResponse` envelope.

use crate::error::Result;
use crate::wire::{FunctionCall, FunctionResponse, ToolResponsePayload};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// A locally registered tool implementation.
#[async_trait]
pub trait LiveTool: Send + Sync {
    /// Whether this tool can handle the given function name.
    fn handles(&self, name: &str) -> bool;

    /// Execute the call. Returning `Ok(None)` omits the call from the
    /// aggregate response without treating it as a failure.
    async fn call(
        &self,
        call: &FunctionCall,
        cancel: CancellationToken,
    ) -> Result<Option<FunctionResponse>>;
}

/// A closure-backed tool for a single function name.
pub struct FnTool<F>
where
    F: Fn(&FunctionCall) -> Result<serde_json::Value> + Send + Sync,
{
    name: String,
    handler: F,
}

impl<F> FnTool<F>
where
    F: Fn(&FunctionCall) -> Result<serde_json::Value> + Send + Sync,
{
    /// Create a tool handling `name` with a sync closure.
    pub fn new(name: impl Into<String>, handler: F) -> Self {
        Self { name: name.into(), handler }
    }
}

#[async_trait]
impl<F> LiveTool for FnTool<F>
where
    F: Fn(&FunctionCall) -> Result<serde_json::Value> + Send + Sync,
{
    fn handles(&self, name: &str) -> bool {
        self.name == name
    }

    async fn call(
        &self,
        call: &FunctionCall,
        _cancel: CancellationToken,
    ) -> Result<Option<FunctionResponse>> {
        let value = (self.handler)(call)?;
        Ok(Some(FunctionResponse {
            id: call.id.clone(),
            name: Some(call.name.clone()),
            response: value,
        }))
    }
}

/// What to do with calls that match no tool or whose execution fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnmatchedCallPolicy {
    /// Log and omit the call from the aggregate response (source behavior).
    #[default]
    Omit,
    /// Send a stub `{ "error": ... }` response so the server learns the
    /// call failed.
    ErrorResponse,
}

/// Matches server-issued function calls to registered tools and aggregates
/// their responses.
pub struct ToolDispatcher {
    tools: Vec<Arc<dyn LiveTool>>,
    policy: UnmatchedCallPolicy,
}

impl Default for ToolDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolDispatcher {
    /// Create an empty dispatcher.
    pub fn new() -> Self {
        Self { tools: Vec::new(), policy: UnmatchedCallPolicy::default() }
    }

    /// Register a tool. Registration order is the match order.
    pub fn register(&mut self, tool: Arc<dyn LiveTool>) {
        self.tools.push(tool);
    }

    /// Set the unmatched/failed call policy.
    pub fn with_policy(mut self, policy: UnmatchedCallPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Whether any tools are registered.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Process a batch of calls. The first registered tool reporting it
    /// handles a function name wins. Returns `None` when no responses were
    /// produced, in which case nothing is sent.
    pub async fn dispatch(
        &self,
        calls: &[FunctionCall],
        cancel: &CancellationToken,
    ) -> Option<ToolResponsePayload> {
        let mut responses = Vec::new();

        for call in calls {
            let Some(tool) = self.tools.iter().find(|t| t.handles(&call.name)) else {
                warn!(function = %call.name, "no tool registered for function call");
                if let Some(stub) = self.stub_response(call, "no matching tool registered") {
                    responses.push(stub);
                }
                continue;
            };

            match tool.call(call, cancel.child_token()).await {
                Ok(Some(response)) => responses.push(response),
                Ok(None) => {
                    warn!(function = %call.name, "tool produced no response, omitting call");
                }
                Err(e) => {
                    warn!(function = %call.name, error = %e, "tool execution failed");
                    if let Some(stub) = self.stub_response(call, &e.to_string()) {
                        responses.push(stub);
                    }
                }
            }
        }

        if responses.is_empty() {
            None
        } else {
            Some(ToolResponsePayload { function_responses: responses })
        }
    }

    fn stub_response(&self, call: &FunctionCall, error: &str) -> Option<FunctionResponse> {
        match self.policy {
            UnmatchedCallPolicy::Omit => None,
            UnmatchedCallPolicy::ErrorResponse => Some(FunctionResponse {
                id: call.id.clone(),
                name: Some(call.name.clone()),
                response: json!({ "error": error }),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LiveError;
    use serde_json::Value;

    fn call(id: &str, name: &str) -> FunctionCall {
        FunctionCall { id: Some(id.to_string()), name: name.to_string(), args: Value::Null }
    }

    fn dispatcher_with(names: &[&str]) -> ToolDispatcher {
        let mut dispatcher = ToolDispatcher::new();
        for name in names {
            dispatcher
                .register(Arc::new(FnTool::new(*name, |_| Ok(serde_json::json!({ "ok": true })))));
        }
        dispatcher
    }

    #[tokio::test]
    async fn test_matching_subset_yields_one_aggregate() {
        let dispatcher = dispatcher_with(&["a", "b"]);
        let calls = vec![call("1", "a"), call("2", "missing"), call("3", "b")];

        let payload = dispatcher.dispatch(&calls, &CancellationToken::new()).await.unwrap();
        assert_eq!(payload.function_responses.len(), 2);
        assert_eq!(payload.function_responses[0].id.as_deref(), Some("1"));
        assert_eq!(payload.function_responses[1].id.as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn test_no_matches_sends_nothing() {
        let dispatcher = dispatcher_with(&["a"]);
        let calls = vec![call("1", "x"), call("2", "y")];
        assert!(dispatcher.dispatch(&calls, &CancellationToken::new()).await.is_none());
    }

    #[tokio::test]
    async fn test_failed_call_omitted() {
        let mut dispatcher = ToolDispatcher::new();
        dispatcher.register(Arc::new(FnTool::new("boom", |_| Err(LiveError::tool("exploded")))));
        dispatcher.register(Arc::new(FnTool::new("fine", |_| Ok(serde_json::json!(1)))));

        let calls = vec![call("1", "boom"), call("2", "fine")];
        let payload = dispatcher.dispatch(&calls, &CancellationToken::new()).await.unwrap();
        assert_eq!(payload.function_responses.len(), 1);
        assert_eq!(payload.function_responses[0].id.as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_error_response_policy_reports_failures() {
        let mut dispatcher =
            ToolDispatcher::new().with_policy(UnmatchedCallPolicy::ErrorResponse);
        dispatcher.register(Arc::new(FnTool::new("boom", |_| Err(LiveError::tool("exploded")))));

        let calls = vec![call("1", "boom"), call("2", "missing")];
        let payload = dispatcher.dispatch(&calls, &CancellationToken::new()).await.unwrap();
        assert_eq!(payload.function_responses.len(), 2);
        for response in &payload.function_responses {
            assert!(response.response.get("error").is_some());
        }
    }

    #[tokio::test]
    async fn test_first_matching_tool_wins() {
        let mut dispatcher = ToolDispatcher::new();
        dispatcher.register(Arc::new(FnTool::new("f", |_| Ok(serde_json::json!("first")))));
        dispatcher.register(Arc::new(FnTool::new("f", |_| Ok(serde_json::json!("second")))));

        let payload =
            dispatcher.dispatch(&[call("1", "f")], &CancellationToken::new()).await.unwrap();
        assert_eq!(payload.function_responses[0].response, serde_json::json!("first"));
    }
}
