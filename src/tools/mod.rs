//! Tool handlers, keyed by the closed `Tool` vocabulary.

pub mod builtin;

use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::error::HandlerError;
use crate::planner::types::Tool;

/// Performs one tool action and returns the reply to speak.
pub trait ToolHandler: Send + Sync {
    fn invoke(&self, arg: &str) -> Result<String, HandlerError>;
}

impl<F> ToolHandler for F
where
    F: Fn(&str) -> Result<String, HandlerError> + Send + Sync,
{
    fn invoke(&self, arg: &str) -> Result<String, HandlerError> {
        self(arg)
    }
}

#[derive(Default, Clone)]
pub struct ToolRegistry {
    handlers: HashMap<Tool, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Tool, handler: impl ToolHandler + 'static) -> Result<(), HandlerError> {
        if tool == Tool::None {
            return Err(HandlerError::Reserved);
        }
        self.handlers.insert(tool, Arc::new(handler));
        Ok(())
    }

    pub fn contains(&self, tool: Tool) -> bool {
        self.handlers.contains_key(&tool)
    }

    /// Maps an external label onto a registered tool, ignoring case and
    /// surrounding whitespace.
    pub fn resolve(&self, label: &str) -> Result<Tool, HandlerError> {
        let tool: Tool = label
            .trim()
            .to_ascii_lowercase()
            .parse()
            .map_err(|_| HandlerError::UnknownTool(label.to_string()))?;
        if self.contains(tool) {
            Ok(tool)
        } else {
            Err(HandlerError::Unregistered(tool))
        }
    }

    /// Runs the handler on the blocking pool; a panic is reported as an error.
    pub async fn invoke(&self, tool: Tool, arg: String) -> Result<String, HandlerError> {
        let handler = self
            .handlers
            .get(&tool)
            .cloned()
            .ok_or(HandlerError::Unregistered(tool))?;

        match tokio::task::spawn_blocking(move || handler.invoke(&arg)).await {
            Ok(result) => result,
            Err(join) => {
                warn!("Handler for {} did not complete: {}", tool, join);
                Err(HandlerError::Panicked(tool))
            }
        }
    }
}
