//! Name → tool lookup shared read-only across turns

use super::{Builtin, Tool};
use crate::llm::ToolDefinition;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolLookupError {
    #[error("tool '{0}' not found")]
    NotFound(String),
    #[error("tool '{0}' is already registered")]
    Duplicate(String),
}

/// Collection of tools available to turns
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in capability
    pub fn standard() -> Self {
        Self {
            tools: Builtin::ALL.into_iter().map(Builtin::tool).collect(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), ToolLookupError> {
        if self.tools.iter().any(|t| t.name() == tool.name()) {
            return Err(ToolLookupError::Duplicate(tool.name().to_string()));
        }
        self.tools.push(tool);
        Ok(())
    }

    /// Builder-style [`register`](Self::register)
    pub fn with(mut self, tool: Arc<dyn Tool>) -> Result<Self, ToolLookupError> {
        self.register(tool)?;
        Ok(self)
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<dyn Tool>, ToolLookupError> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .cloned()
            .ok_or_else(|| ToolLookupError::NotFound(name.to_string()))
    }

    /// Get all tool definitions for LLM
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description(),
                input_schema: t.input_schema(),
            })
            .collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
