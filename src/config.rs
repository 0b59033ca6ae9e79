//! Environment-driven configuration

use crate::llm::AnthropicModel;
use crate::runtime::RuntimeConfig;
use crate::state_machine::{DEFAULT_EVENT_BUFFER, DEFAULT_SYSTEM_PROMPT};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got '{value}'")]
    Invalid {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("unknown model '{0}'")]
    UnknownModel(String),
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub anthropic_api_key: Option<String>,
    /// Gateway base URL, used instead of the public API when set
    pub gateway: Option<String>,
    pub model: AnthropicModel,
    pub max_tokens: Option<u32>,
    pub event_buffer: usize,
    pub system_prompt: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source; empty values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let model = match get("TURNSTREAM_MODEL") {
            Some(id) => AnthropicModel::from_id(&id).ok_or(ConfigError::UnknownModel(id))?,
            None => AnthropicModel::Claude4Sonnet,
        };

        Ok(Self {
            port: parse(&get, "TURNSTREAM_PORT", "a port number")?.unwrap_or(8000),
            anthropic_api_key: get("ANTHROPIC_API_KEY"),
            gateway: get("LLM_GATEWAY"),
            model,
            max_tokens: parse(&get, "TURNSTREAM_MAX_TOKENS", "a positive integer")?,
            event_buffer: parse::<usize>(&get, "TURNSTREAM_EVENT_BUFFER", "a positive integer")?
                .unwrap_or(DEFAULT_EVENT_BUFFER)
                .max(1),
            system_prompt: get("TURNSTREAM_SYSTEM_PROMPT")
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
        })
    }

    /// Whether a reasoning backend can be reached
    pub fn has_backend(&self) -> bool {
        self.anthropic_api_key.is_some() || self.gateway.is_some()
    }

    pub fn runtime(&self) -> RuntimeConfig {
        RuntimeConfig {
            system_prompt: self.system_prompt.clone(),
            max_tokens: self.max_tokens,
            event_buffer: self.event_buffer,
        }
    }
}

fn parse<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    expected: &'static str,
) -> Result<Option<T>, ConfigError> {
    get(var)
        .map(|value| {
            value.trim().parse().map_err(|_| ConfigError::Invalid {
                var,
                value,
                expected,
            })
        })
        .transpose()
}
