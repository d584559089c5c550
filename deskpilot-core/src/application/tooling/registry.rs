//! Session-wide tool catalog.
//!
//! Provider tool names may contain characters the model endpoint rejects
//! (`Windows-MCP:Click`, `open file`). Each name is sanitized to
//! `[A-Za-z0-9_-]{1,128}` and the registry keeps the reverse mapping, so a
//! model-facing identifier always routes back to its provider and original
//! name. Collisions get `_2`, `_3`, ... in registration order.

use super::error::RegistryError;
use super::interface::{DiscoveredTool, ProviderConnection};
use crate::constants::MAX_TOOL_IDENTIFIER_LEN;
use crate::domain::types::ToolSchema;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    pub identifier: String,
    pub original_name: String,
    pub description: String,
    pub input_schema: Value,
    pub provider_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTool {
    pub provider_id: String,
    pub original_name: String,
}

#[derive(Default)]
pub struct ToolRegistry {
    descriptors: Vec<ToolDescriptor>,
    by_identifier: HashMap<String, usize>,
    providers: HashMap<String, Arc<dyn ProviderConnection>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches the connection used to reach tools registered under its id.
    pub fn attach_provider(&mut self, provider: Arc<dyn ProviderConnection>) {
        self.providers.insert(provider.id().to_string(), provider);
    }

    /// Merges a provider's tools and returns the identifiers assigned to them.
    pub fn register(&mut self, provider_id: &str, tools: Vec<DiscoveredTool>) -> Vec<String> {
        let mut assigned = Vec::with_capacity(tools.len());
        for tool in tools {
            if let Some(existing) = self.descriptors.iter().find(|d| {
                d.provider_id == provider_id && d.original_name == tool.name
            }) {
                assigned.push(existing.identifier.clone());
                continue;
            }

            let identifier = self.unique_identifier(&sanitize_identifier(&tool.name));
            let description = tool
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| format!("Tool: {}", tool.name));
            let input_schema = tool
                .input_schema
                .unwrap_or_else(|| json!({ "type": "object", "properties": {} }));

            debug!(
                provider = provider_id,
                original = %tool.name,
                identifier = %identifier,
                "Registered tool"
            );
            self.by_identifier
                .insert(identifier.clone(), self.descriptors.len());
            self.descriptors.push(ToolDescriptor {
                identifier: identifier.clone(),
                original_name: tool.name,
                description,
                input_schema,
                provider_id: provider_id.to_string(),
            });
            assigned.push(identifier);
        }
        assigned
    }

    pub fn resolve(&self, identifier: &str) -> Result<ResolvedTool, RegistryError> {
        let descriptor = self.descriptor(identifier).ok_or_else(|| RegistryError::NotFound {
            identifier: identifier.to_string(),
        })?;
        Ok(ResolvedTool {
            provider_id: descriptor.provider_id.clone(),
            original_name: descriptor.original_name.clone(),
        })
    }

    fn descriptor(&self, identifier: &str) -> Option<&ToolDescriptor> {
        self.by_identifier
            .get(identifier)
            .and_then(|index| self.descriptors.get(*index))
    }

    pub fn provider(&self, provider_id: &str) -> Option<Arc<dyn ProviderConnection>> {
        self.providers.get(provider_id).cloned()
    }

    /// Connection owning a resolved tool.
    pub fn provider_for(
        &self,
        identifier: &str,
        resolved: &ResolvedTool,
    ) -> Result<Arc<dyn ProviderConnection>, RegistryError> {
        self.provider(&resolved.provider_id)
            .ok_or_else(|| RegistryError::ProviderMissing {
                provider: resolved.provider_id.clone(),
                identifier: identifier.to_string(),
            })
    }

    pub fn catalog_for_model(&self) -> Vec<ToolSchema> {
        self.descriptors
            .iter()
            .map(|d| ToolSchema {
                name: d.identifier.clone(),
                description: d.description.clone(),
                input_schema: d.input_schema.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    fn unique_identifier(&self, base: &str) -> String {
        if !self.by_identifier.contains_key(base) {
            return base.to_string();
        }
        let mut counter = 2usize;
        loop {
            let suffix = format!("_{counter}");
            let keep = MAX_TOOL_IDENTIFIER_LEN.saturating_sub(suffix.len());
            let candidate = format!("{}{suffix}", truncate_chars(base, keep));
            if !self.by_identifier.contains_key(&candidate) {
                return candidate;
            }
            counter += 1;
        }
    }
}

/// Maps every character outside `[A-Za-z0-9_-]` to `_` and truncates to the
/// identifier limit.
pub fn sanitize_identifier(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_TOOL_IDENTIFIER_LEN)
        .collect();
    if sanitized.is_empty() {
        "tool".to_string()
    } else {
        sanitized
    }
}

fn truncate_chars(value: &str, limit: usize) -> &str {
    match value.char_indices().nth(limit) {
        Some((index, _)) => &value[..index],
        None => value,
    }
}
