use super::error::ToolInvokeError;
use super::interface::ProviderConnection;
use super::process::McpProcess;
use super::registry::ToolRegistry;
use crate::config::ServerConfig;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Provider that could not be brought up. Not fatal to the session.
#[derive(Debug)]
pub struct DiscoveryFailure {
    pub server: String,
    pub error: ToolInvokeError,
}

/// Owns the live provider connections of one process.
#[derive(Default)]
pub struct ProviderManager {
    providers: Vec<Arc<dyn ProviderConnection>>,
    failures: Vec<DiscoveryFailure>,
}

impl ProviderManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns every configured server concurrently. Servers that fail to
    /// start or handshake are recorded and left out.
    pub async fn connect_all(configs: &[ServerConfig], handshake_timeout: Duration) -> Self {
        let attempts = configs.iter().cloned().map(|config| async move {
            let name = config.name.clone();
            (
                name,
                McpProcess::connect_with_timeout(config, handshake_timeout).await,
            )
        });

        let mut manager = Self::new();
        for (server, outcome) in join_all(attempts).await {
            match outcome {
                Ok(process) => manager.add(Arc::new(process)),
                Err(error) => {
                    warn!(server = %server, %error, "MCP server unavailable, continuing without it");
                    manager.failures.push(DiscoveryFailure { server, error });
                }
            }
        }
        manager
    }

    pub fn add(&mut self, provider: Arc<dyn ProviderConnection>) {
        self.providers.push(provider);
    }

    pub fn providers(&self) -> &[Arc<dyn ProviderConnection>] {
        &self.providers
    }

    pub fn failures(&self) -> &[DiscoveryFailure] {
        &self.failures
    }

    /// Runs discovery on every provider, in connection order, and merges the
    /// results. A provider whose discovery fails is absent from the registry.
    pub async fn build_registry(&mut self) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        for provider in &self.providers {
            let id = provider.id().to_string();
            match provider.discover().await {
                Ok(tools) => {
                    let assigned = registry.register(&id, tools);
                    registry.attach_provider(Arc::clone(provider));
                    info!(server = %id, tools = assigned.len(), "Registered provider tools");
                }
                Err(error) => {
                    warn!(server = %id, %error, "Tool discovery failed");
                    self.failures.push(DiscoveryFailure { server: id, error });
                }
            }
        }
        registry
    }

    /// Provider guidance captured during the handshake, as (server, text).
    pub async fn instructions(&self) -> Vec<(String, String)> {
        let mut collected = Vec::new();
        for provider in &self.providers {
            if let Some(text) = provider.instructions().await {
                collected.push((provider.id().to_string(), text));
            }
        }
        collected
    }

    pub async fn shutdown(&self) {
        join_all(self.providers.iter().map(|provider| provider.shutdown())).await;
    }
}

#[cfg(test)]
mod tests {
    use super::super::interface::DiscoveredTool;
    use super::super::stub::StubProvider;
    use super::*;

    #[tokio::test]
    async fn failed_discovery_leaves_provider_out_of_registry() {
        let mut manager = ProviderManager::new();
        manager.add(Arc::new(
            StubProvider::new("windows")
                .with_tool(DiscoveredTool::new("Click-Tool"))
                .with_instructions("Prefer keyboard shortcuts."),
        ));
        manager.add(Arc::new(
            StubProvider::new("broken")
                .with_tool(DiscoveredTool::new("Shell-Tool"))
                .terminated(),
        ));

        let registry = manager.build_registry().await;

        assert!(registry.resolve("Click-Tool").is_ok());
        assert!(registry.resolve("Shell-Tool").is_err());
        assert!(registry.provider("broken").is_none());
        assert_eq!(manager.failures().len(), 1);
        assert_eq!(manager.failures()[0].server, "broken");

        let guidance = manager.instructions().await;
        assert_eq!(
            guidance,
            vec![("windows".to_string(), "Prefer keyboard shortcuts.".to_string())]
        );
    }

    #[tokio::test]
    async fn unreachable_servers_are_recorded_not_fatal() {
        let configs = vec![ServerConfig::new("missing", "/nonexistent/deskpilot-mcp")];
        let manager = ProviderManager::connect_all(&configs, Duration::from_secs(1)).await;
        assert!(manager.providers().is_empty());
        assert_eq!(manager.failures()[0].server, "missing");
    }
}
