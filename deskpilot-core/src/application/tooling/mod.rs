mod dispatcher;
mod error;
mod interface;
mod manager;
mod process;
mod registry;
#[cfg(test)]
pub(crate) mod stub;

pub use dispatcher::{ConcurrencyGate, ToolDispatch, ToolDispatcher, normalize_tool_result};
pub use error::{RegistryError, ToolInvokeError};
pub use interface::{DiscoveredTool, ProviderConnection, ProviderState};
pub use manager::{DiscoveryFailure, ProviderManager};
pub use process::McpProcess;
pub use registry::{ResolvedTool, ToolDescriptor, ToolRegistry, sanitize_identifier};
