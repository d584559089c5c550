//! Agent loop.
//!
//! Key types:
//! - [`Agent`]: drives model turns and tool dispatch for one task
//! - [`AgentSession`]: per-task conversation and bookkeeping
//! - [`Conversation`]: history with pruning and pairing repair
//! - [`AgentOutcome`]: final response, tools used, and how the run ended

mod conversation;
mod errors;
mod instructions;
mod models;
mod runner;
mod session;


pub use conversation::Conversation;
pub use errors::AgentError;
pub use instructions::compose_system_prompt;
pub use models::{AgentOptions, AgentOutcome, AgentStatus, AgentStep};
pub use runner::{Agent, MAX_ITERATIONS_MESSAGE, TRUNCATION_MARKER};
pub use session::{AgentSession, CancelFlag};
