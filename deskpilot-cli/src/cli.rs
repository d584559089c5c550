use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "deskpilot",
    version,
    about = "Desktop automation agent driven by a language model and MCP tool servers"
)]
pub struct Cli {
    /// Path to deskpilot.toml
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Replace the built-in system prompt
    #[arg(long)]
    pub system: Option<String>,
    /// Override [agent].max_iterations
    #[arg(long)]
    pub max_iterations: Option<usize>,
    /// Override [model].model
    #[arg(long)]
    pub model: Option<String>,
    /// Read the task from a file
    #[arg(long)]
    pub prompt_file: Option<PathBuf>,
    /// Print the full outcome as JSON
    #[arg(long)]
    pub json: bool,
    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long)]
    pub verbose: bool,
    /// Task description
    #[arg()]
    pub task: Vec<String>,
}
