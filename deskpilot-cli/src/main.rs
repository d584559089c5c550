mod cli;
mod interrupt;

use clap::Parser;
use cli::Cli;
use deskpilot_core::agent::{Agent, AgentOptions, AgentOutcome, CancelFlag};
use deskpilot_core::config::AppConfig;
use deskpilot_core::constants::DEFAULT_HANDSHAKE_TIMEOUT_SECS;
use deskpilot_core::model::ProviderFactory;
use deskpilot_core::recovery::{ErrorSummary, RecoveringDispatcher, RecoveryPolicy};
use deskpilot_core::tooling::{ProviderManager, ToolDispatch, ToolDispatcher};
use serde_json::json;
use std::error::Error;
use std::fs;
use std::io::{self, IsTerminal, Read};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(cli).await {
        Ok(outcome) if outcome.error => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("deskpilot: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<AgentOutcome, Box<dyn Error>> {
    debug!(config = ?cli.config, "CLI arguments parsed");
    let task = load_task(&cli)?;
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(model) = &cli.model {
        config.model.model = model.clone();
    }
    if let Some(limit) = cli.max_iterations {
        config.agent.max_iterations = limit.max(1);
    }
    if let Some(system) = &cli.system {
        config.agent.system_prompt = Some(system.clone());
    }

    let model = ProviderFactory::create(&config.model).map_err(|err| err.user_message())?;

    let mut providers = ProviderManager::connect_all(
        &config.servers,
        Duration::from_secs(DEFAULT_HANDSHAKE_TIMEOUT_SECS),
    )
    .await;
    let registry = Arc::new(providers.build_registry().await);
    for failure in providers.failures() {
        warn!(server = %failure.server, error = %failure.error, "Server left out of this session");
    }
    info!(tools = registry.len(), "Tool registry ready");

    let base: Arc<dyn ToolDispatch> =
        Arc::new(ToolDispatcher::new(Arc::clone(&registry), config.tools.timeout));
    let recovering = Arc::new(RecoveringDispatcher::new(
        base,
        RecoveryPolicy::new(&config.recovery),
    ));
    let dispatcher: Arc<dyn ToolDispatch> = Arc::clone(&recovering) as Arc<dyn ToolDispatch>;

    let agent = Agent::new(
        Arc::from(model),
        dispatcher,
        registry.catalog_for_model(),
        AgentOptions::from_config(&config),
    )
    .with_tool_settings(config.tools.clone())
    .with_guidance(providers.instructions().await);

    let cancel = CancelFlag::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        let watch = interrupt::watch_interrupts(tokio::signal::ctrl_c, on_interrupt).await;
        if watch == interrupt::InterruptWatch::Forced {
            std::process::exit(interrupt::FORCED_EXIT_CODE);
        }
    });

    let outcome = agent.run_with_cancel(task, cancel).await;
    let errors = recovering.error_summary().await;
    providers.shutdown().await;

    print_outcome(&outcome, &errors, cli.json)?;
    Ok(outcome)
}

fn print_outcome(
    outcome: &AgentOutcome,
    errors: &ErrorSummary,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    if as_json {
        let output = json!({
            "outcome": outcome,
            "tool_errors": errors,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", outcome.response);
    eprintln!(
        "\n[{:?}] {} iteration(s), {} tool call(s), {} tool error(s)",
        outcome.status,
        outcome.iterations,
        outcome.tools_used.len(),
        errors.total
    );
    Ok(())
}

fn init_tracing(verbose: bool) {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let fallback = if verbose { "debug" } else { "info" };
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
        fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .with_target(false)
            .with_level(true)
            .init();
    });
}

fn load_task(cli: &Cli) -> Result<String, Box<dyn Error>> {
    if let Some(path) = &cli.prompt_file {
        info!(path = %path.display(), "Loading task from file");
        return Ok(fs::read_to_string(path)?.trim().to_string());
    }

    if !cli.task.is_empty() {
        return Ok(cli.task.join(" ").trim().to_string());
    }

    if !io::stdin().is_terminal() {
        info!("Reading task from standard input");
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        return Ok(buffer.trim().to_string());
    }

    Err("task required via arguments, --prompt-file, or stdin".into())
}
