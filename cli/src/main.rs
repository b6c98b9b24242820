//! CLI entrypoint for toolmux
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde_json::Value;
use std::sync::Arc;
use toolmux_application::{
    ConversationLogger, OrchestrationParams, RunTurnInput, RunTurnUseCase, ToolInvoker,
};
use toolmux_infrastructure::{
    ConfigLoader, FileConfig, GeminiOracle, JsonlConversationLogger, ProcessSupervisor, Severity,
};
use toolmux_presentation::{ChatRepl, Cli, Command, ConsoleFormatter, OutputFormat};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over -v when set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_deref());
        return Ok(());
    }

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref())
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?
    };

    check_config(&config)?;

    let mut params = config.orchestration.to_params();
    if let Some(max) = cli.max_iterations {
        if max == 0 {
            bail!("--max-iterations must be at least 1");
        }
        params = params.with_max_iterations(max);
    }

    info!("Starting toolmux");

    // === Dependency Injection ===
    let supervisor = Arc::new(ProcessSupervisor::new(config.orchestration.request_timeout()));
    spawn_notification_logger(&supervisor);

    let specs = config.provider_specs();
    let requested = specs.len();
    let failures = supervisor.start_all(specs).await;
    for (name, err) in &failures {
        eprintln!("Warning: provider '{}' failed to start: {}", name, err);
    }
    info!(
        started = requested - failures.len(),
        failed = failures.len(),
        "Providers started"
    );

    let result = tokio::select! {
        result = run(&cli, &config, params, Arc::clone(&supervisor)) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
            Ok(())
        }
    };

    supervisor.stop_all().await;
    result
}

/// Print configuration issues; fail if any is an error.
fn check_config(config: &FileConfig) -> Result<()> {
    let issues = config.validate();
    let mut errors = 0;
    for issue in &issues {
        match issue.severity {
            Severity::Error => {
                errors += 1;
                eprintln!("Config error: {}", issue.message);
            }
            Severity::Warning => warn!("{}", issue.message),
        }
    }
    if errors > 0 {
        bail!("Configuration has {} error(s)", errors);
    }
    Ok(())
}

fn spawn_notification_logger(supervisor: &ProcessSupervisor) {
    let mut notifications = supervisor.subscribe();
    tokio::spawn(async move {
        loop {
            match notifications.recv().await {
                Ok(n) => info!(provider = %n.provider, method = %n.method, "Provider notification"),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Notification receiver lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

async fn run(
    cli: &Cli,
    config: &FileConfig,
    params: OrchestrationParams,
    supervisor: Arc<ProcessSupervisor>,
) -> Result<()> {
    match cli.subcommand() {
        Command::Tools => {
            let tools = supervisor.list_all();
            match cli.output {
                OutputFormat::Text => print!("{}", ConsoleFormatter::format_tools(&tools)),
                OutputFormat::Json => println!("{}", ConsoleFormatter::format_tools_json(&tools)),
            }
        }
        Command::Health => {
            let status = supervisor.status();
            let text = match cli.output {
                OutputFormat::Text => {
                    ConsoleFormatter::format_health(&status.providers, status.tool_count)
                }
                OutputFormat::Json => {
                    ConsoleFormatter::format_health_json(&status.providers, status.tool_count)
                }
            };
            println!("{}", text);
        }
        Command::Call {
            provider,
            tool,
            arguments,
        } => {
            let arguments = parse_arguments(arguments.as_deref())?;
            let result = supervisor
                .invoke_tool(&provider, &tool, arguments)
                .await
                .with_context(|| format!("{}.{} failed", provider, tool))?;
            println!("{}", ConsoleFormatter::format_call_result(&result));
        }
        Command::Ask { request } => {
            let use_case = build_use_case(cli, config, &supervisor)?;
            let input = RunTurnInput::new(request).with_params(params);
            let output = use_case.execute(input).await?;

            let text = match cli.output {
                OutputFormat::Json => ConsoleFormatter::format_json(&output),
                OutputFormat::Text if cli.quiet || !config.repl.show_thinking => {
                    ConsoleFormatter::format_answer_only(&output)
                }
                OutputFormat::Text => ConsoleFormatter::format(&output),
            };
            println!("{}", text);
        }
        Command::Chat => {
            let use_case = build_use_case(cli, config, &supervisor)?;
            let tools: Arc<dyn ToolInvoker> = supervisor;
            let mut repl = ChatRepl::new(use_case, tools)
                .with_params(params)
                .with_thinking(config.repl.show_thinking && !cli.quiet)
                .with_history_file(config.repl.history_path());
            repl.run().await?;
        }
    }
    Ok(())
}

fn build_use_case(
    cli: &Cli,
    config: &FileConfig,
    supervisor: &Arc<ProcessSupervisor>,
) -> Result<RunTurnUseCase> {
    let mut oracle = GeminiOracle::from_env(&config.oracle.model, &config.oracle.api_key_env)?;
    if let Some(base_url) = &config.oracle.base_url {
        oracle = oracle.with_base_url(base_url);
    }
    info!(model = %oracle.model(), "Using Gemini oracle");

    let tools: Arc<dyn ToolInvoker> = Arc::clone(supervisor) as Arc<dyn ToolInvoker>;
    let mut use_case = RunTurnUseCase::new(Arc::new(oracle), tools);

    let log_path = cli
        .log_conversation
        .clone()
        .or_else(|| config.logging.conversation_log_path());
    if let Some(path) = log_path {
        match JsonlConversationLogger::open(&path) {
            Some(logger) => {
                info!(path = %path.display(), session = %logger.session(), "Conversation log enabled");
                let logger: Arc<dyn ConversationLogger> = Arc::new(logger);
                use_case = use_case.with_conversation_logger(logger);
            }
            None => eprintln!("Warning: conversation log disabled ({})", path.display()),
        }
    }

    Ok(use_case)
}

/// Parse the `call` arguments; absent means an empty object.
fn parse_arguments(raw: Option<&str>) -> Result<Value> {
    let Some(raw) = raw else {
        return Ok(Value::Object(Default::default()));
    };
    let value: Value = serde_json::from_str(raw).context("Tool arguments must be valid JSON")?;
    if !value.is_object() {
        bail!("Tool arguments must be a JSON object");
    }
    Ok(value)
}
