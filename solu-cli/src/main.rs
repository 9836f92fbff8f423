mod cli;
mod commands;
mod config;
mod error;
mod output;

use crate::{
    cli::{Args, CacheAction, Commands},
    commands::CommandExecutor,
    config::AppConfig,
    error::Result,
    output::OutputManager,
};
use clap::Parser;
#[cfg(feature = "colored-output")]
use colored::*;
use solu_engine::{CancellationToken, Engine};
use std::io::IsTerminal;
use std::process;
use tracing::{Level, debug, error, warn};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        error!("Application error: {}", e);
        #[cfg(feature = "colored-output")]
        {
            eprintln!("{} {}", "Error:".red().bold(), e);
        }
        #[cfg(not(feature = "colored-output"))]
        {
            eprintln!("Error: {}", e);
        }
        process::exit(e.exit_code());
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    // Commands that never touch the network
    match &args.command {
        Commands::Completions { shell } => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Args::command();
            let bin_name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, bin_name, &mut std::io::stdout());
            return Ok(());
        }
        Commands::Config { show, reset } => {
            if *reset {
                AppConfig::reset(args.config.as_deref())?;
                println!("✓ Configuration reset to defaults");
            } else if *show {
                let config = AppConfig::load(args.config.as_deref())?;
                println!("{}", config.show()?);
            } else {
                println!(
                    "Use --show to display current configuration or --reset to reset to defaults"
                );
            }
            return Ok(());
        }
        _ => {}
    }

    // Load configuration
    let config = AppConfig::load(args.config.as_deref())?;
    debug!("Loaded configuration: {:?}", config);

    let engine = Engine::new(config.engine_config(&args)?)?;
    let output = OutputManager::new(
        config.colored_output && std::io::stdout().is_terminal(),
        config.output_format(&args),
    );
    let show_progress = !args.quiet && std::io::stderr().is_terminal();

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let executor = CommandExecutor::new(engine, output, cancel, show_progress);

    // Execute command
    match args.command {
        Commands::Subjects => executor.subjects().await?,
        Commands::Years { subject } => executor.years(&subject).await?,
        Commands::Catalog => executor.catalog().await?,
        Commands::Audit {
            subject,
            year,
            fresh,
            test,
        } => executor.audit(&subject, &year, fresh, test).await?,
        Commands::Query { query } => executor.query(&query).await?,
        Commands::Probe { url, strict } => executor.probe(&url, strict).await?,
        Commands::Cache {
            action: CacheAction::Clear,
        } => executor.clear_cache().await?,
        Commands::Completions { .. } | Commands::Config { .. } => {}
    }

    Ok(())
}

/// Cancel `token` on the first Ctrl-C
fn spawn_interrupt_handler(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling");
            token.cancel();
        }
    });
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(verbose)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}
