//! CLI entry point for courier

mod demo;

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use courier_core::config::ConfigLoader;
use courier_core::logging::init_logging;
use courier_core::{Dispatcher, InboundMessage, OutboundMessage};

use crate::demo::{DemoStats, LogExecutor, LogSender};

#[derive(Parser)]
#[command(name = "courier")]
#[command(about = "Dual-pipeline message dispatcher")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config.json
    Init {
        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration
    Config,
    /// Push synthetic messages through both pipelines and shut down
    Run {
        /// Outbound messages to enqueue
        #[arg(long, default_value_t = 10)]
        outbound: usize,
        /// Inbound messages to enqueue
        #[arg(long, default_value_t = 10)]
        inbound: usize,
        /// Fail every K-th attempt per pipeline (0 = never)
        #[arg(long, default_value_t = 0)]
        fail_every: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let loader = match &cli.config_dir {
        Some(dir) => ConfigLoader::with_dir(dir),
        None => ConfigLoader::new(),
    };

    match cli.command {
        Commands::Init { force } => run_init(&loader, force),
        Commands::Config => run_config(&loader),
        Commands::Run {
            outbound,
            inbound,
            fail_every,
        } => run_dispatch(&loader, outbound, inbound, fail_every).await,
    }
}

fn run_init(loader: &ConfigLoader, force: bool) -> Result<()> {
    let config_path = loader.config_dir().join("config.json");
    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }

    loader.save(&courier_core::config::Config::default())?;
    println!(
        "{} {}",
        style("Wrote").green(),
        config_path.display()
    );
    Ok(())
}

fn run_config(loader: &ConfigLoader) -> Result<()> {
    let config = loader.load()?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

async fn run_dispatch(
    loader: &ConfigLoader,
    outbound: usize,
    inbound: usize,
    fail_every: usize,
) -> Result<()> {
    let config = loader.load()?;
    let _guard = init_logging(&config.logging)?;

    let stats = Arc::new(DemoStats::default());
    let dispatcher = Dispatcher::start(
        &config.dispatcher,
        Arc::new(LogSender::new(fail_every, Arc::clone(&stats))),
        Arc::new(LogExecutor::new(fail_every, Arc::clone(&stats))),
    )?;

    for seq in 0..outbound {
        dispatcher.enqueue_to_publish(OutboundMessage::new(
            format!("demo.outbound.{}", seq),
            serde_json::json!({ "seq": seq }),
        ))?;
    }
    for seq in 0..inbound {
        dispatcher.enqueue_to_execute(InboundMessage::new(
            format!("demo.inbound.{}", seq),
            serde_json::json!({ "seq": seq }),
        ))?;
    }

    tokio::select! {
        _ = stats.wait_for(outbound + inbound) => {}
        _ = tokio::signal::ctrl_c() => {
            println!("\n{}", style("Interrupted, shutting down...").yellow());
        }
    }

    let result = dispatcher.shutdown_and_wait().await;

    println!("{}", style("Summary").bold().cyan());
    println!("  Sent attempts:     {}", stats.sent.load(Ordering::SeqCst));
    println!("  Executed attempts: {}", stats.executed.load(Ordering::SeqCst));
    println!("  Failures:          {}", stats.failed.load(Ordering::SeqCst));

    result?;
    println!("{}", style("Dispatcher stopped.").green());
    Ok(())
}
