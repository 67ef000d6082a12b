//! Command-line host for the aide code-generation core
//!
//! Loads the configuration, wires a runtime through the factory and runs a
//! single command against it.

use aide_core::config::ConfigLoader;
use aide_core::{AideFactory, FileOperation, FileSystemNode, StreamObserver, StreamProgress};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use std::io::Write;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[clap(author, version, about = "aide - stream generated code into a project")]
struct Cli {
    #[clap(subcommand)]
    command: Commands,

    #[clap(long, short, default_value = "aide.yaml", help = "Configuration file")]
    config: PathBuf,

    #[clap(long, short, help = "Log level (defaults to logging.level from the config)")]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Stream a generation and apply the files it writes
    Generate {
        /// What to build
        prompt: String,
    },
    /// Print the project tree
    Tree,
    /// Run one file tool and print its JSON result
    Tool {
        name: String,

        #[clap(long, default_value = "{}", help = "Tool arguments as a JSON object")]
        params: String,
    },
    /// List registered agents and servers
    Agents,
}

struct ConsoleObserver;

impl StreamObserver for ConsoleObserver {
    fn on_token(&self, token: &str) {
        print!("{}", token);
        flush_or_log(&mut std::io::stdout());
    }

    fn on_file_operation(&self, operation: &FileOperation) {
        eprintln!("\n[{:?}] {}", operation.kind, operation.path);
    }

    fn on_progress(&self, progress: &StreamProgress) {
        log::debug!(
            "{} tokens after {}ms ({:?})",
            progress.tokens_received,
            progress.response_time_ms,
            progress.status
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::load_or_default(Some(cli.config.as_path()))
        .await
        .context("Failed to load configuration")?;

    let level = cli.log_level.as_deref().unwrap_or(&config.logging.level);
    env_logger::Builder::new()
        .filter_level(level.parse().unwrap_or(LevelFilter::Info))
        .init();

    let aide = AideFactory::create_from_config(config)?;

    match cli.command {
        Commands::Generate { prompt } => generate(&aide, &prompt).await,
        Commands::Tree => {
            for node in aide.files.get_project_structure().await {
                print_node(&node, 0);
            }
            Ok(())
        }
        Commands::Tool { name, params } => {
            let params = serde_json::from_str(&params).context("--params must be valid JSON")?;
            let output = aide.file_server.execute_file_operation(&name, params)?.await?;
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Commands::Agents => {
            for agent in aide.registry.list_agents() {
                let capabilities: Vec<&str> = agent.capabilities.iter().map(String::as_str).collect();
                println!(
                    "{:<20} {:<14} {:<10} {}",
                    agent.id,
                    format!("{:?}", agent.agent_type).to_lowercase(),
                    format!("{:?}", agent.status).to_lowercase(),
                    capabilities.join(", ")
                );
            }
            for name in aide.registry.server_names() {
                if let Some(server) = aide.registry.server(&name) {
                    println!("server {} ({} tools)", name, server.list_tools().len());
                }
            }
            Ok(())
        }
    }
}

async fn generate(aide: &aide_core::Aide, prompt: &str) -> Result<()> {
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, cancelling generation");
            on_interrupt.cancel();
        }
    });

    let outcome = aide
        .generator
        .stream_code_generation_with_cancel(prompt, &ConsoleObserver, cancel)
        .await?;

    println!();
    eprintln!(
        "{} tokens in {}ms, {} file operations",
        outcome.tokens_received,
        outcome.response_time_ms,
        outcome.operations.len()
    );
    if !outcome.failed_writes.is_empty() {
        anyhow::bail!("Failed to save: {}", outcome.failed_writes.join(", "));
    }
    Ok(())
}

/// Flush `out`, logging a failure instead of returning it.
fn flush_or_log(out: &mut impl Write) -> bool {
    match out.flush() {
        Ok(()) => true,
        Err(e) => {
            log::debug!("Failed to flush output: {}", e);
            false
        }
    }
}

fn print_node(node: &FileSystemNode, depth: usize) {
    let suffix = if node.is_file() { "" } else { "/" };
    println!("{}{}{}", "  ".repeat(depth), node.name, suffix);
    for child in &node.children {
        print_node(child, depth + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }
    }

    #[test]
    fn test_flush_failure_is_logged_not_raised() {
        assert!(!flush_or_log(&mut BrokenPipe));
        assert!(flush_or_log(&mut Vec::<u8>::new()));
    }
}
