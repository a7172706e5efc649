//! Codii CLI — local code-search indexing and retrieval engine.

mod cli;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use codii::connector::api::{Container, ContainerConfig};
use codii::domain::{DomainError, SearchQuery};

use cli::Commands;

/// Codii — index and search a codebase by natural-language or keyword query.
#[derive(Parser)]
#[command(name = "codii")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose (debug) logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable the reranking pass server-wide (overridden per-call by `--no-rerank`).
    #[arg(long, global = true)]
    no_rerank: bool,

    #[command(subcommand)]
    command: Commands,
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let container = Arc::new(Container::new(ContainerConfig {
        no_rerank: cli.no_rerank,
        ..ContainerConfig::default()
    }));

    match run(&container, cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

async fn run(container: &Arc<Container>, command: Commands) -> Result<(), DomainError> {
    match command {
        Commands::IndexCodebase {
            path,
            force,
            custom_extensions,
            ignore_patterns,
            wait,
        } => {
            let use_case = container.index_use_case();
            let run = use_case.execute(&path, force, custom_extensions, ignore_patterns)?;
            match run.outcome {
                codii::application::IndexOutcome::NoChanges => {
                    println!("no_changes");
                }
                codii::application::IndexOutcome::Accepted => {
                    println!("accepted");
                    if wait {
                        run.join();
                    }
                }
            }
            Ok(())
        }

        Commands::SearchCode {
            path,
            query,
            limit,
            extension_filter,
            no_rerank,
        } => {
            let use_case = container.search_use_case();

            let mut search_query = SearchQuery::new(&query).with_limit(limit);
            if let Some(extensions) = extension_filter {
                search_query = search_query.with_extension_filter(extensions);
            }
            if no_rerank {
                search_query = search_query.with_rerank(false);
            }

            let results = use_case.execute(&path, search_query)?;

            if results.is_empty() {
                println!("No results found.");
            } else {
                println!("Found {} results:\n", results.len());
                for result in &results {
                    let chunk = result.chunk();
                    println!(
                        "{}. {}:{}-{} (score: {:.4}, {})",
                        result.rank(),
                        chunk.path(),
                        chunk.start_line(),
                        chunk.end_line(),
                        result.combined_score(),
                        chunk.chunk_type(),
                    );
                    let preview: String = chunk
                        .content()
                        .lines()
                        .take(3)
                        .map(|l| format!("   | {l}"))
                        .collect::<Vec<_>>()
                        .join("\n");
                    println!("{preview}\n");
                }
            }
            Ok(())
        }

        Commands::GetIndexingStatus { path } => {
            let use_case = container.status_use_case();
            let status = use_case.execute(&path)?;
            let json = serde_json::to_string_pretty(&status)
                .map_err(|e| DomainError::internal(format!("failed to serialize status: {e}")))?;
            println!("{json}");
            Ok(())
        }

        Commands::ClearIndex { path } => {
            let use_case = container.clear_use_case();
            use_case.execute(&path)?;
            println!("ok");
            Ok(())
        }

        Commands::Mcp => codii::connector::adapter::mcp::run_stdio_server(container)
            .await
            .map_err(|e| DomainError::internal(format!("mcp server failed: {e}"))),
    }
}
