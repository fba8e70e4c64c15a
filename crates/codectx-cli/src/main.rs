use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use codectx_core::config::Config;
use codectx_core::knowledge::{ContextService, ContextStore, Selection};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "codectx")]
#[command(about = "Code knowledge graph and context retrieval for LLM prompts", long_about = None)]
struct Cli {
    /// Workspace root
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Config file to use instead of codectx.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and persist the knowledge graph
    Graph {
        /// Only create file nodes and include/import edges
        #[arg(long)]
        only_files: bool,
        /// Extra directory searched when resolving includes (repeatable)
        #[arg(long = "include-dir")]
        include_dirs: Vec<PathBuf>,
    },
    /// Chunk and embed the workspace files
    Index,
    /// Retrieve the chunks most similar to a query
    Query {
        #[arg(required = true)]
        text: Vec<String>,
        /// Number of chunks to return
        #[arg(long)]
        top_k: Option<usize>,
        /// Restrict the search to these files (repeatable)
        #[arg(long = "file")]
        files: Vec<PathBuf>,
    },
    /// Show the lines the graph selects for a selection
    Select {
        file: String,
        start_line: u32,
        end_line: u32,
    },
    /// Retrieve chunks relevant to a selection, preferring related files
    Context {
        file: String,
        start_line: u32,
        end_line: u32,
        /// Selected text, used as the query
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Show graph and index status
    Status,
    /// Delete the vector index
    Reset,
    /// Print the default configuration
    Config,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("CODECTX_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .wrap_err_with(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load_for(&cli.root).wrap_err("Failed to load config")?,
    };
    Ok(config)
}

fn spinner() -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} [{elapsed_precise}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    bar.set_style(style);
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = Cli::parse();

    if let Commands::Config = cli.command {
        print!("{}", Config::default_config_string());
        return Ok(());
    }

    let mut config = load_config(&cli)?;
    if let Commands::Graph {
        only_files,
        include_dirs,
    } = &cli.command
    {
        config.graph.only_file_nodes |= *only_files;
        config.graph.include_dirs.extend(include_dirs.iter().cloned());
    }
    tracing::debug!(root = %cli.root.display(), embedding_url = %config.embedding.url, "configuration loaded");

    let service = ContextService::new(&cli.root, config)?;

    match cli.command {
        Commands::Graph { .. } => {
            let bar = spinner();
            let progress = {
                let bar = bar.clone();
                move |message: &str| bar.set_message(message.to_string())
            };
            let graph = service.build_workspace_graph(Some(&progress)).await?;
            bar.finish_and_clear();

            println!(
                "Knowledge graph complete. {} entities and {} relationships.",
                graph.node_count(),
                graph.edge_count()
            );
            println!(
                "  Saved to: {}",
                service.config().graph.graph_path(service.root()).display()
            );
        }
        Commands::Index => {
            let bar = spinner();
            let progress = {
                let bar = bar.clone();
                move |message: &str| bar.set_message(message.to_string())
            };
            let stats = service.index_workspace(Some(&progress)).await?;
            bar.finish_and_clear();

            println!(
                "Indexed {}/{} files ({} new chunks)",
                stats.files_indexed, stats.files_found, stats.chunks_embedded
            );
            if stats.files_failed > 0 {
                println!("  {} files failed; run with CODECTX_LOG=warn for details", stats.files_failed);
            }
        }
        Commands::Query { text, top_k, files } => {
            let filter = (!files.is_empty()).then_some(files.as_slice());
            let context = service
                .query_relevant_content(&text.join(" "), filter, top_k)
                .await?;
            print!("{}", context);
        }
        Commands::Select {
            file,
            start_line,
            end_line,
        } => {
            let snippets = service
                .get_selected_lines(&Selection::new(file, start_line, end_line))
                .await?;
            if snippets.is_empty() {
                println!("No graph context for this selection. Run 'codectx graph' first.");
            }
            for snippet in snippets {
                println!(
                    "--- {} lines {}-{} ---",
                    snippet.file_path, snippet.start_line, snippet.end_line
                );
                println!("{}", snippet.text);
            }
        }
        Commands::Context {
            file,
            start_line,
            end_line,
            text,
        } => {
            let context = service
                .get_context_for_selection(&text.join(" "), &Selection::new(file, start_line, end_line))
                .await?;
            print!("{}", context);
        }
        Commands::Status => {
            let status = service.status().await?;
            println!("Workspace: {}", service.root().display());
            match (status.graph_nodes, status.graph_edges) {
                (Some(nodes), Some(edges)) => {
                    println!("  Graph: {} entities, {} relationships", nodes, edges)
                }
                _ => println!("  Graph: not built"),
            }
            if status.indexed {
                println!("  Index: {} chunks", status.vectors);
            } else {
                println!("  Index: not indexed");
            }
        }
        Commands::Reset => {
            service.reset_index().await?;
            println!("Vector index cleared.");
        }
        Commands::Config => {}
    }

    Ok(())
}
