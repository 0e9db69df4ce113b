use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use project_assistant::config::{AppConfig, EmbeddingProvider, DEFAULT_STORE_DIR};
use project_assistant::error_helper::{print_error_with_help, ErrorType};
use project_assistant::llm::{
    parse_proposals, ChatModel, ContextCollector, Embedder, FirstLineSummarizer, GeminiClient,
    HashEmbedder, LlmSummarizer, OllamaEmbedder, Summarizer, SYSTEM_PROMPT,
};
use project_assistant::reporter::{
    generate_json_report, print_proposals, print_scan_report, print_search_report, print_status,
    StoreStatus,
};
use project_assistant::{DescriptionCache, HybridSearcher, ProjectScanner, VectorStore};

#[derive(Parser)]
#[command(name = "project-assistant")]
#[command(about = "Index a code project and find the files relevant to a request", long_about = None)]
struct Cli {
    /// Store directory (default: <DIRECTORY>/.project-assistant)
    #[arg(long, global = true, value_name = "DIR")]
    store_dir: Option<PathBuf>,

    /// Use hash embeddings and first-line summaries (no servers needed)
    #[arg(long, global = true)]
    offline: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index the project: summaries, symbols, embeddings, structure overview
    Scan {
        /// Project root
        #[arg(value_name = "DIRECTORY")]
        directory: PathBuf,
    },

    /// List the files relevant to a query
    Search {
        /// Project root
        #[arg(value_name = "DIRECTORY")]
        directory: PathBuf,

        /// Search query
        #[arg(value_name = "QUERY")]
        query: String,

        /// Number of vector hits to consider
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Write the result as JSON to this file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Ask the model for code changes, using the relevant files as context
    Ask {
        /// Project root
        #[arg(value_name = "DIRECTORY")]
        directory: PathBuf,

        /// What should be changed
        #[arg(value_name = "REQUEST")]
        request: String,

        /// Number of vector hits to consider
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Only build and save the prompt, don't call the model
        #[arg(long)]
        dry_run: bool,
    },

    /// Show what is indexed
    Status {
        /// Project root
        #[arg(value_name = "DIRECTORY")]
        directory: PathBuf,
    },

    /// Delete the vector index and description cache
    Clear {
        /// Project root
        #[arg(value_name = "DIRECTORY")]
        directory: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("project_assistant=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("project_assistant=info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli_store_dir: Option<&Path>, directory: &Path) -> Result<AppConfig> {
    let store_dir = cli_store_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| directory.join(DEFAULT_STORE_DIR));
    AppConfig::load(&store_dir)
}

fn build_embedder(config: &AppConfig, offline: bool) -> Result<Box<dyn Embedder>> {
    if offline || config.embedding.provider == EmbeddingProvider::Hash {
        return Ok(Box::new(HashEmbedder::new(config.embedding.hash_dimension)));
    }
    Ok(Box::new(OllamaEmbedder::new(&config.embedding)?))
}

fn build_chat_model(config: &AppConfig) -> Result<Option<GeminiClient>> {
    match config.llm.api_key() {
        Some(api_key) => Ok(Some(GeminiClient::from_config(api_key, &config.llm)?)),
        None => Ok(None),
    }
}

fn check_directory(directory: &Path) -> bool {
    if directory.is_dir() {
        return true;
    }
    print_error_with_help(ErrorType::InvalidDirectory(directory.to_path_buf()), "");
    false
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Scan { directory } => {
            if !check_directory(&directory) {
                std::process::exit(1);
            }
            let config = load_config(cli.store_dir.as_deref(), &directory)?;
            println!("🔍 Scanning directory: {}", directory.display());

            let summarizer: Box<dyn Summarizer> = match build_chat_model(&config)? {
                Some(model) if !cli.offline => Box::new(LlmSummarizer::new(model)),
                _ => {
                    if !cli.offline {
                        warn!(
                            "{} is not set, describing files by their first line",
                            config.llm.api_key_env
                        );
                    }
                    Box::new(FirstLineSummarizer)
                }
            };
            let embedder = build_embedder(&config, cli.offline)?;

            let mut scanner = ProjectScanner::new(&directory, &config, summarizer, embedder);
            let stats = scanner.scan()?;

            // Every embedding failing almost always means the server is down
            if stats.files > 0 && stats.embedded == 0 && !cli.offline {
                print_error_with_help(
                    ErrorType::EmbeddingUnavailable(config.embedding.url.clone()),
                    &directory.display().to_string(),
                );
            }
            print_scan_report(&stats, &config.store.structure_path());
        }

        Commands::Search {
            directory,
            query,
            top_k,
            output,
        } => {
            let config = load_config(cli.store_dir.as_deref(), &directory)?;
            let embedder = build_embedder(&config, cli.offline)?;
            let searcher = HybridSearcher::open(&config.store, embedder);
            if searcher.store().is_empty() && searcher.metadata().is_empty() {
                print_error_with_help(
                    ErrorType::StoreNotInitialized(config.store.dir.clone()),
                    &directory.display().to_string(),
                );
                std::process::exit(1);
            }

            let report = searcher.search_report(&query, top_k.unwrap_or(config.search.top_k))?;
            print_search_report(&query, &report);

            if let Some(output_path) = output {
                let json = serde_json::to_string_pretty(&generate_json_report(&query, &report))?;
                std::fs::write(&output_path, json).with_context(|| {
                    format!("Failed to write report: {}", output_path.display())
                })?;
                println!("\n📄 Report saved to: {}", output_path.display());
            }
        }

        Commands::Ask {
            directory,
            request,
            top_k,
            dry_run,
        } => {
            let config = load_config(cli.store_dir.as_deref(), &directory)?;
            let embedder = build_embedder(&config, cli.offline)?;
            let searcher = HybridSearcher::open(&config.store, embedder);
            if searcher.store().is_empty() && searcher.metadata().is_empty() {
                print_error_with_help(
                    ErrorType::StoreNotInitialized(config.store.dir.clone()),
                    &directory.display().to_string(),
                );
                std::process::exit(1);
            }

            let files = searcher.find_relevant(&request, top_k.unwrap_or(config.search.top_k))?;
            info!("Using {} files as context", files.len());

            let collector = ContextCollector::new(&directory, &config.store);
            let prompt = collector.build_prompt(&request, &files);
            let prompt_path = collector.archive_prompt(&prompt)?;
            println!("📝 Prompt saved to: {}", prompt_path.display());

            if dry_run {
                return Ok(());
            }

            let Some(model) = build_chat_model(&config)? else {
                print_error_with_help(
                    ErrorType::MissingApiKey(config.llm.api_key_env.clone()),
                    &prompt_path.display().to_string(),
                );
                std::process::exit(1);
            };

            println!("🤖 Asking {}...", model.model());
            let answer = match model.generate(SYSTEM_PROMPT, &prompt) {
                Ok(answer) => answer,
                Err(e) => {
                    print_error_with_help(
                        ErrorType::LLMApiError(format!("{:#}", e)),
                        &prompt_path.display().to_string(),
                    );
                    std::process::exit(1);
                }
            };

            let proposals = parse_proposals(&answer)?;
            print_proposals(&proposals);
        }

        Commands::Status { directory } => {
            let config = load_config(cli.store_dir.as_deref(), &directory)?;
            print_status(&StoreStatus::collect(&config.store));
        }

        Commands::Clear { directory } => {
            let config = load_config(cli.store_dir.as_deref(), &directory)?;

            VectorStore::load(&config.store).clear()?;
            DescriptionCache::load(&config.store).clear()?;
            println!("🧹 Cleared index and description cache in {}", config.store.dir.display());
        }
    }

    Ok(())
}
