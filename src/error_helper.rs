use colored::*;
use std::path::PathBuf;

/// Print an error with a short cause and concrete steps to fix it
pub fn print_error_with_help(error_type: ErrorType, context: &str) {
    eprintln!("\n{}", "❌ Something went wrong".red().bold());
    eprintln!();

    match error_type {
        ErrorType::InvalidDirectory(path) => {
            eprintln!("Cause: {} is not a directory", path.display());
            eprintln!();
            eprintln!("{}", "💡 How to fix:".yellow().bold());
            eprintln!("  1. Check that the path exists:");
            eprintln!("     {}", format!("ls {}", path.display()).cyan());
            eprintln!("  2. Pass the project root, not a single file");
        }
        ErrorType::StoreNotInitialized(store_dir) => {
            eprintln!("Cause: no index found in {}", store_dir.display());
            eprintln!();
            eprintln!("{}", "💡 How to fix:".yellow().bold());
            eprintln!("  1. Index the project first:");
            eprintln!("     {}", format!("project-assistant scan {}", context).cyan());
            eprintln!("  2. If you used --store-dir for the scan, pass it here as well");
        }
        ErrorType::MissingApiKey(env_var) => {
            eprintln!("Cause: the {} environment variable is not set", env_var);
            eprintln!();
            eprintln!("{}", "💡 How to fix:".yellow().bold());
            eprintln!("  1. Set the API key:");
            eprintln!("     {}", format!("export {}=your-api-key", env_var).cyan());
            eprintln!("  2. Or point [llm] api_key_env in config.toml to another variable");
            eprintln!("  3. Use the saved prompt with any other model:");
            eprintln!("     {}", context.cyan());
        }
        ErrorType::EmbeddingUnavailable(url) => {
            eprintln!("Cause: the embedding server at {} did not answer", url);
            eprintln!();
            eprintln!("{}", "💡 How to fix:".yellow().bold());
            eprintln!("  1. Start Ollama and pull the model:");
            eprintln!("     {}", "ollama pull nomic-embed-text".cyan());
            eprintln!("  2. Or index without a server (hash embeddings):");
            eprintln!("     {}", format!("project-assistant --offline scan {}", context).cyan());
        }
        ErrorType::LLMApiError(message) => {
            eprintln!("Cause: LLM API error: {}", message);
            eprintln!();
            eprintln!("{}", "💡 How to fix:".yellow().bold());
            eprintln!("  1. Check the API key and network connection");
            eprintln!("  2. The prompt was saved, you can retry with:");
            eprintln!("     {}", context.cyan());
        }
    }
    eprintln!();
}

pub enum ErrorType {
    InvalidDirectory(PathBuf),
    StoreNotInitialized(PathBuf),
    MissingApiKey(String),
    EmbeddingUnavailable(String),
    LLMApiError(String),
}
