use colored::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::StoreConfig;
use crate::description_cache::DescriptionCache;
use crate::llm::FileProposal;
use crate::metadata::MetadataIndex;
use crate::scanner::ScanStats;
use crate::search::{PassOutcome, SearchReport};
use crate::vector_store::VectorStore;

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchJson {
    pub query: String,
    pub files: Vec<String>,
    pub keyword: PassJson,
    pub vector: PassJson,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PassJson {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub matches: Vec<String>,
}

impl From<&PassOutcome> for PassJson {
    fn from(outcome: &PassOutcome) -> Self {
        match outcome {
            PassOutcome::Matched(files) => Self {
                available: true,
                reason: None,
                matches: files.iter().cloned().collect(),
            },
            PassOutcome::Unavailable(reason) => Self {
                available: false,
                reason: Some(reason.clone()),
                matches: Vec::new(),
            },
        }
    }
}

pub fn generate_json_report(query: &str, report: &SearchReport) -> SearchJson {
    SearchJson {
        query: query.to_string(),
        files: report.files.clone(),
        keyword: PassJson::from(&report.keyword),
        vector: PassJson::from(&report.vector),
    }
}

pub fn print_scan_report(stats: &ScanStats, structure_path: &Path) {
    println!("\n{}", "📦 Scan results".bold());
    println!("{}", "━".repeat(50));
    println!();
    println!("📁 Source files: {}", stats.files);
    println!("🧮 Embedded: {}", stats.embedded);
    println!(
        "🤖 Summaries: {} new, {} cached",
        stats.summarized, stats.reused
    );

    if stats.fallbacks > 0 {
        println!(
            "{} {} summaries fell back to the first source line",
            "[warn]".yellow().bold(),
            stats.fallbacks
        );
    }
    if stats.embedding_failures > 0 {
        println!(
            "{} {} files have no embedding (keyword search only)",
            "[warn]".yellow().bold(),
            stats.embedding_failures
        );
    }
    if stats.read_failures > 0 {
        println!(
            "{} {} files could not be read",
            "[warn]".red().bold(),
            stats.read_failures
        );
    }

    println!();
    println!("🗺️  Structure: {}", structure_path.display());
}

pub fn print_search_report(query: &str, report: &SearchReport) {
    println!("\n{} {}", "🔎 Relevant files for".bold(), query.cyan());
    println!("{}", "━".repeat(50));

    print_pass("keyword", &report.keyword);
    print_pass("vector", &report.vector);
    println!();

    if report.files.is_empty() {
        println!("✨ Nothing relevant found");
        return;
    }
    let last = report.files.len() - 1;
    for (i, file) in report.files.iter().enumerate() {
        let branch = if i == last { "└─" } else { "├─" };
        let mut sources = Vec::new();
        if report.keyword.files().is_some_and(|f| f.contains(file)) {
            sources.push("keyword");
        }
        if report.vector.files().is_some_and(|f| f.contains(file)) {
            sources.push("vector");
        }
        println!("{} {} {}", branch, file, format!("({})", sources.join(", ")).dimmed());
    }
}

fn print_pass(name: &str, outcome: &PassOutcome) {
    match outcome {
        PassOutcome::Matched(files) => {
            println!("{} {} matches", format!("[{}]", name).green().bold(), files.len())
        }
        PassOutcome::Unavailable(reason) => {
            println!("{} unavailable: {}", format!("[{}]", name).yellow().bold(), reason)
        }
    }
}

/// Snapshot of what is on disk for one project
#[derive(Debug, Serialize)]
pub struct StoreStatus {
    pub store_dir: PathBuf,
    pub vectors: usize,
    pub dimension: Option<usize>,
    pub descriptions: usize,
    pub metadata_records: usize,
    pub has_structure: bool,
}

impl StoreStatus {
    pub fn collect(store: &StoreConfig) -> Self {
        let vectors = VectorStore::load(store);
        Self {
            store_dir: store.dir.clone(),
            vectors: vectors.len(),
            dimension: vectors.dimension(),
            descriptions: DescriptionCache::load(store).len(),
            metadata_records: MetadataIndex::load(store).len(),
            has_structure: store.structure_path().exists(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.vectors > 0 || self.metadata_records > 0
    }
}

pub fn print_status(status: &StoreStatus) {
    println!("\n{}", "📊 Index status".bold());
    println!("{}", "━".repeat(50));
    println!();
    println!("📂 Store: {}", status.store_dir.display());

    if !status.is_initialized() {
        println!("{}", "Not indexed yet".yellow());
        return;
    }

    match status.dimension {
        Some(dimension) => println!("🧮 Vectors: {} ({}-d)", status.vectors, dimension),
        None => println!("🧮 Vectors: 0"),
    }
    println!("📝 Cached descriptions: {}", status.descriptions);
    println!("🏷️  Files with symbols: {}", status.metadata_records);
    println!(
        "🗺️  Structure overview: {}",
        if status.has_structure {
            "yes".green()
        } else {
            "missing".red()
        }
    );
}

pub fn print_proposals(proposals: &[FileProposal]) {
    println!("\n{}", "✏️  Proposed changes".bold());
    println!("{}", "━".repeat(50));

    if proposals.is_empty() {
        println!("✨ The model proposed no changes");
        return;
    }

    for proposal in proposals {
        println!();
        println!("{} {}", "──".dimmed(), proposal.file.cyan().bold());
        println!("{}", proposal.new_content.trim_end());
    }
}
