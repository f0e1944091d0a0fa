use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use scip_apex::config::IndexerConfig;
use scip_apex::error::Result;
use scip_apex::index::{read_index, IndexStats, SymbolInformation};
use scip_apex::indexer;
use scip_apex::indexer::symbols::{parse_symbol, Descriptor};

#[derive(Parser)]
#[command(name = "scip-apex")]
#[command(about = "Build a SCIP-style code-intelligence index from a resolved Apex program")]
#[command(version)]
#[command(after_long_help = r#"
EXAMPLES:
    # Index a project, scanning force-app for object descriptors
    scip-apex index force-app --resolved build/resolved.json

    # Write the index somewhere else and record paths relative to ./project
    scip-apex index src --resolved resolved.json -o out/index.json --project-root project

    # Skip .object / .field-meta.xml ingestion
    scip-apex index src --resolved resolved.json --no-metadata-descriptors

    # Show index statistics
    scip-apex stats index.json
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build an index from a resolved program
    Index(IndexArgs),

    /// Show statistics for an existing index
    Stats {
        /// Path to the index file
        #[arg(default_value = "index.json")]
        index: PathBuf,
    },
}

#[derive(Args, Debug, Default)]
pub struct IndexArgs {
    /// Directories scanned for object and field descriptors
    pub source_dirs: Vec<PathBuf>,

    /// Resolved program (symbol graph plus bindings) as JSON
    #[arg(long)]
    pub resolved: Option<PathBuf>,

    /// Output file path [default: index.json]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Root that document paths are made relative to [default: cwd]
    #[arg(long)]
    pub project_root: Option<PathBuf>,

    /// Config file [default: ./.scip-apex.yml if present]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Do not ingest metadata descriptor files
    #[arg(long)]
    pub no_metadata_descriptors: bool,
}

impl IndexArgs {
    fn as_config(&self) -> IndexerConfig {
        IndexerConfig {
            source_dirs: self.source_dirs.clone(),
            resolved: self.resolved.clone(),
            output: self.output.clone(),
            project_root: self.project_root.clone(),
            metadata_descriptors: self.no_metadata_descriptors.then_some(false),
        }
    }
}

pub fn index_directory(args: &IndexArgs, cwd: &Path, arguments: Vec<String>) -> Result<()> {
    let file_config = match &args.config {
        Some(path) => IndexerConfig::load(&cwd.join(path))?,
        None => IndexerConfig::discover(cwd)?.unwrap_or_default(),
    };
    let options = file_config
        .merge(args.as_config())
        .into_options(cwd, arguments)?;

    let stats = indexer::run(&options)?;

    println!(
        "Indexed {} documents ({} definitions, {} references) -> {}",
        stats.documents,
        stats.definitions,
        stats.references,
        options.output.display()
    );
    Ok(())
}

pub fn show_stats(index_path: &Path) -> Result<()> {
    let index = read_index(index_path)?;
    let stats = IndexStats::from_index(&index);

    println!("Index Statistics:");
    println!("  Documents: {}", stats.documents);
    println!("  Occurrences: {}", stats.occurrences);
    println!("  Definitions: {}", stats.definitions);
    println!("  References: {}", stats.references);
    println!("  Symbols: {}", stats.symbols);
    println!("  External symbols: {}", stats.external_symbols);

    if !stats.symbols_by_kind.is_empty() {
        println!("\n  Symbols by kind:");
        for (kind, count) in &stats.symbols_by_kind {
            println!("    {}: {}", kind, count);
        }
    }

    let external = external_by_descriptor(&index.external_symbols);
    if !external.is_empty() {
        println!("\n  External symbols by descriptor:");
        for (kind, count) in &external {
            println!("    {}: {}", kind, count);
        }
    }

    Ok(())
}

/// Counts external symbols by their innermost descriptor (type, method, term).
fn external_by_descriptor(symbols: &[SymbolInformation]) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    for info in symbols {
        let kind = match parse_symbol(&info.symbol).as_deref().and_then(<[Descriptor]>::last) {
            Some(Descriptor::Type(_)) => "type",
            Some(Descriptor::Method(_)) => "method",
            Some(Descriptor::Term(_)) => "term",
            None => "unparsed",
        };
        *counts.entry(kind).or_default() += 1;
    }
    counts
}
