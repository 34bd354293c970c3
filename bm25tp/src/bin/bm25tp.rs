//! Index JSONL documents into Tantivy and run rescored searches against them.
//!
//! Usage:
//!     bm25tp index --index-dir ./idx --input docs.jsonl --fields content,title
//!     bm25tp search --index-dir ./idx --field content --query "term proximity" --explain
//!
//! Each input line is a JSON object with a numeric `id` and one string per
//! indexed field. Set `RUST_LOG=bm25tp=debug` to see per-pass timings.

use anyhow::{bail, Context, Result};
use bm25tp::indexer::UNIGRAM_TOKENIZER;
use bm25tp::{Indexer, RescoreConfig, RescoreOutput, Rescorer};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add documents from a JSONL file (upserting by id)
    Index(IndexArgs),
    /// First-pass BM25 search followed by proximity rescoring
    Search(SearchArgs),
}

#[derive(Args, Debug)]
struct IndexArgs {
    /// Index directory, created if missing
    #[arg(long)]
    index_dir: PathBuf,

    /// JSONL input file
    #[arg(long)]
    input: PathBuf,

    /// Text fields to index
    #[arg(long, value_delimiter = ',', default_value = "content")]
    fields: Vec<String>,
}

#[derive(Args, Debug)]
struct SearchArgs {
    #[arg(long)]
    index_dir: PathBuf,

    /// Field to search and rescore (ignored with --config)
    #[arg(long)]
    field: Option<String>,

    /// Query text (ignored with --config)
    #[arg(long)]
    query: Option<String>,

    /// Rescore request body as JSON; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    analyzer: Option<String>,

    #[arg(long)]
    decay: Option<f32>,

    #[arg(long)]
    window_size: Option<u32>,

    /// Candidates fetched by the first pass
    #[arg(long, default_value_t = 100)]
    first_pass_limit: usize,

    /// Print the score breakdown of every rescored document
    #[arg(long)]
    explain: bool,

    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Index(args) => index(args),
        Command::Search(args) => search(args),
    }
}

fn index(args: IndexArgs) -> Result<()> {
    let fields: Vec<&str> = args.fields.iter().map(String::as_str).collect();
    let indexer = Indexer::open_or_create(&args.index_dir, &fields)
        .with_context(|| format!("opening index at {}", args.index_dir.display()))?;

    let file = fs::File::open(&args.input).with_context(|| format!("reading {}", args.input.display()))?;
    let mut count = 0usize;
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let value: serde_json::Value =
            serde_json::from_str(&line).with_context(|| format!("line {}: invalid JSON", line_no + 1))?;
        let Some(id) = value.get("id").and_then(|v| v.as_u64()) else {
            bail!("line {}: missing numeric \"id\"", line_no + 1);
        };
        let texts: Vec<(&str, &str)> = fields
            .iter()
            .filter_map(|&f| value.get(f).and_then(|v| v.as_str()).map(|text| (f, text)))
            .collect();
        indexer.add_document(id, &texts)?;
        count += 1;
    }
    indexer.commit()?;

    info!(count, total = indexer.num_docs(), "indexed");
    println!("indexed {count} documents ({} total)", indexer.num_docs());
    Ok(())
}

fn search_config(args: &SearchArgs) -> Result<RescoreConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let json = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            RescoreConfig::from_json(&json)?
        }
        None => {
            let query = args.query.clone().context("--query is required without --config")?;
            let field = args.field.clone().context("--field is required without --config")?;
            RescoreConfig::new(query, field).with_analyzer(UNIGRAM_TOKENIZER)
        }
    };
    if let Some(analyzer) = &args.analyzer {
        config.analyzer = analyzer.clone();
    }
    if let Some(decay) = args.decay {
        config.decay = decay;
    }
    if let Some(window_size) = args.window_size {
        config.window_size = window_size;
    }
    Ok(config)
}

fn search(args: SearchArgs) -> Result<()> {
    let rescorer = Rescorer::new(search_config(&args)?)?;
    let config = rescorer.config();
    let indexer = Indexer::open(&args.index_dir)
        .with_context(|| format!("opening index at {}", args.index_dir.display()))?;

    let first_pass = indexer.search(&config.factor_field, &config.query, args.first_pass_limit)?;
    let output = rescorer.rescore(&first_pass, &indexer, &indexer)?;

    if args.json {
        let json = if args.explain {
            serde_json::to_string_pretty(&output)?
        } else {
            serde_json::to_string_pretty(&output.into_top_hits())?
        };
        println!("{json}");
    } else {
        print_table(&output, args.explain);
    }
    Ok(())
}

fn print_table(output: &RescoreOutput, explain: bool) {
    println!("total hits: {}", output.total_hits);
    for (rank, hit) in output.hits.iter().enumerate() {
        println!("{:>4}  {:>10}  {:>12.6}", rank + 1, hit.doc_id, hit.score);
    }
    if !explain {
        return;
    }
    println!();
    println!(
        "{:>10} {:>5} {:>5} {:>5} {:>9} {:>9} {:>9} {:>9} {:>9} {:>9} {:>5} {:>10}",
        "doc", "orig", "p1", "final", "base", "cover", "prox", "adj", "prox_d", "bm25_d", "boost", "score"
    );
    for d in &output.documents {
        println!(
            "{:>10} {:>5} {:>5} {:>5} {:>9.4} {:>9.3} {:>9.4} {:>9.4} {:>9.4} {:>9.4} {:>5.1} {:>10.4}",
            d.doc_id,
            d.rank_original,
            d.rank_pass1,
            d.rank_final,
            d.base_score,
            d.coverage_ratio,
            d.proximity_no_decay,
            d.char_adjacency,
            d.proximity_decayed,
            d.bm25_decayed,
            d.boost_multiplier,
            d.final_score
        );
    }
}
