use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use spindex_core::tokenizer::tokenize;
use spindex_core::{
    build_naive, build_spimi, evaluate, rank, Bm25Params, BooleanOp, BooleanQuery, BuildStats,
    InvertedIndex, NaiveConfig, QueryError, Ranking, ScoredDoc, SpimiConfig, TokenizedDoc,
};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Debug, Deserialize)]
struct InputDoc {
    id: String,
    #[serde(default)]
    title: String,
    body: String,
}

struct Corpus {
    docs: Vec<TokenizedDoc>,
    /// External document IDs, indexed by internal doc ID.
    external_ids: Vec<String>,
}

#[derive(Parser)]
#[command(name = "spindex")]
#[command(about = "Build and query a boolean inverted index over a document corpus", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BuilderKind {
    Naive,
    Spimi,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RankingKind {
    Bm25,
    Matches,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index once and log construction statistics
    Build {
        /// Input path (file or directory of .json/.jsonl documents)
        #[arg(long)]
        input: PathBuf,
        #[arg(long, value_enum, default_value_t = BuilderKind::Spimi)]
        builder: BuilderKind,
        /// SPIMI block memory budget in bytes
        #[arg(long, default_value_t = 64 * 1024 * 1024)]
        block_budget: u64,
        /// Naive builder memory budget in bytes; unbounded when omitted
        #[arg(long)]
        memory_budget: Option<u64>,
        /// Directory SPIMI blocks are spilled into
        #[arg(long, default_value = "./blocks")]
        block_dir: PathBuf,
        /// Fail the build if the corpus yields fewer documents than this
        #[arg(long)]
        expect_docs: Option<u32>,
    },
    /// Build with both strategies, verify they agree, print a comparison report
    Compare {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value_t = 64 * 1024 * 1024)]
        block_budget: u64,
        #[arg(long, default_value = "./blocks")]
        block_dir: PathBuf,
    },
    /// Build a SPIMI index, then answer boolean queries read from stdin
    Search {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value_t = 64 * 1024 * 1024)]
        block_budget: u64,
        #[arg(long, default_value = "./blocks")]
        block_dir: PathBuf,
        #[arg(long, value_enum, default_value_t = RankingKind::Bm25)]
        ranking: RankingKind,
        /// BM25 term-frequency saturation, must be >= 0
        #[arg(long, default_value_t = 1.2)]
        k1: f32,
        /// BM25 length normalization, must be within 0..=1
        #[arg(long, default_value_t = 0.75)]
        b: f32,
        /// Show at most this many results per query
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, builder, block_budget, memory_budget, block_dir, expect_docs } => {
            cmd_build(&input, builder, block_budget, memory_budget, block_dir, expect_docs)
        }
        Commands::Compare { input, block_budget, block_dir } => {
            cmd_compare(&input, block_budget, block_dir)
        }
        Commands::Search { input, block_budget, block_dir, ranking, k1, b, top } => {
            cmd_search(&input, block_budget, block_dir, ranking, k1, b, top)
        }
    }
}

fn cmd_build(
    input: &Path,
    builder: BuilderKind,
    block_budget: u64,
    memory_budget: Option<u64>,
    block_dir: PathBuf,
    expect_docs: Option<u32>,
) -> Result<()> {
    let corpus = load_corpus(input)?;
    let started = Instant::now();
    let (_index, stats) = match builder {
        BuilderKind::Naive => build_naive(
            corpus.docs,
            &NaiveConfig { memory_budget, expected_docs: expect_docs },
        )?,
        BuilderKind::Spimi => build_spimi(
            corpus.docs,
            &SpimiConfig { block_budget, block_dir, expected_docs: expect_docs },
        )?,
    };
    let took = started.elapsed();
    tracing::info!(
        took_ms = took.as_millis() as u64,
        docs = stats.doc_count,
        terms = stats.term_count,
        postings = stats.postings_count,
        peak_bytes = stats.peak_memory_bytes,
        blocks = stats.block_count,
        "index build complete"
    );
    Ok(())
}

fn cmd_compare(input: &Path, block_budget: u64, block_dir: PathBuf) -> Result<()> {
    let corpus = load_corpus(input)?;
    let total_tokens: usize = corpus.docs.iter().map(|d| d.terms.len()).sum();

    let started = Instant::now();
    let (spimi_index, spimi_stats) = build_spimi(
        corpus.docs.clone(),
        &SpimiConfig { block_budget, block_dir, expected_docs: None },
    )?;
    let spimi_time = started.elapsed();

    let started = Instant::now();
    let (naive_index, naive_stats) = build_naive(corpus.docs, &NaiveConfig::default())?;
    let naive_time = started.elapsed();

    if naive_index != spimi_index {
        bail!("builder mismatch: naive and SPIMI produced different indexes");
    }

    let stamp = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| String::new());

    println!("========== CONSTRUCTION STATISTICS ==========");
    println!("generated at: {stamp}");
    println!("corpus: {} documents, {} tokens", naive_stats.doc_count, total_tokens);
    println!();
    print_builder("SPIMI", &spimi_stats, spimi_time);
    print_builder("Naive", &naive_stats, naive_time);

    let diff = naive_time.as_secs_f64() - spimi_time.as_secs_f64();
    println!("naive minus SPIMI: {:+.3} ms", diff * 1000.0);
    if naive_time.as_secs_f64() > 0.0 {
        println!("naive minus SPIMI: {:+.2} %", diff / naive_time.as_secs_f64() * 100.0);
    }
    println!("indexes identical: yes");
    Ok(())
}

fn print_builder(name: &str, stats: &BuildStats, took: Duration) {
    println!("--- {name} construction ---");
    println!("time:        {:.3} ms", took.as_secs_f64() * 1000.0);
    println!("peak memory: {} bytes (estimated)", stats.peak_memory_bytes);
    println!("blocks:      {}", stats.block_count);
    println!("vocabulary:  {} terms", stats.term_count);
    println!("postings:    {}", stats.postings_count);
    println!();
}

fn cmd_search(
    input: &Path,
    block_budget: u64,
    block_dir: PathBuf,
    ranking: RankingKind,
    k1: f32,
    b: f32,
    top: usize,
) -> Result<()> {
    if k1 < 0.0 {
        bail!("k1 must be greater than or equal to 0");
    }
    if !(0.0..=1.0).contains(&b) {
        bail!("b must be between 0 and 1");
    }
    let ranking = match ranking {
        RankingKind::Bm25 => Ranking::Bm25(Bm25Params { k1, b }),
        RankingKind::Matches => Ranking::MatchCount,
    };

    let corpus = load_corpus(input)?;
    let (index, stats) = build_spimi(
        corpus.docs,
        &SpimiConfig { block_budget, block_dir, expected_docs: None },
    )?;
    tracing::info!(docs = stats.doc_count, terms = stats.term_count, "index ready");

    println!("enter queries as: AND|OR term term ...  (a single term needs no operator; q quits)");
    let stdin = io::stdin();
    let mut lines = stdin.lock();
    let mut stdout = io::stdout();
    loop {
        print!("query> ");
        stdout.flush()?;
        let mut line = String::new();
        if lines.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "q" {
            break;
        }
        match run_query(&index, line, &ranking, top) {
            Ok(results) => print_results(&results, &corpus.external_ids),
            Err(err) => println!("query error: {err}"),
        }
    }
    Ok(())
}

/// Parse one query line: `AND|OR term term ...`, or a bare single term.
/// Terms go through the same tokenizer the corpus was indexed with.
fn parse_query_line(line: &str) -> Result<(BooleanOp, Vec<String>), QueryError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let (op, raw_terms) = match fields.as_slice() {
        [single] => (BooleanOp::And, std::slice::from_ref(single)),
        [op, rest @ ..] => (BooleanOp::parse(op)?, rest),
        [] => return Err(QueryError::EmptyQuery),
    };
    Ok((op, tokenize(&raw_terms.join(" "))))
}

fn run_query(
    index: &InvertedIndex,
    line: &str,
    ranking: &Ranking,
    top: usize,
) -> Result<Vec<ScoredDoc>, QueryError> {
    let (op, terms) = parse_query_line(line)?;
    let query = BooleanQuery::new(op, terms)?;
    let candidates = evaluate(index, &query);
    let mut ranked = rank(index, query.terms(), &candidates, ranking);
    ranked.truncate(top);
    Ok(ranked)
}

fn print_results(results: &[ScoredDoc], external_ids: &[String]) {
    if results.is_empty() {
        println!("no matching documents");
        return;
    }
    for (i, hit) in results.iter().enumerate() {
        let ext = external_ids.get(hit.doc_id as usize).map(String::as_str).unwrap_or("?");
        println!("{:>3}. doc {:>6}  {}  score {:.4}", i + 1, hit.doc_id, ext, hit.score);
    }
}

fn load_corpus(input: &Path) -> Result<Corpus> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
        // Deterministic document numbering regardless of walk order.
        files.sort();
    } else if input.is_file() {
        files.push(input.to_path_buf());
    } else {
        bail!("input path {} does not exist", input.display());
    }

    let mut corpus = Corpus { docs: Vec::new(), external_ids: Vec::new() };
    for file in &files {
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            read_jsonl(file, &mut corpus)
                .with_context(|| format!("reading {}", file.display()))?;
        } else {
            read_json(file, &mut corpus)
                .with_context(|| format!("reading {}", file.display()))?;
        }
    }
    tracing::info!(docs = corpus.docs.len(), files = files.len(), "corpus tokenized");
    Ok(corpus)
}

fn read_jsonl(file: &Path, corpus: &mut Corpus) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let doc: InputDoc = serde_json::from_str(&line)?;
        ingest(doc, corpus);
    }
    Ok(())
}

fn read_json(file: &Path, corpus: &mut Corpus) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    let json: serde_json::Value = serde_json::from_reader(reader)?;
    match json {
        serde_json::Value::Array(arr) => {
            for v in arr {
                ingest(serde_json::from_value(v)?, corpus);
            }
        }
        v @ serde_json::Value::Object(_) => ingest(serde_json::from_value(v)?, corpus),
        _ => bail!("{} does not contain documents", file.display()),
    }
    Ok(())
}

fn ingest(doc: InputDoc, corpus: &mut Corpus) {
    let doc_id = corpus.docs.len() as u32;
    let text = format!("{} {}", doc.title, doc.body);
    corpus.docs.push(TokenizedDoc { doc_id, terms: tokenize(&text) });
    corpus.external_ids.push(doc.id);
}
