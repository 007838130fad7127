//! Times multi-query retrieval: parallel variant evaluation plus fusion.
//!
//! Accepts a colon-separated list of algorithms; each is timed over the
//! whole query set with the first pass discarded. `--extract` prints
//! per-query mean latencies instead of the distribution summary.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use atalanta_core::query::algorithm::Algorithm;
use atalanta_core::query::{generate_multi_queries, MultiQuery};
use atalanta_core::timing::{extract_times, op_perftest};
use atalanta_core::{fusion, ScorerKind, TermProcessor};
use atalanta_tool::{
    check_collection, init_logging, load_index, load_wand, make_eval, read_queries,
    read_thresholds, warmup_terms,
};

/// Timed repetitions per query (one extra warm-up pass is discarded).
const RUNS: usize = 2;

#[derive(Parser)]
#[command(name = "perftest", about = "A tool for performing queries on an index.")]
struct Args {
    /// Index type
    #[arg(short = 't', long = "type")]
    index_type: String,

    /// Query algorithm, or a colon-separated list
    #[arg(short = 'a', long)]
    algorithm: String,

    /// Collection basename
    #[arg(short = 'i', long)]
    index: PathBuf,

    /// Wand data filename
    #[arg(short = 'w', long)]
    wand: PathBuf,

    /// Queries filename (stdin when omitted)
    #[arg(short = 'q', long)]
    query: Option<PathBuf>,

    /// Scorer function
    #[arg(short = 's', long)]
    scorer: String,

    /// Compressed wand input file
    #[arg(long)]
    compressed_wand: bool,

    /// k value for per-variant retrieval
    #[arg(short = 'k', default_value_t = 10)]
    k: usize,

    /// k value for the final fused list
    #[arg(short = 'z', default_value_t = 100)]
    fusion_k: usize,

    /// File of admission thresholds, one per multi-query
    #[arg(short = 'T', long)]
    thresholds: Option<PathBuf>,

    /// Term lexicon; switches query parsing to terms mode
    #[arg(long)]
    terms: Option<PathBuf>,

    /// File containing stopwords to ignore
    #[arg(long, requires = "terms")]
    stopwords: Option<PathBuf>,

    /// Stemmer type
    #[arg(long, requires = "terms")]
    stemmer: Option<String>,

    /// Extract individual query times
    #[arg(long)]
    extract: bool,

    /// Suppress logging
    #[arg(long)]
    silent: bool,

    /// Use the lazy accumulator for ranked_or_taat
    #[arg(long)]
    lazy_accumulator: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.silent);

    let algorithms = args
        .algorithm
        .split(':')
        .map(|name| name.parse::<Algorithm>())
        .collect::<atalanta_core::Result<Vec<_>>>()?;
    let scorer = ScorerKind::from_name(&args.scorer)?;

    let index = load_index(&args.index_type, &args.index)?;
    let wdata = load_wand(&args.wand, args.compressed_wand)?;
    check_collection(&index, &wdata, None);

    let thresholds = args
        .thresholds
        .as_deref()
        .map(read_thresholds)
        .transpose()?
        .unwrap_or_default();

    let processor = args
        .terms
        .as_ref()
        .map(|terms| TermProcessor::from_files(terms, args.stopwords.as_ref(), args.stemmer.as_deref()))
        .transpose()?;
    let queries = read_queries(args.query.as_deref(), processor.as_ref())?;
    let multi_queries = generate_multi_queries(queries)?;
    warmup_terms(&index, &multi_queries);

    info!("performing {} queries", args.index_type);
    info!("k: {}", args.k);
    if args.extract {
        println!("qid\tusec");
    }

    for algorithm in algorithms {
        info!("query type: {algorithm}");
        let eval = make_eval(
            algorithm,
            &index,
            &wdata,
            &scorer,
            args.k,
            args.lazy_accumulator,
        );
        let run = |idx: usize, multi_query: &MultiQuery| {
            let floor = thresholds.get(idx).copied();
            // The evaluator is infallible; the Result is part of the
            // fusion driver's worker contract.
            let _ = fusion::combsum(multi_query, &eval, args.fusion_k, floor);
        };

        if args.extract {
            let stdout = std::io::stdout();
            extract_times(run, &multi_queries, RUNS, &mut stdout.lock())
                .context("could not write extracted times")?;
        } else {
            op_perftest(run, &multi_queries, &args.index_type, algorithm.name(), RUNS);
        }
    }
    Ok(())
}
