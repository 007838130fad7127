//! Retrieves multi-query results in TREC format.
//!
//! Queries sharing an id form a multi-query; its variants run in parallel
//! and their rankings are CombSUM-fused (or, with `--spcs`, collapsed into a
//! single concatenated query before evaluation).

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use atalanta_core::query::algorithm::Algorithm;
use atalanta_core::query::generate_multi_queries;
use atalanta_core::trec::TrecWriter;
use atalanta_core::{fusion, DocLexicon, ScorerKind, TermProcessor};
use atalanta_tool::{
    check_collection, init_logging, load_index, load_wand, make_eval, read_queries,
};

#[derive(Parser)]
#[command(name = "evaluate", about = "Retrieves query results in TREC format.")]
struct Args {
    /// Index type
    #[arg(short = 't', long = "type")]
    index_type: String,

    /// Query algorithm
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

    /// Run identifier
    #[arg(short = 'r', long, default_value = "R0")]
    run: String,

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

    /// Term lexicon; switches query parsing to terms mode
    #[arg(long)]
    terms: Option<PathBuf>,

    /// File containing stopwords to ignore
    #[arg(long, requires = "terms")]
    stopwords: Option<PathBuf>,

    /// Stemmer type
    #[arg(long, requires = "terms")]
    stemmer: Option<String>,

    /// Document lexicon
    #[arg(long)]
    documents: PathBuf,

    /// Collapse each multi-query into one concatenated query (SP-CS)
    #[arg(long)]
    spcs: bool,

    /// Use the lazy accumulator for ranked_or_taat
    #[arg(long)]
    lazy_accumulator: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(false);

    let algorithm: Algorithm = args.algorithm.parse()?;
    let scorer = ScorerKind::from_name(&args.scorer)?;
    let index = load_index(&args.index_type, &args.index)?;
    let wdata = load_wand(&args.wand, args.compressed_wand)?;
    let documents = DocLexicon::from_file(&args.documents).with_context(|| {
        format!(
            "could not load document lexicon {}",
            args.documents.display()
        )
    })?;
    check_collection(&index, &wdata, Some(documents.len()));

    let processor = args
        .terms
        .as_ref()
        .map(|terms| TermProcessor::from_files(terms, args.stopwords.as_ref(), args.stemmer.as_deref()))
        .transpose()?;
    let queries = read_queries(args.query.as_deref(), processor.as_ref())?;
    let multi_queries = generate_multi_queries(queries)?;

    let eval = make_eval(
        algorithm,
        &index,
        &wdata,
        &scorer,
        args.k,
        args.lazy_accumulator,
    );

    let batch_start = Instant::now();
    let mut fused_results = Vec::with_capacity(multi_queries.len());
    for multi_query in &multi_queries {
        let fused = if args.spcs {
            fusion::spcs(multi_query, &eval)?
        } else {
            fusion::combsum(multi_query, &eval, args.fusion_k, None)?
        };
        fused_results.push(fused);
    }
    let batch_ms = batch_start.elapsed().as_secs_f64() * 1e3;

    let stdout = std::io::stdout();
    let mut writer = TrecWriter::new(stdout.lock(), args.run);
    for (multi_query, fused) in multi_queries.iter().zip(&fused_results) {
        let qid = multi_query
            .first()
            .and_then(|q| q.id.as_deref())
            .unwrap_or_default();
        writer.write_ranking(qid, fused, &documents)?;
    }

    info!("time taken to process queries: {batch_ms:.1}ms");
    Ok(())
}
