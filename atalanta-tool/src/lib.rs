//! Shared runtime for the `evaluate` and `perftest` binaries: artifact
//! loading, query reading, and evaluator construction.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use rustc_hash::FxHashSet;
use tracing::{info, warn};

use atalanta_core::query::algorithm::{evaluate, Algorithm};
use atalanta_core::query::{parse_query_ids, parse_query_terms, MultiQuery, Query};
use atalanta_core::{DocId, Error, InvertedIndex, Score, ScorerKind, TermProcessor, WandData};

/// The only registered on-disk index codec.
pub const INDEX_TYPE: &str = "vint";

/// Install the stderr tracing subscriber; `RUST_LOG` overrides the default
/// level, `silent` raises it to errors only.
pub fn init_logging(silent: bool) {
    let default = if silent { "error" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Load an index, rejecting unregistered type names.
pub fn load_index(type_name: &str, path: &Path) -> Result<InvertedIndex> {
    if type_name != INDEX_TYPE {
        return Err(Error::UnknownIndexType(type_name.to_string()).into());
    }
    info!("loading index from {}", path.display());
    let index = InvertedIndex::from_file(path)
        .with_context(|| format!("could not load index {}", path.display()))?;
    Ok(index)
}

/// Load wand metadata, checking the expected block-max layout.
pub fn load_wand(path: &Path, compressed: bool) -> Result<WandData> {
    let wdata = WandData::from_json_file(path)
        .with_context(|| format!("could not load wand data {}", path.display()))?;
    if compressed != wdata.is_quantized() {
        let found = if wdata.is_quantized() {
            "quantized"
        } else {
            "raw"
        };
        return Err(Error::Corruption(format!(
            "wand data {} holds {found} block maxima",
            path.display()
        ))
        .into());
    }
    Ok(wdata)
}

/// Read queries from a file, or stdin when no path is given. Blank lines are
/// skipped; with a term processor the lines are parsed as surface words,
/// otherwise as decimal term ids.
pub fn read_queries(path: Option<&Path>, processor: Option<&TermProcessor>) -> Result<Vec<Query>> {
    let mut queries = Vec::new();
    let mut push_line = |line: &str| -> Result<()> {
        if line.trim().is_empty() {
            return Ok(());
        }
        let query = match processor {
            Some(processor) => parse_query_terms(line, processor),
            None => parse_query_ids(line)?,
        };
        queries.push(query);
        Ok(())
    };

    match path {
        Some(path) => {
            let reader = BufReader::new(
                File::open(path)
                    .with_context(|| format!("could not open queries {}", path.display()))?,
            );
            for line in reader.lines() {
                push_line(&line?)?;
            }
        }
        None => {
            for line in std::io::stdin().lock().lines() {
                push_line(&line?)?;
            }
        }
    }
    Ok(queries)
}

/// One admission threshold per line.
pub fn read_thresholds(path: &Path) -> Result<Vec<Score>> {
    let reader = BufReader::new(
        File::open(path)
            .with_context(|| format!("could not open thresholds {}", path.display()))?,
    );
    let mut thresholds = Vec::new();
    for line in reader.lines() {
        let line = line?;
        thresholds.push(
            line.trim()
                .parse::<Score>()
                .with_context(|| format!("bad threshold `{line}`"))?,
        );
    }
    Ok(thresholds)
}

/// Prefault every distinct query term once.
pub fn warmup_terms(index: &InvertedIndex, queries: &[MultiQuery]) {
    let mut warmed: FxHashSet<u32> = FxHashSet::default();
    for multi_query in queries {
        for query in multi_query {
            for &term in &query.terms {
                if warmed.insert(term) {
                    index.warmup(term);
                }
            }
        }
    }
    info!("warmed up {} terms", warmed.len());
}

/// Build the per-variant evaluator the fusion driver fans out.
pub fn make_eval<'a>(
    algorithm: Algorithm,
    index: &'a InvertedIndex,
    wdata: &'a WandData,
    scorer: &'a ScorerKind,
    k: usize,
    lazy_accumulator: bool,
) -> impl Fn(&Query) -> atalanta_core::Result<Vec<(Score, DocId)>> + Sync + 'a {
    move |query: &Query| {
        Ok(evaluate(
            algorithm,
            index,
            wdata,
            scorer,
            query,
            k,
            lazy_accumulator,
        ))
    }
}

/// Sanity-check that the loaded artifacts describe the same collection.
pub fn check_collection(index: &InvertedIndex, wdata: &WandData, documents_len: Option<usize>) {
    if wdata.num_docs() != index.num_docs() {
        warn!(
            "wand data covers {} documents but the index has {}",
            wdata.num_docs(),
            index.num_docs()
        );
    }
    if let Some(len) = documents_len {
        if (len as u64) < index.num_docs() {
            warn!(
                "document lexicon has {len} entries for {} documents",
                index.num_docs()
            );
        }
    }
}
