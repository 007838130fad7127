//! Parallel multi-query evaluation with CombSUM fusion
//!
//! Each variant of a multi-query is evaluated on the rayon pool with its own
//! cursors and top-k queue; the driver joins all variants before fusing.
//! CombSUM accumulates per-variant scores by doc_id, with no normalization
//! across variants, and refills a fresh queue with the fused scores.
//!
//! Reduction order is fixed for reproducibility: variants accumulate in
//! input order, and accumulator entries enter the fused queue in ascending
//! doc_id order.

use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::query::topk::TopKQueue;
use crate::query::{MultiQuery, Query};
use crate::{DocId, Score};

/// Evaluate every variant in parallel and CombSUM-fuse the results.
///
/// `fused_k` caps the fused ranking; `floor` presets its admission
/// threshold. A failing variant aborts the multi-query, but only after all
/// variants have completed; the first failure (in input order) is surfaced.
pub fn combsum<F>(
    multi_query: &MultiQuery,
    eval: F,
    fused_k: usize,
    floor: Option<Score>,
) -> Result<Vec<(Score, DocId)>>
where
    F: Fn(&Query) -> Result<Vec<(Score, DocId)>> + Sync,
{
    let per_variant: Vec<Result<Vec<(Score, DocId)>>> =
        multi_query.par_iter().map(|query| eval(query)).collect();

    let mut variant_results = Vec::with_capacity(per_variant.len());
    for result in per_variant {
        variant_results.push(result.map_err(|e| Error::WorkerFailed(e.to_string()))?);
    }

    Ok(fuse(&variant_results, fused_k, floor))
}

/// CombSUM-fuse already-computed per-variant rankings.
pub fn fuse(
    variant_results: &[Vec<(Score, DocId)>],
    fused_k: usize,
    floor: Option<Score>,
) -> Vec<(Score, DocId)> {
    let mut accumulators: FxHashMap<DocId, Score> = FxHashMap::default();
    for results in variant_results {
        for &(score, doc_id) in results {
            *accumulators.entry(doc_id).or_insert(0.0) += score;
        }
    }

    let mut entries: Vec<(DocId, Score)> = accumulators.into_iter().collect();
    entries.sort_unstable_by_key(|&(doc_id, _)| doc_id);

    let mut fused = match floor {
        Some(floor) => TopKQueue::with_initial_threshold(fused_k, floor),
        None => TopKQueue::new(fused_k),
    };
    for (doc_id, score) in entries {
        fused.insert(score, doc_id);
    }
    fused.finalize();
    fused.topk().to_vec()
}

/// Evaluate a multi-query through the SP-CS driver: variants collapse into a
/// single concatenated query evaluated once.
pub fn spcs<F>(multi_query: &MultiQuery, eval: F) -> Result<Vec<(Score, DocId)>>
where
    F: Fn(&Query) -> Result<Vec<(Score, DocId)>>,
{
    let flat = crate::query::multi_query_to_spcs(multi_query);
    eval(&flat)
}
