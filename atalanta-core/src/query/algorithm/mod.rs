//! Top-k evaluation algorithms and runtime dispatch
//!
//! Every algorithm populates a [`TopKQueue`] with the same ranking a
//! ranked-OR traversal would produce over the same cursors; they differ only
//! in which postings and blocks they may skip.

mod block_max_maxscore;
mod block_max_wand;
mod maxscore;
mod ranked_and;
mod ranked_or;
mod ranked_or_taat;
mod wand;

pub use block_max_maxscore::block_max_maxscore;
pub use block_max_wand::block_max_wand;
pub use maxscore::maxscore;
pub use ranked_and::ranked_and;
pub use ranked_or::ranked_or;
pub use ranked_or_taat::ranked_or_taat;
pub use wand::wand;

use std::cell::RefCell;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::index::InvertedIndex;
use crate::query::accumulator::{DenseAccumulator, LazyAccumulator};
use crate::query::cursor::{make_block_max_cursors, make_max_scored_cursors, make_scored_cursors};
use crate::query::topk::TopKQueue;
use crate::query::Query;
use crate::scorer::ScorerKind;
use crate::wand::WandData;
use crate::{DocId, Score};

/// The evaluation algorithms selectable at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Wand,
    BlockMaxWand,
    BlockMaxMaxscore,
    Maxscore,
    RankedOr,
    RankedAnd,
    RankedOrTaat,
}

impl Algorithm {
    pub const ALL: [Algorithm; 7] = [
        Algorithm::Wand,
        Algorithm::BlockMaxWand,
        Algorithm::BlockMaxMaxscore,
        Algorithm::Maxscore,
        Algorithm::RankedOr,
        Algorithm::RankedAnd,
        Algorithm::RankedOrTaat,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Wand => "wand",
            Algorithm::BlockMaxWand => "block_max_wand",
            Algorithm::BlockMaxMaxscore => "block_max_maxscore",
            Algorithm::Maxscore => "maxscore",
            Algorithm::RankedOr => "ranked_or",
            Algorithm::RankedAnd => "ranked_and",
            Algorithm::RankedOrTaat => "ranked_or_taat",
        }
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Algorithm::ALL
            .into_iter()
            .find(|a| a.name() == s)
            .ok_or_else(|| Error::UnknownAlgorithm(s.to_string()))
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Default)]
struct TaatScratch {
    dense: Option<DenseAccumulator>,
    lazy: Option<LazyAccumulator>,
}

thread_local! {
    // Term-at-a-time accumulators are reused across the queries a worker
    // evaluates; the lazy variant depends on this to skip zero-fills.
    static TAAT_SCRATCH: RefCell<TaatScratch> = RefCell::new(TaatScratch::default());
}

/// Evaluate one query and return its finalized top-k ranking.
///
/// `lazy_accumulator` selects the accumulator used by `ranked_or_taat`; the
/// other algorithms ignore it.
pub fn evaluate(
    algorithm: Algorithm,
    index: &InvertedIndex,
    wdata: &WandData,
    scorer: &ScorerKind,
    query: &Query,
    k: usize,
    lazy_accumulator: bool,
) -> Vec<(Score, DocId)> {
    let max_doc_id = index.max_doc_id();
    let mut topk = TopKQueue::new(k);

    match algorithm {
        Algorithm::RankedOr => {
            let mut cursors = make_scored_cursors(index, wdata, scorer, query);
            ranked_or(&mut cursors, max_doc_id, &mut topk);
        }
        Algorithm::RankedAnd => {
            let mut cursors = make_scored_cursors(index, wdata, scorer, query);
            ranked_and(&mut cursors, max_doc_id, &mut topk);
        }
        Algorithm::RankedOrTaat => {
            let mut cursors = make_scored_cursors(index, wdata, scorer, query);
            let num_docs = max_doc_id as usize;
            TAAT_SCRATCH.with(|scratch| {
                let mut scratch = scratch.borrow_mut();
                if lazy_accumulator {
                    let acc = scratch
                        .lazy
                        .get_or_insert_with(|| LazyAccumulator::new(num_docs));
                    if acc.len() != num_docs {
                        *acc = LazyAccumulator::new(num_docs);
                    }
                    ranked_or_taat(&mut cursors, max_doc_id, &mut topk, acc);
                } else {
                    let acc = scratch
                        .dense
                        .get_or_insert_with(|| DenseAccumulator::new(num_docs));
                    if acc.len() != num_docs {
                        *acc = DenseAccumulator::new(num_docs);
                    }
                    ranked_or_taat(&mut cursors, max_doc_id, &mut topk, acc);
                }
            });
        }
        Algorithm::Maxscore => {
            let mut cursors = make_max_scored_cursors(index, wdata, scorer, query);
            maxscore(&mut cursors, max_doc_id, &mut topk);
        }
        Algorithm::Wand => {
            let mut cursors = make_max_scored_cursors(index, wdata, scorer, query);
            wand(&mut cursors, max_doc_id, &mut topk);
        }
        Algorithm::BlockMaxWand => {
            let mut cursors = make_block_max_cursors(index, wdata, scorer, query);
            block_max_wand(&mut cursors, max_doc_id, &mut topk);
        }
        Algorithm::BlockMaxMaxscore => {
            let mut cursors = make_block_max_cursors(index, wdata, scorer, query);
            block_max_maxscore(&mut cursors, max_doc_id, &mut topk);
        }
    }

    topk.finalize();
    topk.topk().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn query(terms: Vec<u32>) -> Query {
        Query {
            id: None,
            terms,
            weights: Vec::new(),
        }
    }

    /// Index of the literal acceptance scenarios: term 0 = A, term 1 = B.
    fn scenario_index() -> (InvertedIndex, WandData) {
        let index = InvertedIndex::from_postings(
            4,
            vec![vec![(0, 2), (2, 1), (3, 3)], vec![(1, 1), (2, 2)]],
        )
        .unwrap();
        let wdata = WandData::build(&index, &ScorerKind::TermFreq, 2);
        (index, wdata)
    }

    #[test]
    fn ranked_or_baseline_scenario() {
        let (index, wdata) = scenario_index();
        let results = evaluate(
            Algorithm::RankedOr,
            &index,
            &wdata,
            &ScorerKind::TermFreq,
            &query(vec![0, 1]),
            3,
            false,
        );
        // doc 2 and doc 3 both score 3; ties resolve by doc_id.
        assert_eq!(results, vec![(3.0, 2), (3.0, 3), (2.0, 0)]);
    }

    #[test]
    fn wand_matches_ranked_or_scenario() {
        let (index, wdata) = scenario_index();
        let q = query(vec![0, 1]);
        let baseline = evaluate(
            Algorithm::RankedOr,
            &index,
            &wdata,
            &ScorerKind::TermFreq,
            &q,
            3,
            false,
        );
        let pruned = evaluate(
            Algorithm::Wand,
            &index,
            &wdata,
            &ScorerKind::TermFreq,
            &q,
            3,
            false,
        );
        assert_eq!(pruned, baseline);
    }

    #[test]
    fn maxscore_skips_non_essential_lists() {
        // Term 2 = C dominates with a single huge posting.
        let index = InvertedIndex::from_postings(
            4,
            vec![
                vec![(0, 2), (2, 1), (3, 3)],
                vec![(1, 1), (2, 2)],
                vec![(0, 100)],
            ],
        )
        .unwrap();
        let wdata = WandData::build(&index, &ScorerKind::TermFreq, 2);
        let scorer = ScorerKind::TermFreq;

        let mut cursors = crate::query::cursor::make_max_scored_cursors(
            &index,
            &wdata,
            &scorer,
            &query(vec![0, 1, 2]),
        );
        let mut topk = TopKQueue::new(1);
        maxscore(&mut cursors, index.max_doc_id(), &mut topk);
        topk.finalize();

        // Document 0 wins with A + C; everything else is pruned.
        assert_eq!(topk.topk(), &[(102.0, 0)]);
        // The low-impact list B became non-essential and was never drained:
        // its cursor still sits on its first posting.
        let b = cursors
            .iter()
            .find(|c| c.max_weight == 2.0)
            .expect("cursor for term B");
        assert_eq!(b.docs.doc_id(), 1);
    }

    #[test]
    fn ranked_and_scores_only_full_matches() {
        let (index, wdata) = scenario_index();
        let results = evaluate(
            Algorithm::RankedAnd,
            &index,
            &wdata,
            &ScorerKind::TermFreq,
            &query(vec![0, 1]),
            10,
            false,
        );
        // Only doc 2 contains both terms.
        assert_eq!(results, vec![(3.0, 2)]);
    }

    fn random_index(rng: &mut StdRng, num_docs: u32, num_terms: usize) -> InvertedIndex {
        let mut postings = Vec::with_capacity(num_terms);
        for _ in 0..num_terms {
            let density = rng.gen_range(0.05..0.6);
            let mut list = Vec::new();
            for doc in 0..num_docs {
                if rng.gen_bool(density) {
                    list.push((doc, rng.gen_range(1..8)));
                }
            }
            postings.push(list);
        }
        InvertedIndex::from_postings(u64::from(num_docs), postings).unwrap()
    }

    fn random_query(rng: &mut StdRng, num_terms: usize) -> Query {
        let len = rng.gen_range(1..=4);
        let terms = (0..len)
            .map(|_| rng.gen_range(0..num_terms as u32 + 1))
            .collect();
        query(terms)
    }

    #[test]
    fn pruning_algorithms_match_ranked_or_exactly() {
        // Identity scorer keeps all arithmetic exact, so rankings must be
        // bit-identical to the baseline.
        let mut rng = StdRng::seed_from_u64(42);
        let scorer = ScorerKind::TermFreq;
        for round in 0..30 {
            let num_docs = rng.gen_range(5..200);
            let num_terms = rng.gen_range(1..6);
            let index = random_index(&mut rng, num_docs, num_terms);
            let wdata = WandData::build(&index, &scorer, rng.gen_range(2..9));
            let q = random_query(&mut rng, num_terms);
            for k in [1usize, 3, 10, 50] {
                let baseline =
                    evaluate(Algorithm::RankedOr, &index, &wdata, &scorer, &q, k, false);
                for algorithm in [
                    Algorithm::Wand,
                    Algorithm::BlockMaxWand,
                    Algorithm::Maxscore,
                    Algorithm::BlockMaxMaxscore,
                    Algorithm::RankedOrTaat,
                ] {
                    for lazy in [false, true] {
                        let results =
                            evaluate(algorithm, &index, &wdata, &scorer, &q, k, lazy);
                        assert_eq!(
                            results, baseline,
                            "{algorithm} diverged in round {round} (k={k})"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn pruning_matches_ranked_or_with_quantized_blocks() {
        let mut rng = StdRng::seed_from_u64(99);
        let scorer = ScorerKind::TermFreq;
        for _ in 0..10 {
            let num_terms = rng.gen_range(2..5);
            let index = random_index(&mut rng, 120, num_terms);
            let wdata = WandData::build_quantized(&index, &scorer, 4);
            let q = random_query(&mut rng, num_terms);
            let baseline = evaluate(Algorithm::RankedOr, &index, &wdata, &scorer, &q, 10, false);
            for algorithm in [Algorithm::BlockMaxWand, Algorithm::BlockMaxMaxscore] {
                assert_eq!(
                    evaluate(algorithm, &index, &wdata, &scorer, &q, 10, false),
                    baseline,
                    "{algorithm} diverged on quantized blocks"
                );
            }
        }
    }

    #[test]
    fn bm25_rankings_agree_across_algorithms() {
        // Summation order differs between algorithms, so scores are compared
        // with a tolerance and k covers the whole candidate set.
        let mut rng = StdRng::seed_from_u64(7);
        let scorer = ScorerKind::from_name("bm25").unwrap();
        for _ in 0..10 {
            let num_terms = rng.gen_range(2..5);
            let index = random_index(&mut rng, 60, num_terms);
            let wdata = WandData::build(&index, &scorer, 4);
            let q = random_query(&mut rng, num_terms);
            let baseline = evaluate(Algorithm::RankedOr, &index, &wdata, &scorer, &q, 60, false);
            for algorithm in [
                Algorithm::Wand,
                Algorithm::BlockMaxWand,
                Algorithm::Maxscore,
                Algorithm::BlockMaxMaxscore,
                Algorithm::RankedOrTaat,
            ] {
                let results = evaluate(algorithm, &index, &wdata, &scorer, &q, 60, false);
                assert_eq!(results.len(), baseline.len(), "{algorithm} dropped docs");
                let mut expected: Vec<_> = baseline.clone();
                let mut got: Vec<_> = results.clone();
                expected.sort_by_key(|&(_, d)| d);
                got.sort_by_key(|&(_, d)| d);
                for (&(es, ed), &(gs, gd)) in expected.iter().zip(&got) {
                    assert_eq!(ed, gd, "{algorithm} returned a different doc set");
                    assert!((es - gs).abs() <= 1e-5, "{algorithm} score drifted");
                }
            }
        }
    }

    #[test]
    fn smaller_k_results_prefix_larger_k() {
        let mut rng = StdRng::seed_from_u64(3);
        let scorer = ScorerKind::TermFreq;
        let index = random_index(&mut rng, 150, 4);
        let wdata = WandData::build(&index, &scorer, 5);
        let q = query(vec![0, 1, 2, 3]);

        let full = evaluate(Algorithm::RankedOr, &index, &wdata, &scorer, &q, 50, false);
        for k in [1usize, 5, 20] {
            let small = evaluate(Algorithm::RankedOr, &index, &wdata, &scorer, &q, k, false);
            let expect = &full[..k.min(full.len())];
            assert_eq!(small, expect);
        }
    }

    #[test]
    fn empty_cursor_set_yields_empty_topk() {
        let (index, wdata) = scenario_index();
        for algorithm in Algorithm::ALL {
            let results = evaluate(
                algorithm,
                &index,
                &wdata,
                &ScorerKind::TermFreq,
                &query(vec![17, 23]),
                5,
                false,
            );
            assert!(results.is_empty(), "{algorithm} returned hits");
        }
    }

    #[test]
    fn algorithm_names_roundtrip() {
        for algorithm in Algorithm::ALL {
            assert_eq!(algorithm.name().parse::<Algorithm>().unwrap(), algorithm);
        }
        assert!(matches!(
            "taat_or".parse::<Algorithm>(),
            Err(Error::UnknownAlgorithm(_))
        ));
    }
}
