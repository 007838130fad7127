//! Per-document score accumulators for term-at-a-time evaluation

use crate::query::topk::TopKQueue;
use crate::{DocId, Score};

/// Number of documents covered by one lazy-accumulator generation block.
pub const LAZY_BLOCK_SIZE: usize = 128;

/// Accumulates scores by doc_id across the posting lists of a query, then
/// aggregates the touched documents into a top-k queue.
pub trait Accumulator {
    /// Reset for a new query.
    fn init(&mut self);
    fn accumulate(&mut self, doc_id: DocId, score: Score);
    fn aggregate(&self, topk: &mut TopKQueue);
}

/// Dense accumulator: one `f32` per document, zero-filled on every `init`.
///
/// A cell left at exactly 0.0 counts as untouched during aggregation.
#[derive(Debug, Clone)]
pub struct DenseAccumulator {
    scores: Vec<Score>,
}

impl DenseAccumulator {
    pub fn new(num_docs: usize) -> Self {
        Self {
            scores: vec![0.0; num_docs],
        }
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

impl Accumulator for DenseAccumulator {
    fn init(&mut self) {
        self.scores.fill(0.0);
    }

    fn accumulate(&mut self, doc_id: DocId, score: Score) {
        self.scores[doc_id as usize] += score;
    }

    fn aggregate(&self, topk: &mut TopKQueue) {
        for (doc_id, &score) in self.scores.iter().enumerate() {
            if score != 0.0 {
                topk.insert(score, doc_id as DocId);
            }
        }
    }
}

/// Lazy accumulator: doc_ids are partitioned into fixed-size blocks, each
/// tagged with the generation that last wrote it. `init` only bumps the
/// generation; a block is zeroed when first written in a generation, so
/// sparse queries never pay a full zero-fill.
#[derive(Debug, Clone)]
pub struct LazyAccumulator {
    scores: Vec<Score>,
    generations: Vec<u8>,
    generation: u8,
}

impl LazyAccumulator {
    pub fn new(num_docs: usize) -> Self {
        Self {
            scores: vec![0.0; num_docs],
            generations: vec![0; num_docs.div_ceil(LAZY_BLOCK_SIZE)],
            generation: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    fn block_range(&self, block: usize) -> std::ops::Range<usize> {
        let start = block * LAZY_BLOCK_SIZE;
        start..(start + LAZY_BLOCK_SIZE).min(self.scores.len())
    }
}

impl Accumulator for LazyAccumulator {
    fn init(&mut self) {
        if self.generation == u8::MAX {
            // Counter rollover: clear all tags so stale generations cannot
            // alias the restarted counter.
            self.generations.fill(0);
            self.generation = 1;
        } else {
            self.generation += 1;
        }
    }

    fn accumulate(&mut self, doc_id: DocId, score: Score) {
        let block = doc_id as usize / LAZY_BLOCK_SIZE;
        if self.generations[block] != self.generation {
            let range = self.block_range(block);
            self.scores[range].fill(0.0);
            self.generations[block] = self.generation;
        }
        self.scores[doc_id as usize] += score;
    }

    fn aggregate(&self, topk: &mut TopKQueue) {
        for (block, &generation) in self.generations.iter().enumerate() {
            if generation != self.generation {
                continue;
            }
            let range = self.block_range(block);
            for doc_id in range {
                let score = self.scores[doc_id];
                if score != 0.0 {
                    topk.insert(score, doc_id as DocId);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aggregate_all(acc: &dyn Fn(&mut TopKQueue)) -> Vec<(Score, DocId)> {
        let mut topk = TopKQueue::new(1000);
        acc(&mut topk);
        topk.finalize();
        topk.topk().to_vec()
    }

    #[test]
    fn dense_accumulates_and_aggregates_touched_docs() {
        let mut acc = DenseAccumulator::new(10);
        acc.init();
        acc.accumulate(3, 1.5);
        acc.accumulate(3, 0.5);
        acc.accumulate(7, 4.0);

        let results = aggregate_all(&|t| acc.aggregate(t));
        assert_eq!(results, vec![(4.0, 7), (2.0, 3)]);
    }

    #[test]
    fn lazy_matches_dense_across_queries_without_refill() {
        let queries: &[&[(DocId, Score)]] = &[
            &[(0, 1.0), (130, 2.0), (131, 0.25)],
            &[(130, 3.0), (299, 1.0)],
            &[(5, 0.5)],
        ];
        let mut dense = DenseAccumulator::new(300);
        let mut lazy = LazyAccumulator::new(300);

        for postings in queries {
            dense.init();
            lazy.init();
            for &(doc, score) in *postings {
                dense.accumulate(doc, score);
                lazy.accumulate(doc, score);
            }
            assert_eq!(
                aggregate_all(&|t| dense.aggregate(t)),
                aggregate_all(&|t| lazy.aggregate(t))
            );
        }
    }

    #[test]
    fn lazy_survives_generation_rollover() {
        let mut lazy = LazyAccumulator::new(200);
        // Touch a block, then cycle the generation counter past its range.
        lazy.init();
        lazy.accumulate(150, 9.0);
        for _ in 0..300 {
            lazy.init();
        }
        lazy.accumulate(7, 1.0);

        let results = aggregate_all(&|t| lazy.aggregate(t));
        assert_eq!(results, vec![(1.0, 7)]);
    }
}
