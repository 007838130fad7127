//! Bounded min-heap of scored documents with admission-threshold queries

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::{DocId, Score};

#[derive(Debug, Clone, Copy)]
struct HeapEntry {
    score: Score,
    doc_id: DocId,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.score == other.score && self.doc_id == other.doc_id
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: lower scores come first; among equal scores the larger
        // doc_id is evicted first, so the surviving set matches a sort by
        // (score desc, doc_id asc).
        other
            .score
            .partial_cmp(&self.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.doc_id.cmp(&other.doc_id))
    }
}

/// Fixed-capacity top-k queue.
///
/// `threshold()` is the score a candidate must strictly exceed to be
/// admitted; pruning algorithms read it on every pivot decision, so it is
/// O(1). While the heap is not yet full the threshold stays at the admission
/// floor (0 by default) and `would_enter` admits everything above the floor.
#[derive(Debug, Clone)]
pub struct TopKQueue {
    heap: BinaryHeap<HeapEntry>,
    k: usize,
    floor: Score,
    sorted: Vec<(Score, DocId)>,
}

impl TopKQueue {
    pub fn new(k: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(k.saturating_add(1).min(1 << 12)),
            k,
            floor: f32::NEG_INFINITY,
            sorted: Vec::new(),
        }
    }

    /// Queue with a preset admission floor: candidates must strictly exceed
    /// `floor` even while the heap is unfilled.
    pub fn with_initial_threshold(k: usize, floor: Score) -> Self {
        Self {
            floor,
            ..Self::new(k)
        }
    }

    pub fn capacity(&self) -> usize {
        self.k
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    fn min_score(&self) -> Score {
        self.heap.peek().map_or(f32::INFINITY, |e| e.score)
    }

    /// Would a document with this score be admitted?
    #[inline]
    pub fn would_enter(&self, score: Score) -> bool {
        if score <= self.floor {
            return false;
        }
        self.heap.len() < self.k || score > self.min_score()
    }

    /// Current admission threshold.
    #[inline]
    pub fn threshold(&self) -> Score {
        if self.heap.len() == self.k {
            self.min_score()
        } else {
            self.floor.max(0.0)
        }
    }

    /// Insert if the score would enter; evicts the minimum once over
    /// capacity. Returns whether the document was admitted.
    pub fn insert(&mut self, score: Score, doc_id: DocId) -> bool {
        if !self.would_enter(score) {
            return false;
        }
        self.heap.push(HeapEntry { score, doc_id });
        if self.heap.len() > self.k {
            self.heap.pop();
        }
        true
    }

    /// Sort the collected entries by score descending, doc_id ascending.
    pub fn finalize(&mut self) {
        let mut entries: Vec<_> = std::mem::take(&mut self.heap)
            .into_iter()
            .map(|e| (e.score, e.doc_id))
            .collect();
        entries.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.1.cmp(&b.1))
        });
        self.sorted = entries;
    }

    /// Snapshot of the finalized ranking.
    pub fn topk(&self) -> &[(Score, DocId)] {
        &self.sorted
    }
}
