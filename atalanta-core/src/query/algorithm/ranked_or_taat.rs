//! Term-at-a-time disjunction over a per-document accumulator

use crate::query::accumulator::Accumulator;
use crate::query::cursor::ScoredCursor;
use crate::query::topk::TopKQueue;
use crate::DocId;

/// Drain each posting list fully into the accumulator, then aggregate the
/// touched documents into the top-k queue.
pub fn ranked_or_taat<A: Accumulator>(
    cursors: &mut [ScoredCursor<'_>],
    max_doc_id: DocId,
    topk: &mut TopKQueue,
    accumulator: &mut A,
) {
    if cursors.is_empty() {
        return;
    }
    accumulator.init();
    for cursor in cursors.iter_mut() {
        while cursor.docs.doc_id() < max_doc_id {
            accumulator.accumulate(cursor.docs.doc_id(), cursor.score_current());
            cursor.docs.next();
        }
    }
    accumulator.aggregate(topk);
}
