//! Exhaustive document-at-a-time disjunction

use crate::query::cursor::ScoredCursor;
use crate::query::topk::TopKQueue;
use crate::DocId;

/// Score every document present in any posting list.
///
/// All pruning algorithms must reproduce this ranking (up to floating-point
/// summation order); it is the reference the property tests compare against.
pub fn ranked_or(cursors: &mut [ScoredCursor<'_>], max_doc_id: DocId, topk: &mut TopKQueue) {
    if cursors.is_empty() {
        return;
    }
    let mut cur_doc = cursors
        .iter()
        .map(|c| c.docs.doc_id())
        .min()
        .unwrap_or(max_doc_id);

    while cur_doc < max_doc_id {
        let mut score = 0.0;
        let mut next_doc = max_doc_id;
        for cursor in cursors.iter_mut() {
            if cursor.docs.doc_id() == cur_doc {
                score += cursor.score_current();
                cursor.docs.next();
            }
            next_doc = next_doc.min(cursor.docs.doc_id());
        }
        topk.insert(score, cur_doc);
        cur_doc = next_doc;
    }
}
