//! Ranked conjunction: only documents matching every term are scored

use crate::query::cursor::ScoredCursor;
use crate::query::topk::TopKQueue;
use crate::DocId;

pub fn ranked_and(cursors: &mut [ScoredCursor<'_>], max_doc_id: DocId, topk: &mut TopKQueue) {
    if cursors.is_empty() {
        return;
    }
    // Drive the intersection from the shortest list.
    cursors.sort_by_key(|c| c.docs.size());

    let mut candidate = cursors[0].docs.doc_id();
    let mut i = 1;
    'align: while candidate < max_doc_id {
        while i < cursors.len() {
            cursors[i].docs.next_geq(candidate);
            if cursors[i].docs.doc_id() != candidate {
                candidate = cursors[i].docs.doc_id();
                i = 0;
                continue 'align;
            }
            i += 1;
        }
        let mut score = 0.0;
        for cursor in cursors.iter() {
            score += cursor.score_current();
        }
        topk.insert(score, candidate);

        cursors[0].docs.next();
        candidate = cursors[0].docs.doc_id();
        i = 1;
    }
}
