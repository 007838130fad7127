//! WAND: pivot-based dynamic pruning on global score bounds
//!
//! Cursors stay sorted by current doc_id. The pivot is the first position
//! whose prefix-sum of score bounds could still beat the threshold; anything
//! before it can be skipped straight to the pivot document.

use crate::query::cursor::MaxScoredCursor;
use crate::query::topk::TopKQueue;
use crate::DocId;

pub fn wand(cursors: &mut [MaxScoredCursor<'_>], max_doc_id: DocId, topk: &mut TopKQueue) {
    if cursors.is_empty() {
        return;
    }
    sort_by_doc_id(cursors);

    loop {
        let Some(pivot) = find_pivot(cursors, max_doc_id, topk) else {
            return;
        };
        let pivot_doc = cursors[pivot].docs.doc_id();

        if pivot_doc == cursors[0].docs.doc_id() {
            // All lists up to the pivot are aligned: score the document.
            let mut score = 0.0;
            for cursor in cursors.iter_mut() {
                if cursor.docs.doc_id() != pivot_doc {
                    break;
                }
                score += cursor.score_current();
                cursor.docs.next();
            }
            topk.insert(score, pivot_doc);
            sort_by_doc_id(cursors);
        } else {
            // Advance the last list before the pivot block and restore order.
            let mut moved = pivot;
            while cursors[moved].docs.doc_id() == pivot_doc {
                moved -= 1;
            }
            cursors[moved].docs.next_geq(pivot_doc);
            bubble_right(cursors, moved);
        }
    }
}

/// First position whose bound prefix-sum would still enter the top-k.
fn find_pivot(
    cursors: &[MaxScoredCursor<'_>],
    max_doc_id: DocId,
    topk: &TopKQueue,
) -> Option<usize> {
    let mut upper_bound = 0.0;
    for (i, cursor) in cursors.iter().enumerate() {
        if cursor.docs.doc_id() >= max_doc_id {
            break;
        }
        upper_bound += cursor.max_weight;
        if topk.would_enter(upper_bound) {
            return Some(i);
        }
    }
    None
}

fn sort_by_doc_id(cursors: &mut [MaxScoredCursor<'_>]) {
    cursors.sort_by_key(|c| c.docs.doc_id());
}

/// Restore sortedness after cursor `i` advanced.
fn bubble_right(cursors: &mut [MaxScoredCursor<'_>], mut i: usize) {
    while i + 1 < cursors.len() && cursors[i].docs.doc_id() > cursors[i + 1].docs.doc_id() {
        cursors.swap(i, i + 1);
        i += 1;
    }
}
