//! Block-Max WAND: WAND pivoting refined with block-level score bounds
//!
//! After the global-bound pivot is found, the candidate is re-checked
//! against the sum of current block maxima. When even that refined bound
//! fails the threshold, the whole block range is skipped instead of scoring.

use crate::query::cursor::BlockMaxScoredCursor;
use crate::query::topk::TopKQueue;
use crate::DocId;

pub fn block_max_wand(
    cursors: &mut [BlockMaxScoredCursor<'_>],
    max_doc_id: DocId,
    topk: &mut TopKQueue,
) {
    if cursors.is_empty() {
        return;
    }
    sort_by_doc_id(cursors);

    loop {
        let Some(mut pivot) = find_pivot(cursors, max_doc_id, topk) else {
            return;
        };
        let pivot_doc = cursors[pivot].docs.doc_id();
        // Fold lists already aligned on the pivot document into the bound.
        while pivot + 1 < cursors.len() && cursors[pivot + 1].docs.doc_id() == pivot_doc {
            pivot += 1;
        }

        let mut block_upper_bound = 0.0;
        for cursor in cursors[..=pivot].iter_mut() {
            if cursor.w.doc_id() < pivot_doc {
                cursor.w.next_geq(pivot_doc);
            }
            block_upper_bound += cursor.block_max();
        }

        if topk.would_enter(block_upper_bound) {
            if pivot_doc == cursors[0].docs.doc_id() {
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
                let mut moved = pivot;
                while cursors[moved].docs.doc_id() == pivot_doc {
                    moved -= 1;
                }
                cursors[moved].docs.next_geq(pivot_doc);
                bubble_right(cursors, moved);
            }
        } else {
            // The current blocks cannot produce a top-k document: jump past
            // the nearest block boundary, capped by the next list's doc_id.
            let mut next = max_doc_id;
            for cursor in cursors[..=pivot].iter() {
                next = next.min(cursor.w.doc_id().saturating_add(1));
            }
            if pivot + 1 < cursors.len() {
                next = next.min(cursors[pivot + 1].docs.doc_id());
            }
            for cursor in cursors[..=pivot].iter_mut() {
                if cursor.docs.doc_id() < next {
                    cursor.docs.next_geq(next);
                }
            }
            sort_by_doc_id(cursors);
        }
    }
}

fn find_pivot(
    cursors: &[BlockMaxScoredCursor<'_>],
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

fn sort_by_doc_id(cursors: &mut [BlockMaxScoredCursor<'_>]) {
    cursors.sort_by_key(|c| c.docs.doc_id());
}

fn bubble_right(cursors: &mut [BlockMaxScoredCursor<'_>], mut i: usize) {
    while i + 1 < cursors.len() && cursors[i].docs.doc_id() > cursors[i + 1].docs.doc_id() {
        cursors.swap(i, i + 1);
        i += 1;
    }
}
