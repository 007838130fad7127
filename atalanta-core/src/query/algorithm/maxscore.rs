//! MaxScore: essential / non-essential list partitioning
//!
//! Cursors are ordered by their global score bound; once the prefix-sum of
//! bounds up to some position can no longer beat the top-k threshold, those
//! lists become non-essential and are only probed for documents the
//! essential lists surface.

use crate::query::cursor::MaxScoredCursor;
use crate::query::topk::TopKQueue;
use crate::DocId;

pub fn maxscore(cursors: &mut [MaxScoredCursor<'_>], max_doc_id: DocId, topk: &mut TopKQueue) {
    if cursors.is_empty() {
        return;
    }
    cursors.sort_by(|a, b| a.max_weight.total_cmp(&b.max_weight));

    // upper_bounds[i] bounds the total contribution of cursors 0..=i.
    let mut upper_bounds = Vec::with_capacity(cursors.len());
    let mut sum = 0.0f32;
    for cursor in cursors.iter() {
        sum += cursor.max_weight;
        upper_bounds.push(sum);
    }

    let mut non_essential = 0;
    let mut cur_doc = cursors
        .iter()
        .map(|c| c.docs.doc_id())
        .min()
        .unwrap_or(max_doc_id);

    while non_essential < cursors.len() && cur_doc < max_doc_id {
        // Essential pass: score and advance, tracking the next candidate.
        let mut score = 0.0;
        let mut next_doc = max_doc_id;
        for cursor in cursors[non_essential..].iter_mut() {
            if cursor.docs.doc_id() == cur_doc {
                score += cursor.score_current();
                cursor.docs.next();
            }
            next_doc = next_doc.min(cursor.docs.doc_id());
        }

        // Non-essential pass, cheapest bound last: stop as soon as even the
        // remaining bounds cannot lift the document into the top-k.
        for i in (0..non_essential).rev() {
            if !topk.would_enter(score + upper_bounds[i]) {
                break;
            }
            let cursor = &mut cursors[i];
            cursor.docs.next_geq(cur_doc);
            if cursor.docs.doc_id() == cur_doc {
                score += cursor.score_current();
            }
        }

        if topk.insert(score, cur_doc) {
            while non_essential < cursors.len() && !topk.would_enter(upper_bounds[non_essential]) {
                non_essential += 1;
            }
        }
        cur_doc = next_doc;
    }
}
