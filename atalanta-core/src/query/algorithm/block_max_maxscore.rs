//! Block-Max MaxScore: MaxScore partitioning with block-level bounds
//!
//! The outer loop is MaxScore's essential / non-essential split; the
//! non-essential walk tightens each list's global bound to its current block
//! maximum before deciding whether the document can still enter the top-k.

use crate::query::cursor::BlockMaxScoredCursor;
use crate::query::topk::TopKQueue;
use crate::{DocId, Score};

pub fn block_max_maxscore(
    cursors: &mut [BlockMaxScoredCursor<'_>],
    max_doc_id: DocId,
    topk: &mut TopKQueue,
) {
    if cursors.is_empty() {
        return;
    }
    cursors.sort_by(|a, b| a.max_weight.total_cmp(&b.max_weight));

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
        let (mut score, next_doc) =
            score_essential(&mut cursors[non_essential..], cur_doc, max_doc_id);

        let initial_bound = if non_essential > 0 {
            upper_bounds[non_essential - 1]
        } else {
            0.0
        };
        let block_upper_bound = current_block_upper_bound(
            &mut cursors[..non_essential],
            initial_bound,
            cur_doc,
            score,
            topk,
        );

        if topk.would_enter(score + block_upper_bound) {
            score = score_non_essential(
                &mut cursors[..non_essential],
                block_upper_bound,
                cur_doc,
                score,
                topk,
            );
        }

        if topk.insert(score, cur_doc) {
            while non_essential < cursors.len() && !topk.would_enter(upper_bounds[non_essential]) {
                non_essential += 1;
            }
        }
        cur_doc = next_doc;
    }
}

/// Score and advance every essential list sitting on `cur_doc`; returns the
/// partial score and the next candidate document.
fn score_essential(
    essential: &mut [BlockMaxScoredCursor<'_>],
    cur_doc: DocId,
    max_doc_id: DocId,
) -> (Score, DocId) {
    let mut score = 0.0;
    let mut next_doc = max_doc_id;
    for cursor in essential.iter_mut() {
        if cursor.docs.doc_id() == cur_doc {
            score += cursor.score_current();
            cursor.docs.next();
        }
        next_doc = next_doc.min(cursor.docs.doc_id());
    }
    (score, next_doc)
}

/// Tighten the non-essential bound from global to block-level, walking the
/// lists from the largest bound down and stopping once the candidate is out.
fn current_block_upper_bound(
    non_essential: &mut [BlockMaxScoredCursor<'_>],
    mut block_upper_bound: Score,
    cur_doc: DocId,
    score: Score,
    topk: &TopKQueue,
) -> Score {
    for cursor in non_essential.iter_mut().rev() {
        if cursor.w.doc_id() < cur_doc {
            cursor.w.next_geq(cur_doc);
        }
        block_upper_bound -= cursor.max_weight - cursor.block_max();
        if !topk.would_enter(score + block_upper_bound) {
            break;
        }
    }
    block_upper_bound
}

/// Resolve the non-essential lists: replace each block bound by the actual
/// contribution until the document is either fully scored or proven out.
///
/// When the walk completes, the returned value is the exact document score;
/// on an early stop it is an upper bound that `insert` will reject.
fn score_non_essential(
    non_essential: &mut [BlockMaxScoredCursor<'_>],
    mut block_upper_bound: Score,
    cur_doc: DocId,
    score: Score,
    topk: &TopKQueue,
) -> Score {
    for cursor in non_essential.iter_mut().rev() {
        cursor.docs.next_geq(cur_doc);
        if cursor.docs.doc_id() == cur_doc {
            block_upper_bound += cursor.score_current();
        }
        block_upper_bound -= cursor.block_max();
        if !topk.would_enter(score + block_upper_bound) {
            break;
        }
    }
    score + block_upper_bound
}
