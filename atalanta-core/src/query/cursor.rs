//! Scored cursor family: posting cursors enriched with query weights,
//! term scorers, global score bounds and block-max enumerators
//!
//! One cursor is opened per deduplicated query term. Terms missing from the
//! index are dropped with a warning, so a cursor set may come out empty.

use tracing::warn;

use crate::index::InvertedIndex;
use crate::query::{query_freqs, Query};
use crate::scorer::{ScorerKind, TermScorer};
use crate::wand::{BlockMaxCursor, WandData};
use crate::{PostingCursor, Score};

/// Posting cursor with query weight and term scorer.
pub struct ScoredCursor<'a> {
    pub docs: PostingCursor<'a>,
    pub scorer: TermScorer<'a>,
    pub q_weight: f32,
}

impl ScoredCursor<'_> {
    /// Weighted score of the posting under the cursor.
    #[inline]
    pub fn score_current(&self) -> Score {
        self.q_weight * self.scorer.score(self.docs.doc_id(), self.docs.freq())
    }
}

/// [`ScoredCursor`] plus the term's global score bound scaled by the query
/// weight.
pub struct MaxScoredCursor<'a> {
    pub docs: PostingCursor<'a>,
    pub scorer: TermScorer<'a>,
    pub q_weight: f32,
    pub max_weight: Score,
}

impl MaxScoredCursor<'_> {
    #[inline]
    pub fn score_current(&self) -> Score {
        self.q_weight * self.scorer.score(self.docs.doc_id(), self.docs.freq())
    }
}

/// [`MaxScoredCursor`] plus a block-max enumerator.
pub struct BlockMaxScoredCursor<'a> {
    pub docs: PostingCursor<'a>,
    pub scorer: TermScorer<'a>,
    pub q_weight: f32,
    pub max_weight: Score,
    pub w: BlockMaxCursor<'a>,
}

impl BlockMaxScoredCursor<'_> {
    #[inline]
    pub fn score_current(&self) -> Score {
        self.q_weight * self.scorer.score(self.docs.doc_id(), self.docs.freq())
    }

    /// Query-weighted upper bound of the enumerator's current block.
    #[inline]
    pub fn block_max(&self) -> Score {
        self.q_weight * self.w.score()
    }
}

/// Weighted `(term, q_weight)` pairs for a query, skipping missing terms.
fn weighted_terms(
    index: &InvertedIndex,
    scorer: &ScorerKind,
    query: &Query,
) -> Vec<(crate::TermId, f32)> {
    let freqs = query_freqs(&query.terms);
    let use_weights = if query.weights.is_empty() {
        false
    } else if query.weights.len() == freqs.len() {
        true
    } else {
        warn!(
            "query has {} weights for {} distinct terms; weights ignored",
            query.weights.len(),
            freqs.len()
        );
        false
    };

    freqs
        .into_iter()
        .enumerate()
        .filter_map(|(pos, (term, qtf))| {
            if index.open(term).is_none() {
                warn!("term {term} not in the index and will be ignored");
                return None;
            }
            let mut q_weight =
                scorer.query_term_weight(qtf, index.doc_freq(term), index.num_docs());
            if use_weights {
                q_weight *= query.weights[pos];
            }
            Some((term, q_weight))
        })
        .collect()
}

/// Open plain scored cursors for a query.
pub fn make_scored_cursors<'a>(
    index: &'a InvertedIndex,
    wdata: &'a WandData,
    scorer: &ScorerKind,
    query: &Query,
) -> Vec<ScoredCursor<'a>> {
    weighted_terms(index, scorer, query)
        .into_iter()
        .filter_map(|(term, q_weight)| {
            Some(ScoredCursor {
                docs: index.open(term)?,
                scorer: scorer.term_scorer(wdata, term),
                q_weight,
            })
        })
        .collect()
}

/// Open cursors carrying the global per-term score bound.
pub fn make_max_scored_cursors<'a>(
    index: &'a InvertedIndex,
    wdata: &'a WandData,
    scorer: &ScorerKind,
    query: &Query,
) -> Vec<MaxScoredCursor<'a>> {
    weighted_terms(index, scorer, query)
        .into_iter()
        .filter_map(|(term, q_weight)| {
            Some(MaxScoredCursor {
                docs: index.open(term)?,
                scorer: scorer.term_scorer(wdata, term),
                q_weight,
                max_weight: q_weight * wdata.max_term_weight(term),
            })
        })
        .collect()
}

/// Open cursors carrying score bounds and block-max enumerators.
pub fn make_block_max_cursors<'a>(
    index: &'a InvertedIndex,
    wdata: &'a WandData,
    scorer: &ScorerKind,
    query: &Query,
) -> Vec<BlockMaxScoredCursor<'a>> {
    weighted_terms(index, scorer, query)
        .into_iter()
        .filter_map(|(term, q_weight)| {
            Some(BlockMaxScoredCursor {
                docs: index.open(term)?,
                scorer: scorer.term_scorer(wdata, term),
                q_weight,
                max_weight: q_weight * wdata.max_term_weight(term),
                w: wdata.block_max_cursor(term, index.max_doc_id())?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (InvertedIndex, WandData) {
        let index = InvertedIndex::from_postings(
            4,
            vec![vec![(0, 2), (2, 1), (3, 3)], vec![(1, 1), (2, 2)], vec![]],
        )
        .unwrap();
        let wdata = WandData::build(&index, &ScorerKind::TermFreq, 2);
        (index, wdata)
    }

    fn query(terms: Vec<u32>) -> Query {
        Query {
            id: None,
            terms,
            weights: Vec::new(),
        }
    }

    #[test]
    fn missing_and_empty_terms_are_skipped() {
        let (index, wdata) = fixture();
        let cursors =
            make_scored_cursors(&index, &wdata, &ScorerKind::TermFreq, &query(vec![0, 2, 9]));
        assert_eq!(cursors.len(), 1);
        assert_eq!(cursors[0].docs.doc_id(), 0);
    }

    #[test]
    fn duplicate_terms_fold_into_the_query_weight() {
        let (index, wdata) = fixture();
        let cursors =
            make_max_scored_cursors(&index, &wdata, &ScorerKind::TermFreq, &query(vec![1, 1, 0]));
        // Sorted by term: term 0 first with qtf 1, term 1 with qtf 2.
        assert_eq!(cursors[0].q_weight, 1.0);
        assert_eq!(cursors[1].q_weight, 2.0);
        assert_eq!(cursors[1].max_weight, 4.0);
    }

    #[test]
    fn explicit_weights_scale_the_query_weight() {
        let (index, wdata) = fixture();
        let q = Query {
            id: None,
            terms: vec![0, 1],
            weights: vec![0.5, 2.0],
        };
        let cursors = make_max_scored_cursors(&index, &wdata, &ScorerKind::TermFreq, &q);
        assert_eq!(cursors[0].q_weight, 0.5);
        assert_eq!(cursors[1].q_weight, 2.0);
    }

    #[test]
    fn block_max_cursors_bound_their_postings() {
        let (index, wdata) = fixture();
        let mut cursors =
            make_block_max_cursors(&index, &wdata, &ScorerKind::TermFreq, &query(vec![0]));
        let cursor = &mut cursors[0];
        while cursor.docs.doc_id() < index.max_doc_id() {
            cursor.w.next_geq(cursor.docs.doc_id());
            assert!(cursor.block_max() >= cursor.score_current());
            cursor.docs.next();
        }
    }
}
