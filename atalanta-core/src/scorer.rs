//! Scoring models and per-term scorer values
//!
//! A scorer turns a term into a small copyable [`TermScorer`] that maps
//! `(doc_id, freq)` to a score. Term scorers borrow the collection statistics
//! they need (normalized document lengths) and carry the per-term constants
//! by value, so the hot loop never allocates or dispatches through a vtable.

use crate::error::{Error, Result};
use crate::wand::WandData;
use crate::{DocId, Score, TermFreq, TermId};

/// BM25 parameters tuned for retrieval evaluation runs.
pub const BM25_K1: f32 = 0.9;
pub const BM25_B: f32 = 0.4;

/// Dirichlet smoothing parameter for query-likelihood scoring.
pub const QLD_MU: f32 = 1000.0;

/// Scoring model, selectable by name.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScorerKind {
    Bm25 { k1: f32, b: f32 },
    Qld { mu: f32 },
    /// Identity scorer: the score of a posting is its frequency. Useful for
    /// impact-ordered indexes whose frequencies already are quantized scores.
    TermFreq,
}

impl ScorerKind {
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "bm25" => Ok(Self::Bm25 {
                k1: BM25_K1,
                b: BM25_B,
            }),
            "qld" => Ok(Self::Qld { mu: QLD_MU }),
            "tf" => Ok(Self::TermFreq),
            other => Err(Error::UnknownScorer(other.to_string())),
        }
    }

    /// Build the scorer value for one term.
    pub fn term_scorer<'w>(&self, wdata: &'w WandData, term: TermId) -> TermScorer<'w> {
        let stats = wdata.term_stats(term);
        self.term_scorer_with(
            wdata.norm_lens(),
            wdata.avg_doc_len(),
            wdata.num_docs(),
            wdata.collection_len(),
            stats.map_or(0, |s| s.df),
            stats.map_or(0, |s| s.total_tf),
        )
    }

    pub(crate) fn term_scorer_with<'w>(
        &self,
        norm_lens: &'w [f32],
        avg_doc_len: f32,
        num_docs: u64,
        collection_len: u64,
        df: u64,
        total_tf: u64,
    ) -> TermScorer<'w> {
        match *self {
            Self::Bm25 { k1, b } => TermScorer::Bm25 {
                idf: bm25_idf(df as f32, num_docs as f32),
                k1,
                b,
                norm_lens,
            },
            Self::Qld { mu } => TermScorer::Qld {
                mu,
                collection_prob: if collection_len == 0 {
                    0.0
                } else {
                    total_tf as f32 / collection_len as f32
                },
                avg_doc_len,
                norm_lens,
            },
            Self::TermFreq => TermScorer::TermFreq,
        }
    }

    /// Weight of one query term given its query-term frequency.
    ///
    /// All shipped models fold term statistics into the term scorer, so the
    /// query-side weight is the plain occurrence count.
    pub fn query_term_weight(&self, qtf: u32, _df: u64, _num_docs: u64) -> f32 {
        qtf as f32
    }
}

/// Per-term scoring value bound to collection statistics.
#[derive(Debug, Clone, Copy)]
pub enum TermScorer<'w> {
    Bm25 {
        idf: f32,
        k1: f32,
        b: f32,
        norm_lens: &'w [f32],
    },
    Qld {
        mu: f32,
        collection_prob: f32,
        avg_doc_len: f32,
        norm_lens: &'w [f32],
    },
    TermFreq,
}

impl TermScorer<'_> {
    /// Score the given posting. `doc_id` must address a live document.
    #[inline]
    pub fn score(&self, doc_id: DocId, freq: TermFreq) -> Score {
        match *self {
            Self::Bm25 {
                idf,
                k1,
                b,
                norm_lens,
            } => {
                let tf = freq as f32;
                let norm = 1.0 - b + b * norm_lens[doc_id as usize];
                idf * (tf * (k1 + 1.0)) / (tf + k1 * norm)
            }
            Self::Qld {
                mu,
                collection_prob,
                avg_doc_len,
                norm_lens,
            } => {
                if collection_prob <= 0.0 {
                    return 0.0;
                }
                let doc_len = norm_lens[doc_id as usize] * avg_doc_len;
                let score =
                    (1.0 + freq as f32 / (mu * collection_prob)).ln() + (mu / (doc_len + mu)).ln();
                score.max(0.0)
            }
            Self::TermFreq => freq as f32,
        }
    }
}

/// Lucene-style BM25 idf; always positive, saturating for rare terms.
#[inline]
pub fn bm25_idf(doc_freq: f32, total_docs: f32) -> f32 {
    ((total_docs - doc_freq + 0.5) / (doc_freq + 0.5) + 1.0).ln()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rare_terms_score_higher_under_bm25() {
        let norm_lens = vec![1.0_f32; 4];
        let scorer = ScorerKind::from_name("bm25").unwrap();
        let rare = scorer.term_scorer_with(&norm_lens, 10.0, 1000, 10_000, 5, 20);
        let common = scorer.term_scorer_with(&norm_lens, 10.0, 1000, 10_000, 500, 2000);

        assert!(rare.score(0, 3) > common.score(0, 3));
    }

    #[test]
    fn bm25_saturates_in_term_frequency() {
        let norm_lens = vec![1.0_f32; 1];
        let scorer = ScorerKind::Bm25 {
            k1: BM25_K1,
            b: BM25_B,
        }
        .term_scorer_with(&norm_lens, 10.0, 100, 1000, 10, 50);

        let s1 = scorer.score(0, 1);
        let s5 = scorer.score(0, 5);
        let s50 = scorer.score(0, 50);
        assert!(s5 > s1);
        // Gains diminish with frequency.
        assert!(s50 - s5 < (s5 - s1) * 5.0);
    }

    #[test]
    fn tf_scorer_is_the_identity_on_frequency() {
        let scorer = ScorerKind::from_name("tf").unwrap();
        let ts = scorer.term_scorer_with(&[], 0.0, 0, 0, 0, 0);
        assert_eq!(ts.score(3, 7), 7.0);
    }

    #[test]
    fn qld_scores_are_non_negative() {
        let norm_lens = vec![2.5_f32; 2];
        let ts = ScorerKind::Qld { mu: QLD_MU }.term_scorer_with(&norm_lens, 100.0, 2, 500, 1, 1);
        assert!(ts.score(0, 1) >= 0.0);
    }

    #[test]
    fn unknown_scorer_name_is_rejected() {
        assert!(matches!(
            ScorerKind::from_name("pagerank"),
            Err(Error::UnknownScorer(_))
        ));
    }
}
