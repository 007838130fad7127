//! Atalanta - a ranked retrieval core for frequency indexes
//!
//! This library evaluates top-k ranked queries over an inverted frequency
//! index using a family of dynamic-pruning algorithms:
//! - Exhaustive baselines: ranked-OR (DAAT), ranked-AND, ranked-OR (TAAT)
//! - MaxScore and Block-Max MaxScore
//! - WAND and Block-Max WAND
//!
//! On top of single-query evaluation it provides a parallel multi-query
//! fusion driver: the variants of a multi-query run on a thread pool, their
//! per-variant top-k lists are CombSUM-fused into one ranking. An alternative
//! SP-CS driver collapses the variants into a single concatenated query.
//!
//! The library consumes an already-built index, precomputed per-term wand
//! metadata (score upper bounds plus block maxima), a scorer, and a stream of
//! textual queries; it produces TREC-format rankings.

pub mod error;
pub mod fusion;
pub mod index;
pub mod lexicon;
pub mod query;
pub mod scorer;
pub mod timing;
pub mod trec;
pub mod wand;

pub use error::{Error, Result};
pub use index::{InvertedIndex, PostingCursor};
pub use lexicon::{DocLexicon, TermProcessor};
pub use query::algorithm::{evaluate, Algorithm};
pub use query::cursor::{
    make_block_max_cursors, make_max_scored_cursors, make_scored_cursors, BlockMaxScoredCursor,
    MaxScoredCursor, ScoredCursor,
};
pub use query::topk::TopKQueue;
pub use query::{generate_multi_queries, MultiQuery, Query};
pub use scorer::{ScorerKind, TermScorer};
pub use wand::{BlockMaxCursor, WandData};

pub type DocId = u32;
pub type TermId = u32;
pub type TermFreq = u32;
pub type Score = f32;
