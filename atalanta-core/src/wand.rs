//! Precomputed wand metadata: term score bounds and block maxima
//!
//! For every term the metadata holds the global upper bound of its score
//! contribution and a block-wise list of `(last_doc_id, block_max_score)`
//! pairs that a [`BlockMaxCursor`] enumerates in lock-step with the posting
//! cursor. Block maxima come in two layouts: raw `f32` values, and a
//! quantized variant that stores one byte per block as a fraction of the
//! term's global bound (rounded up, so bounds stay sound).
//!
//! Metadata is built offline from an index and a scorer and shipped as a
//! JSON file next to the index.

use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::index::InvertedIndex;
use crate::scorer::ScorerKind;
use crate::{DocId, Score, TermId};

/// Default number of postings covered by one block-max entry.
pub const BLOCK_SIZE: usize = 64;

/// Per-term collection statistics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TermStats {
    /// Document frequency.
    pub df: u64,
    /// Total occurrences across the collection.
    pub total_tf: u64,
    /// Global upper bound of the term's (unweighted) score.
    pub max_weight: Score,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TermBlocks {
    last_doc_ids: Vec<DocId>,
    maxima: Vec<Score>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TermQuantBlocks {
    last_doc_ids: Vec<DocId>,
    cells: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum BlockMaxStore {
    Raw(Vec<TermBlocks>),
    Quantized(Vec<TermQuantBlocks>),
}

/// Wand metadata for a whole collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WandData {
    num_docs: u64,
    collection_len: u64,
    avg_doc_len: f32,
    norm_lens: Vec<f32>,
    terms: Vec<TermStats>,
    blocks: BlockMaxStore,
}

impl WandData {
    /// Build metadata with raw `f32` block maxima.
    pub fn build(index: &InvertedIndex, scorer: &ScorerKind, block_size: usize) -> Self {
        Self::build_inner(index, scorer, block_size, false)
    }

    /// Build metadata with quantized (one byte per block) maxima.
    pub fn build_quantized(index: &InvertedIndex, scorer: &ScorerKind, block_size: usize) -> Self {
        Self::build_inner(index, scorer, block_size, true)
    }

    fn build_inner(
        index: &InvertedIndex,
        scorer: &ScorerKind,
        block_size: usize,
        quantize: bool,
    ) -> Self {
        assert!(block_size > 0, "block size must be positive");
        let num_docs = index.num_docs();
        let doc_lens = index.doc_lens();
        let collection_len: u64 = doc_lens.iter().sum();
        let avg_doc_len = if num_docs == 0 {
            0.0
        } else {
            collection_len as f32 / num_docs as f32
        };
        let norm_lens: Vec<f32> = doc_lens
            .iter()
            .map(|&len| {
                if avg_doc_len > 0.0 {
                    len as f32 / avg_doc_len
                } else {
                    0.0
                }
            })
            .collect();

        let mut terms = Vec::with_capacity(index.num_terms());
        let mut raw_blocks = Vec::with_capacity(index.num_terms());
        for term in 0..index.num_terms() as TermId {
            let df = index.doc_freq(term);
            let total_tf = index
                .open(term)
                .map(|mut cursor| {
                    let mut sum = 0u64;
                    while cursor.doc_id() < index.max_doc_id() {
                        sum += u64::from(cursor.freq());
                        cursor.next();
                    }
                    sum
                })
                .unwrap_or(0);

            let term_scorer = scorer.term_scorer_with(
                &norm_lens,
                avg_doc_len,
                num_docs,
                collection_len,
                df,
                total_tf,
            );

            let mut last_doc_ids = Vec::new();
            let mut maxima = Vec::new();
            let mut max_weight = 0.0f32;
            if let Some(mut cursor) = index.open(term) {
                let mut in_block = 0usize;
                let mut block_max = 0.0f32;
                let mut block_last = 0u32;
                while cursor.doc_id() < index.max_doc_id() {
                    let score = term_scorer.score(cursor.doc_id(), cursor.freq());
                    block_max = block_max.max(score);
                    block_last = cursor.doc_id();
                    in_block += 1;
                    if in_block == block_size {
                        last_doc_ids.push(block_last);
                        maxima.push(block_max);
                        max_weight = max_weight.max(block_max);
                        in_block = 0;
                        block_max = 0.0;
                    }
                    cursor.next();
                }
                if in_block > 0 {
                    last_doc_ids.push(block_last);
                    maxima.push(block_max);
                    max_weight = max_weight.max(block_max);
                }
            }

            terms.push(TermStats {
                df,
                total_tf,
                max_weight,
            });
            raw_blocks.push(TermBlocks {
                last_doc_ids,
                maxima,
            });
        }

        let blocks = if quantize {
            BlockMaxStore::Quantized(
                raw_blocks
                    .into_iter()
                    .zip(&terms)
                    .map(|(blocks, stats)| TermQuantBlocks {
                        cells: blocks
                            .maxima
                            .iter()
                            .map(|&m| quantize_cell(m, stats.max_weight))
                            .collect(),
                        last_doc_ids: blocks.last_doc_ids,
                    })
                    .collect(),
            )
        } else {
            BlockMaxStore::Raw(raw_blocks)
        };

        Self {
            num_docs,
            collection_len,
            avg_doc_len,
            norm_lens,
            terms,
            blocks,
        }
    }

    pub fn num_docs(&self) -> u64 {
        self.num_docs
    }

    pub fn collection_len(&self) -> u64 {
        self.collection_len
    }

    pub fn avg_doc_len(&self) -> f32 {
        self.avg_doc_len
    }

    pub fn norm_lens(&self) -> &[f32] {
        &self.norm_lens
    }

    /// Normalized length of a document (length / average length).
    pub fn norm_len(&self, doc_id: DocId) -> f32 {
        self.norm_lens[doc_id as usize]
    }

    pub fn term_stats(&self, term: TermId) -> Option<&TermStats> {
        self.terms.get(term as usize)
    }

    /// Global score upper bound of a term (0 for unknown terms).
    pub fn max_term_weight(&self, term: TermId) -> Score {
        self.terms.get(term as usize).map_or(0.0, |s| s.max_weight)
    }

    pub fn is_quantized(&self) -> bool {
        matches!(self.blocks, BlockMaxStore::Quantized(_))
    }

    /// Open the block-max enumerator of a term.
    pub fn block_max_cursor(&self, term: TermId, max_doc_id: DocId) -> Option<BlockMaxCursor<'_>> {
        match &self.blocks {
            BlockMaxStore::Raw(all) => all.get(term as usize).map(|blocks| BlockMaxCursor {
                last_doc_ids: &blocks.last_doc_ids,
                scores: BlockScores::Raw(&blocks.maxima),
                position: 0,
                max_doc_id,
            }),
            BlockMaxStore::Quantized(all) => all.get(term as usize).map(|blocks| BlockMaxCursor {
                last_doc_ids: &blocks.last_doc_ids,
                scores: BlockScores::Quantized {
                    cells: &blocks.cells,
                    scale: self.max_term_weight(term) / 255.0,
                },
                position: 0,
                max_doc_id,
            }),
        }
    }

    pub fn to_json_writer<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer(writer, self).map_err(|e| Error::Serialization(e.to_string()))
    }

    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self> {
        serde_json::from_reader(reader).map_err(|e| Error::Serialization(e.to_string()))
    }

    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.to_json_writer(BufWriter::new(file))
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_json_reader(BufReader::new(file))
    }
}

/// Quantize a block maximum as a fraction of the term bound, rounding up.
fn quantize_cell(block_max: Score, term_max: Score) -> u8 {
    if term_max <= 0.0 || block_max <= 0.0 {
        return 0;
    }
    let mut cell = ((block_max / term_max) * 255.0).ceil().min(255.0) as u8;
    // Float rounding on the way back must not undershoot the exact maximum.
    while f32::from(cell) * (term_max / 255.0) < block_max && cell < u8::MAX {
        cell += 1;
    }
    cell
}

#[derive(Debug, Clone, Copy)]
enum BlockScores<'a> {
    Raw(&'a [Score]),
    Quantized { cells: &'a [u8], scale: f32 },
}

/// Enumerator over a term's block maxima.
///
/// `doc_id()` is the last document covered by the current block; `score()`
/// bounds the term's (unweighted) score for every document in the block.
#[derive(Debug, Clone)]
pub struct BlockMaxCursor<'a> {
    last_doc_ids: &'a [DocId],
    scores: BlockScores<'a>,
    position: usize,
    max_doc_id: DocId,
}

impl BlockMaxCursor<'_> {
    /// Last doc_id covered by the current block, sentinel past the end.
    #[inline]
    pub fn doc_id(&self) -> DocId {
        if self.position < self.last_doc_ids.len() {
            self.last_doc_ids[self.position]
        } else {
            self.max_doc_id
        }
    }

    /// Score upper bound of the current block (0 past the end).
    #[inline]
    pub fn score(&self) -> Score {
        if self.position >= self.last_doc_ids.len() {
            return 0.0;
        }
        match self.scores {
            BlockScores::Raw(maxima) => maxima[self.position],
            BlockScores::Quantized { cells, scale } => f32::from(cells[self.position]) * scale,
        }
    }

    #[inline]
    pub fn next(&mut self) -> DocId {
        if self.position < self.last_doc_ids.len() {
            self.position += 1;
        }
        self.doc_id()
    }

    /// Advance to the block containing the first doc_id >= target.
    #[inline]
    pub fn next_geq(&mut self, target: DocId) -> DocId {
        if self.doc_id() < target {
            let rest = &self.last_doc_ids[self.position..];
            self.position += rest.partition_point(|&last| last < target);
        }
        self.doc_id()
    }
}
