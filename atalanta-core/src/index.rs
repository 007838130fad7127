//! Inverted frequency index with seekable posting cursors
//!
//! Storage is one posting list per term, each a strictly increasing sequence
//! of `(doc_id, term_freq)` pairs. The on-disk format is delta + varint
//! encoded (`vint`), little-endian framed.

use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Error, Result};
use crate::{DocId, TermFreq, TermId};

/// Magic prefix of the `vint` index format.
const INDEX_MAGIC: &[u8; 4] = b"ATA1";

/// A posting entry containing doc_id and term frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    pub doc_id: DocId,
    pub term_freq: TermFreq,
}

/// Inverted index over a document collection.
///
/// Lists are held in memory; `warmup` touches a term's postings so the first
/// timed traversal does not pay the fault cost.
#[derive(Debug, Clone)]
pub struct InvertedIndex {
    num_docs: u64,
    lists: Vec<Vec<Posting>>,
}

impl InvertedIndex {
    /// Build an index from per-term posting sequences.
    ///
    /// Validates that every list is strictly increasing in doc_id and that
    /// all doc_ids fall in `[0, num_docs)`.
    pub fn from_postings(num_docs: u64, postings: Vec<Vec<(DocId, TermFreq)>>) -> Result<Self> {
        if num_docs > u64::from(u32::MAX) {
            return Err(Error::Corruption(format!(
                "collection of {num_docs} documents exceeds the doc_id space"
            )));
        }
        let mut lists = Vec::with_capacity(postings.len());
        for (term, list) in postings.into_iter().enumerate() {
            let mut out = Vec::with_capacity(list.len());
            let mut prev: Option<DocId> = None;
            for (doc_id, term_freq) in list {
                if u64::from(doc_id) >= num_docs {
                    return Err(Error::Corruption(format!(
                        "term {term}: doc_id {doc_id} out of range"
                    )));
                }
                if prev.is_some_and(|p| p >= doc_id) {
                    return Err(Error::Corruption(format!(
                        "term {term}: doc_ids not strictly increasing at {doc_id}"
                    )));
                }
                prev = Some(doc_id);
                out.push(Posting { doc_id, term_freq });
            }
            lists.push(out);
        }
        Ok(Self { num_docs, lists })
    }

    pub fn num_docs(&self) -> u64 {
        self.num_docs
    }

    pub fn num_terms(&self) -> usize {
        self.lists.len()
    }

    /// Last doc_id + 1; cursors report this value once exhausted.
    pub fn max_doc_id(&self) -> DocId {
        self.num_docs as DocId
    }

    /// Open a cursor over a term's postings.
    ///
    /// Returns `None` for terms outside the lexicon or with empty lists.
    pub fn open(&self, term: TermId) -> Option<PostingCursor<'_>> {
        self.lists
            .get(term as usize)
            .filter(|list| !list.is_empty())
            .map(|list| PostingCursor::new(list, self.max_doc_id()))
    }

    /// Document frequency of a term (0 for unknown terms).
    pub fn doc_freq(&self, term: TermId) -> u64 {
        self.lists.get(term as usize).map_or(0, |l| l.len() as u64)
    }

    /// Touch a term's postings so later traversals run warm.
    pub fn warmup(&self, term: TermId) {
        if let Some(list) = self.lists.get(term as usize) {
            let mut checksum = 0u64;
            for posting in list {
                checksum = checksum.wrapping_add(u64::from(posting.doc_id));
                checksum = checksum.wrapping_add(u64::from(posting.term_freq));
            }
            std::hint::black_box(checksum);
        }
    }

    /// Per-document lengths (sum of frequencies over all terms).
    pub fn doc_lens(&self) -> Vec<u64> {
        let mut lens = vec![0u64; self.num_docs as usize];
        for list in &self.lists {
            for posting in list {
                lens[posting.doc_id as usize] += u64::from(posting.term_freq);
            }
        }
        lens
    }

    /// Serialize in the `vint` format.
    pub fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(INDEX_MAGIC)?;
        writer.write_u64::<LittleEndian>(self.num_docs)?;
        writer.write_u32::<LittleEndian>(self.lists.len() as u32)?;
        for list in &self.lists {
            write_vint(writer, list.len() as u64)?;
            let mut prev = 0u32;
            for posting in list {
                write_vint(writer, u64::from(posting.doc_id - prev))?;
                write_vint(writer, u64::from(posting.term_freq))?;
                prev = posting.doc_id;
            }
        }
        Ok(())
    }

    /// Deserialize from the `vint` format, re-validating list invariants.
    pub fn deserialize<R: Read>(reader: &mut R) -> Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != INDEX_MAGIC {
            return Err(Error::Corruption("bad index magic".into()));
        }
        let num_docs = reader.read_u64::<LittleEndian>()?;
        let num_terms = reader.read_u32::<LittleEndian>()? as usize;
        let mut postings = Vec::with_capacity(num_terms);
        for _ in 0..num_terms {
            let count = read_vint(reader)? as usize;
            let mut list = Vec::with_capacity(count);
            let mut doc_id = 0u32;
            let mut first = true;
            for _ in 0..count {
                let delta = read_vint(reader)? as u32;
                let term_freq = read_vint(reader)? as u32;
                if first {
                    doc_id = delta;
                    first = false;
                } else {
                    // A zero delta would repeat the previous doc_id.
                    if delta == 0 {
                        return Err(Error::Corruption("zero doc_id delta".into()));
                    }
                    doc_id = doc_id
                        .checked_add(delta)
                        .ok_or_else(|| Error::Corruption("doc_id delta overflow".into()))?;
                }
                list.push((doc_id, term_freq));
            }
            postings.push(list);
        }
        Self::from_postings(num_docs, postings)
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.serialize(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::deserialize(&mut reader)
    }
}

/// Cursor over one term's postings.
///
/// `doc_id()` is monotonically non-decreasing across `next`/`next_geq`; once
/// the list is exhausted it reports the collection size as sentinel.
#[derive(Debug, Clone)]
pub struct PostingCursor<'a> {
    postings: &'a [Posting],
    position: usize,
    max_doc_id: DocId,
}

impl<'a> PostingCursor<'a> {
    pub fn new(postings: &'a [Posting], max_doc_id: DocId) -> Self {
        Self {
            postings,
            position: 0,
            max_doc_id,
        }
    }

    /// Current doc_id, or the collection size once exhausted.
    #[inline]
    pub fn doc_id(&self) -> DocId {
        if self.position < self.postings.len() {
            self.postings[self.position].doc_id
        } else {
            self.max_doc_id
        }
    }

    /// Term frequency at the current position (0 at the sentinel).
    #[inline]
    pub fn freq(&self) -> TermFreq {
        if self.position < self.postings.len() {
            self.postings[self.position].term_freq
        } else {
            0
        }
    }

    /// Advance one posting.
    #[inline]
    pub fn next(&mut self) -> DocId {
        if self.position < self.postings.len() {
            self.position += 1;
        }
        self.doc_id()
    }

    /// Advance to the first posting with doc_id >= target.
    #[inline]
    pub fn next_geq(&mut self, target: DocId) -> DocId {
        if self.doc_id() < target {
            let rest = &self.postings[self.position..];
            self.position += rest.partition_point(|p| p.doc_id < target);
        }
        self.doc_id()
    }

    /// Number of postings in the underlying list.
    pub fn size(&self) -> usize {
        self.postings.len()
    }
}

fn write_vint<W: Write>(writer: &mut W, mut value: u64) -> io::Result<()> {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            writer.write_u8(byte)?;
            return Ok(());
        }
        writer.write_u8(byte | 0x80)?;
    }
}

fn read_vint<R: Read>(reader: &mut R) -> Result<u64> {
    let mut result = 0u64;
    let mut shift = 0;
    loop {
        let byte = reader.read_u8()?;
        result |= u64::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
        if shift >= 64 {
            return Err(Error::Corruption("varint too long".into()));
        }
    }
}
