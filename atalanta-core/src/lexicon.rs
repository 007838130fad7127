//! Document and term lexicons, and the query-side term processor
//!
//! Lexicons are plain UTF-8 line files: line `n` holds the surface form of
//! id `n`. The term processor maps raw query tokens to term ids (lowercase,
//! optional stemming, stopword removal) for terms-mode query parsing.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{Error, Result};
use crate::{DocId, TermId};

/// Maps internal doc_ids to external (collection) document names.
#[derive(Debug, Clone)]
pub struct DocLexicon {
    names: Vec<String>,
}

impl DocLexicon {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Load from a line file, one document name per line.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let names = reader.lines().collect::<std::io::Result<Vec<_>>>()?;
        Ok(Self::new(names))
    }

    pub fn get(&self, doc_id: DocId) -> Option<&str> {
        self.names.get(doc_id as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Resolves surface tokens to term ids for terms-mode query parsing.
///
/// Tokens are lowercased and optionally stemmed before lookup; stopwords are
/// resolved through the same pipeline into a set of ids.
pub struct TermProcessor {
    term_ids: FxHashMap<String, TermId>,
    stopwords: FxHashSet<TermId>,
    stemmer: Option<rust_stemmers::Stemmer>,
}

impl TermProcessor {
    pub fn from_files<P: AsRef<Path>>(
        terms_path: P,
        stopwords_path: Option<P>,
        stemmer_name: Option<&str>,
    ) -> Result<Self> {
        let reader = BufReader::new(File::open(terms_path)?);
        let mut term_ids = FxHashMap::default();
        for (id, line) in reader.lines().enumerate() {
            term_ids.insert(line?, id as TermId);
        }
        let stemmer = stemmer_name.map(resolve_stemmer).transpose()?;

        let mut processor = Self {
            term_ids,
            stopwords: FxHashSet::default(),
            stemmer,
        };
        if let Some(path) = stopwords_path {
            let reader = BufReader::new(File::open(path)?);
            for line in reader.lines() {
                if let Some(id) = processor.resolve(line?.trim()) {
                    processor.stopwords.insert(id);
                }
            }
        }
        Ok(processor)
    }

    #[cfg(test)]
    pub(crate) fn from_parts(
        terms: &[&str],
        stopwords: &[&str],
        stemmer_name: Option<&str>,
    ) -> Result<Self> {
        let term_ids = terms
            .iter()
            .enumerate()
            .map(|(id, t)| (t.to_string(), id as TermId))
            .collect();
        let mut processor = Self {
            term_ids,
            stopwords: FxHashSet::default(),
            stemmer: stemmer_name.map(resolve_stemmer).transpose()?,
        };
        let resolved = stopwords.iter().filter_map(|w| processor.resolve(w)).collect();
        processor.stopwords = resolved;
        Ok(processor)
    }

    /// Map a raw token to its term id, if present in the lexicon.
    pub fn resolve(&self, token: &str) -> Option<TermId> {
        let lowered = token.to_lowercase();
        let processed = match &self.stemmer {
            Some(stemmer) => stemmer.stem(&lowered).into_owned(),
            None => lowered,
        };
        self.term_ids.get(&processed).copied()
    }

    pub fn is_stopword(&self, term: TermId) -> bool {
        self.stopwords.contains(&term)
    }
}

fn resolve_stemmer(name: &str) -> Result<rust_stemmers::Stemmer> {
    let algorithm = match name {
        "porter2" | "english" => rust_stemmers::Algorithm::English,
        other => return Err(Error::UnknownStemmer(other.to_string())),
    };
    Ok(rust_stemmers::Stemmer::create(algorithm))
}

/// Split a raw query string into alphanumeric tokens.
pub fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn doc_lexicon_maps_ids_to_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("documents.txt");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "GX000-00-0000000").unwrap();
        writeln!(file, "GX000-00-0000001").unwrap();

        let lexicon = DocLexicon::from_file(&path).unwrap();
        assert_eq!(lexicon.len(), 2);
        assert_eq!(lexicon.get(1), Some("GX000-00-0000001"));
        assert_eq!(lexicon.get(2), None);
    }

    #[test]
    fn processor_lowercases_and_stems() {
        let processor =
            TermProcessor::from_parts(&["run", "fox"], &[], Some("porter2")).unwrap();
        assert_eq!(processor.resolve("Running"), Some(0));
        assert_eq!(processor.resolve("FOXES"), Some(1));
        assert_eq!(processor.resolve("badger"), None);
    }

    #[test]
    fn stopwords_pass_through_the_same_pipeline() {
        let processor =
            TermProcessor::from_parts(&["the", "fox"], &["The"], None).unwrap();
        assert!(processor.is_stopword(0));
        assert!(!processor.is_stopword(1));
    }

    #[test]
    fn unknown_stemmer_is_rejected() {
        assert!(matches!(
            TermProcessor::from_parts(&[], &[], Some("krovetz")),
            Err(Error::UnknownStemmer(_))
        ));
    }

    #[test]
    fn tokenizer_splits_on_punctuation() {
        let tokens: Vec<_> = tokenize("foo, bar-baz  qux!").collect();
        assert_eq!(tokens, vec!["foo", "bar", "baz", "qux"]);
    }
}
