//! TREC run-file emission

use std::io::Write;

use crate::error::{Error, Result};
use crate::lexicon::DocLexicon;
use crate::{DocId, Score};

/// Writes `qid  iteration  docno  rank  score  run_id` rows.
///
/// Rows are buffered per ranking and flushed once per query, not per row.
pub struct TrecWriter<W: Write> {
    out: W,
    iteration: String,
    run_id: String,
}

impl<W: Write> TrecWriter<W> {
    pub fn new(out: W, run_id: impl Into<String>) -> Self {
        Self {
            out,
            iteration: "Q0".to_string(),
            run_id: run_id.into(),
        }
    }

    /// Emit one query's ranking; ranks are 0-based.
    pub fn write_ranking(
        &mut self,
        qid: &str,
        results: &[(Score, DocId)],
        documents: &DocLexicon,
    ) -> Result<()> {
        for (rank, &(score, doc_id)) in results.iter().enumerate() {
            let docno = documents.get(doc_id).ok_or_else(|| {
                Error::Corruption(format!("doc_id {doc_id} missing from the document lexicon"))
            })?;
            writeln!(
                self.out,
                "{}\t{}\t{}\t{}\t{}\t{}",
                qid, self.iteration, docno, rank, score, self.run_id
            )?;
        }
        self.out.flush()?;
        Ok(())
    }
}
