//! Query model, parsers, multi-query grouping and evaluation algorithms

pub mod accumulator;
pub mod algorithm;
pub mod cursor;
pub mod topk;

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::lexicon::{tokenize, TermProcessor};
use crate::TermId;

/// A single ranked query: optional id plus a sequence of term ids.
///
/// `terms` may repeat a term; the repeat count is the query-term frequency.
/// `weights`, when non-empty, carries one multiplier per deduplicated term.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub id: Option<String>,
    pub terms: Vec<TermId>,
    pub weights: Vec<f32>,
}

/// Query variants sharing one id, evaluated independently and fused.
pub type MultiQuery = Vec<Query>;

/// Split a raw query line at the first colon into `(id, rest)`.
pub fn split_query_at_colon(line: &str) -> (Option<String>, &str) {
    match line.split_once(':') {
        Some((id, rest)) => (Some(id.to_string()), rest),
        None => (None, line),
    }
}

/// Parse a query line of decimal term ids (ids mode).
///
/// Tokens are separated by whitespace or commas; a non-integer token is
/// fatal.
pub fn parse_query_ids(line: &str) -> Result<Query> {
    let (id, raw_query) = split_query_at_colon(line);
    let mut terms = Vec::new();
    for token in raw_query
        .split([' ', '\t', ',', '\u{b}', '\u{c}', '\r', '\n'])
        .filter(|t| !t.is_empty())
    {
        let term = token
            .parse::<TermId>()
            .map_err(|_| Error::QueryParse(raw_query.to_string()))?;
        terms.push(term);
    }
    Ok(Query {
        id,
        terms,
        weights: Vec::new(),
    })
}

/// Parse a query line of surface words (terms mode).
///
/// Unknown terms and stopwords are dropped with a warning; the query may end
/// up empty.
pub fn parse_query_terms(line: &str, processor: &TermProcessor) -> Query {
    let (id, raw_query) = split_query_at_colon(line);
    let mut terms = Vec::new();
    for token in tokenize(raw_query) {
        match processor.resolve(token) {
            Some(term) if processor.is_stopword(term) => {
                warn!("term `{token}` is a stopword and will be ignored");
            }
            Some(term) => terms.push(term),
            None => warn!("term `{token}` not found and will be ignored"),
        }
    }
    Query {
        id,
        terms,
        weights: Vec::new(),
    }
}

/// Format a query back into its line form (`id:t1 t2 ...`).
pub fn format_query(query: &Query) -> String {
    let terms = query
        .terms
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    match &query.id {
        Some(id) => format!("{id}:{terms}"),
        None => terms,
    }
}

/// Sort and deduplicate a term sequence in place.
pub fn remove_duplicate_terms(terms: &mut Vec<TermId>) {
    terms.sort_unstable();
    terms.dedup();
}

/// Deduplicated `(term, query_term_frequency)` pairs, sorted by term.
pub fn query_freqs(terms: &[TermId]) -> Vec<(TermId, u32)> {
    let mut sorted = terms.to_vec();
    sorted.sort_unstable();
    let mut freqs: Vec<(TermId, u32)> = Vec::new();
    for term in sorted {
        match freqs.last_mut() {
            Some((last, count)) if *last == term => *count += 1,
            _ => freqs.push((term, 1)),
        }
    }
    freqs
}

/// Group queries sharing an id into multi-queries, ordered by id.
///
/// Every query must carry an id; each variant's term list is deduplicated so
/// variants contribute unique terms.
pub fn generate_multi_queries(queries: Vec<Query>) -> Result<Vec<MultiQuery>> {
    let mut grouped: BTreeMap<String, MultiQuery> = BTreeMap::new();
    for mut query in queries {
        let id = match query.id.as_deref() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => return Err(Error::MissingQueryId),
        };
        remove_duplicate_terms(&mut query.terms);
        grouped.entry(id).or_default().push(query);
    }
    let multi_queries: Vec<MultiQuery> = grouped.into_values().collect();
    info!("read {} multi queries", multi_queries.len());
    Ok(multi_queries)
}

/// Collapse a multi-query into one query by term concatenation (SP-CS).
///
/// Terms are not deduplicated across variants: a term shared by several
/// variants accumulates query-term frequency.
pub fn multi_query_to_spcs(multi_query: &MultiQuery) -> Query {
    let mut flat = Query {
        id: multi_query.first().and_then(|q| q.id.clone()),
        ..Query::default()
    };
    for query in multi_query {
        flat.terms.extend_from_slice(&query.terms);
    }
    flat
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ids_with_mixed_separators() {
        let query = parse_query_ids("42:10 11,12\t13").unwrap();
        assert_eq!(query.id.as_deref(), Some("42"));
        assert_eq!(query.terms, vec![10, 11, 12, 13]);
        assert!(query.weights.is_empty());
    }

    #[test]
    fn parses_ids_without_id_prefix() {
        let query = parse_query_ids("7 7 9").unwrap();
        assert_eq!(query.id, None);
        assert_eq!(query.terms, vec![7, 7, 9]);
    }

    #[test]
    fn rejects_non_integer_tokens_in_ids_mode() {
        assert!(matches!(
            parse_query_ids("1:10 eleven"),
            Err(Error::QueryParse(_))
        ));
    }

    #[test]
    fn parse_format_roundtrip() {
        for line in ["3:1 2 2 9", "5 6"] {
            let query = parse_query_ids(line).unwrap();
            assert_eq!(parse_query_ids(&format_query(&query)).unwrap(), query);
        }
    }

    #[test]
    fn terms_mode_drops_stopwords_and_unknowns() {
        let processor = TermProcessor::from_parts(&["the", "fox", "dog"], &["the"], None).unwrap();
        let query = parse_query_terms("9:the quick Fox", &processor);
        assert_eq!(query.id.as_deref(), Some("9"));
        assert_eq!(query.terms, vec![1]);
    }

    #[test]
    fn query_freqs_counts_duplicates() {
        assert_eq!(query_freqs(&[4, 2, 4, 4, 2, 7]), vec![(2, 2), (4, 3), (7, 1)]);
    }

    #[test]
    fn grouping_requires_ids_on_every_query() {
        let queries = vec![
            Query {
                id: Some("a".into()),
                terms: vec![1],
                weights: Vec::new(),
            },
            Query {
                id: None,
                terms: vec![2],
                weights: Vec::new(),
            },
        ];
        assert!(matches!(
            generate_multi_queries(queries),
            Err(Error::MissingQueryId)
        ));
    }

    #[test]
    fn grouping_orders_by_id_and_dedups_variant_terms() {
        let q = |id: &str, terms: Vec<TermId>| Query {
            id: Some(id.into()),
            terms,
            weights: Vec::new(),
        };
        let grouped =
            generate_multi_queries(vec![q("b", vec![3, 1, 3]), q("a", vec![2]), q("b", vec![5])])
                .unwrap();

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0][0].id.as_deref(), Some("a"));
        assert_eq!(grouped[1].len(), 2);
        assert_eq!(grouped[1][0].terms, vec![1, 3]);
    }

    #[test]
    fn spcs_concatenates_without_dedup() {
        let multi = vec![
            Query {
                id: Some("q".into()),
                terms: vec![1, 2],
                weights: Vec::new(),
            },
            Query {
                id: Some("q".into()),
                terms: vec![2, 3],
                weights: Vec::new(),
            },
        ];
        let flat = multi_query_to_spcs(&multi);
        assert_eq!(flat.id.as_deref(), Some("q"));
        // Term 2 keeps both occurrences: its query-term frequency becomes 2.
        assert_eq!(flat.terms, vec![1, 2, 2, 3]);
    }
}
