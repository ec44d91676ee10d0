use crate::error::{IndexError, Result};
use crate::lexer::Lexer;
use crate::persist::{load_index, read_postings, IndexPaths, LoadedIndex};
use crate::rank::{top_k, Hit};
use crate::{normalize_term, DocId, Term};
use std::fs::File;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Params {
    /// Term-frequency saturation.
    pub k1: f64,
    /// Length-normalization strength.
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self { Self { k1: 0.9, b: 0.4 } }
}

/// BM25 contribution of one term to one document.
#[inline]
pub fn bm25_weight(idf: f64, tf: f64, doc_len: f64, avgdl: f64, params: Bm25Params) -> f64 {
    let Bm25Params { k1, b } = params;
    idf * (tf * (k1 + 1.0)) / (tf + k1 * (1.0 - b + b * (doc_len / avgdl)))
}

/// A parsed query line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub id: String,
    pub terms: Vec<Term>,
}

impl Query {
    pub const DEFAULT_ID: &'static str = "0";

    /// Tokenize a line with the indexing rules. A leading all-digit token is
    /// taken as the query id rather than searched for.
    pub fn parse(line: &[u8]) -> Self {
        let mut words = Lexer::new(line).filter(|t| !t.is_tag()).peekable();
        let id = match words.peek() {
            Some(t) if t.bytes.iter().all(u8::is_ascii_digit) => Some(String::from_utf8_lossy(t.bytes).into_owned()),
            _ => None,
        };
        let id = match id {
            Some(id) => {
                words.next();
                id
            }
            None => Self::DEFAULT_ID.to_string(),
        };
        let terms = words.map(|t| normalize_term(t.bytes)).collect();
        Self { id, terms }
    }

    pub fn is_empty(&self) -> bool { self.terms.is_empty() }
}

/// Scores queries against an index on disk. The postings file stays open for
/// the searcher's lifetime and lists are re-read for every query term.
#[derive(Debug)]
pub struct Searcher {
    index: LoadedIndex,
    postings: File,
    avgdl: f64,
    params: Bm25Params,
    accumulator: Vec<f64>,
}

impl Searcher {
    pub fn open(paths: &IndexPaths, params: Bm25Params) -> Result<Self> {
        let index = load_index(paths)?;
        let postings = File::open(paths.postings()).map_err(|e| IndexError::io(paths.postings(), e))?;
        let avgdl = average_length(&index.doc_lengths);
        let accumulator = vec![0.0; index.num_docs()];
        tracing::debug!(documents = index.num_docs(), avgdl, "searcher ready");
        Ok(Self { index, postings, avgdl, params, accumulator })
    }

    pub fn num_docs(&self) -> usize { self.index.num_docs() }

    pub fn average_doc_length(&self) -> f64 { self.avgdl }

    pub fn primary_keys(&self) -> &[String] { &self.index.primary_keys }

    pub fn primary_key(&self, doc_id: DocId) -> Option<&str> {
        self.index.primary_keys.get(doc_id as usize).map(String::as_str)
    }

    /// Accumulate BM25 scores for `query`, one slot per document.
    pub fn score(&mut self, query: &Query) -> Result<&[f64]> {
        self.accumulator.fill(0.0);
        let n_docs = self.index.num_docs();
        for term in &query.terms {
            let Some(&entry) = self.index.vocab.get(term) else { continue };
            if entry.size == 0 {
                continue;
            }
            let list = read_postings(&mut self.postings, entry, n_docs)?;
            let df = list.len();
            // idf = ln(N/N) = 0, the term cannot discriminate
            if df == n_docs {
                tracing::debug!(term = %String::from_utf8_lossy(term), "term occurs in every document, skipped");
                continue;
            }
            let idf = (n_docs as f64 / df as f64).ln();
            for p in list {
                let len = self.index.doc_lengths[p.doc_id as usize] as f64;
                self.accumulator[p.doc_id as usize] += bm25_weight(idf, p.tf as f64, len, self.avgdl, self.params);
            }
        }
        Ok(&self.accumulator)
    }

    /// Score and rank, returning at most `limit` hits.
    pub fn search(&mut self, query: &Query, limit: usize) -> Result<Vec<Hit>> {
        let scores = self.score(query)?;
        Ok(top_k(scores, limit))
    }
}

fn average_length(lengths: &[u32]) -> f64 {
    if lengths.is_empty() {
        return 0.0;
    }
    lengths.iter().map(|&l| l as f64).sum::<f64>() / lengths.len() as f64
}
