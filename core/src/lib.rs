//! Inverted index construction and BM25 retrieval over TREC-style tagged
//! document collections.
//!
//! The builder and the searcher share a flat binary layout on disk, see
//! [`persist`] for the byte format.

pub mod error;
pub mod index;
pub mod inspect;
pub mod lexer;
pub mod persist;
pub mod rank;
pub mod search;

pub use error::{IndexError, Result};
pub use index::{BuildOptions, DocLengthPolicy, IndexBuilder, InvertedIndex};
pub use persist::{IndexPaths, LoadedIndex, VocabEntry};
pub use rank::{Hit, TrecWriter};
pub use search::{Bm25Params, Query, Searcher};

pub type DocId = u32;
pub type TermFrequency = u32;
/// A case-folded token, at most [`MAX_TERM_LEN`] bytes.
pub type Term = Vec<u8>;

/// Terms are truncated to this many bytes so the length fits the one-byte
/// prefix of a vocabulary record.
pub const MAX_TERM_LEN: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    pub doc_id: DocId,
    pub tf: TermFrequency,
}

impl Posting {
    pub fn new(doc_id: DocId, tf: TermFrequency) -> Self { Self { doc_id, tf } }
}

/// Case-fold and truncate a raw word token into an index term.
pub fn normalize_term(raw: &[u8]) -> Term {
    let mut term = raw[..raw.len().min(MAX_TERM_LEN)].to_vec();
    term.make_ascii_lowercase();
    term
}
