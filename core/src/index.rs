use crate::lexer::{Lexer, Token};
use crate::{normalize_term, DocId, Posting, Term};
use std::collections::HashMap;

/// Marks the start of a new document.
pub const DOC_START: &[u8] = b"<DOC>";
/// The token after this marker is the document's primary key.
pub const PRIMARY_KEY: &[u8] = b"<DOCNO>";

const PROGRESS_EVERY: usize = 1000;

/// Which tokens count toward a document's length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocLengthPolicy {
    /// Only tokens that produce a posting.
    #[default]
    IndexedTokens,
    /// Every token after the document-start marker, tags included.
    AllTokens,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    pub length_policy: DocLengthPolicy,
}

/// The in-memory index as produced by [`IndexBuilder::finish`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct InvertedIndex {
    pub vocab: HashMap<Term, Vec<Posting>>, // postings sorted by doc_id
    pub doc_lengths: Vec<u32>,
    pub primary_keys: Vec<String>,
}

impl InvertedIndex {
    pub fn num_docs(&self) -> usize { self.doc_lengths.len() }

    pub fn postings(&self, term: &[u8]) -> Option<&[Posting]> {
        self.vocab.get(term).map(Vec::as_slice)
    }
}

#[derive(Debug)]
struct OpenDoc {
    id: DocId,
    length: u32,
    primary_key: Option<String>,
}

/// Single-pass builder. Tokens of one document must arrive contiguously,
/// which is what lets postings coalesce into (doc, tf) runs.
#[derive(Debug, Default)]
pub struct IndexBuilder {
    options: BuildOptions,
    vocab: HashMap<Term, Vec<Posting>>,
    doc_lengths: Vec<u32>,
    primary_keys: Vec<String>,
    current: Option<OpenDoc>,
    expect_primary_key: bool,
}

impl IndexBuilder {
    pub fn new(options: BuildOptions) -> Self {
        Self { options, ..Self::default() }
    }

    /// Number of documents started so far.
    pub fn documents(&self) -> usize {
        self.doc_lengths.len() + usize::from(self.current.is_some())
    }

    pub fn push_text(&mut self, text: &[u8]) {
        for token in Lexer::new(text) {
            self.push_token(&token);
        }
    }

    pub fn push_token(&mut self, token: &Token<'_>) {
        if token.bytes == DOC_START {
            self.start_document();
            return;
        }
        let Some(doc) = self.current.as_mut() else {
            tracing::debug!(token = %String::from_utf8_lossy(token.bytes), "ignoring token before first document");
            return;
        };
        if self.options.length_policy == DocLengthPolicy::AllTokens {
            doc.length += 1;
        }

        if self.expect_primary_key {
            self.expect_primary_key = false;
            if !token.is_tag() {
                if doc.primary_key.is_some() {
                    tracing::warn!(doc_id = doc.id, "ignoring repeated primary key");
                } else {
                    doc.primary_key = Some(String::from_utf8_lossy(token.bytes).into_owned());
                }
                return;
            }
        }

        if token.is_tag() {
            if token.bytes == PRIMARY_KEY {
                self.expect_primary_key = true;
            }
            return;
        }

        let doc_id = doc.id;
        if self.options.length_policy == DocLengthPolicy::IndexedTokens {
            doc.length += 1;
        }
        add_posting(self.vocab.entry(normalize_term(token.bytes)).or_default(), doc_id);
    }

    fn start_document(&mut self) {
        let next_id = match self.current.take() {
            Some(doc) => {
                let id = doc.id;
                self.finalize(doc);
                id + 1
            }
            None => self.doc_lengths.len() as DocId,
        };
        self.expect_primary_key = false;
        self.current = Some(OpenDoc { id: next_id, length: 0, primary_key: None });
        if next_id as usize % PROGRESS_EVERY == 0 {
            tracing::info!(documents = next_id, "documents indexed");
        }
    }

    fn finalize(&mut self, doc: OpenDoc) {
        self.doc_lengths.push(doc.length);
        let key = doc.primary_key.unwrap_or_else(|| {
            tracing::warn!(doc_id = doc.id, "document has no primary key, using its id");
            doc.id.to_string()
        });
        self.primary_keys.push(key);
    }

    /// Close the last document. Returns `None` when no document was seen.
    pub fn finish(mut self) -> Option<InvertedIndex> {
        let doc = self.current.take()?;
        self.finalize(doc);
        tracing::info!(documents = self.doc_lengths.len(), terms = self.vocab.len(), "parsing complete");
        Some(InvertedIndex { vocab: self.vocab, doc_lengths: self.doc_lengths, primary_keys: self.primary_keys })
    }
}

fn add_posting(list: &mut Vec<Posting>, doc_id: DocId) {
    match list.last_mut() {
        Some(last) if last.doc_id == doc_id => last.tf += 1,
        _ => list.push(Posting::new(doc_id, 1)),
    }
}
