//! Read-only views over a built index and its source collection.

use crate::index::{DOC_START, PRIMARY_KEY};
use crate::lexer::Lexer;
use crate::persist::LoadedIndex;
use serde::Serialize;

const DOC_END: &[u8] = b"</DOC>";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexStats {
    pub documents: usize,
    pub average_length: f64,
    pub shortest: u32,
    pub longest: u32,
    pub terms: usize,
    /// Term with the longest postings list, ties to the smaller term.
    pub most_common_term: Option<String>,
    pub most_common_postings: usize,
}

impl IndexStats {
    pub fn compute(index: &LoadedIndex) -> Self {
        let lengths = &index.doc_lengths;
        let total: u64 = lengths.iter().map(|&l| u64::from(l)).sum();
        let average_length = if lengths.is_empty() { 0.0 } else { total as f64 / lengths.len() as f64 };
        let most_common = index
            .vocab
            .iter()
            .max_by(|(ta, a), (tb, b)| a.size.cmp(&b.size).then_with(|| tb.cmp(ta)));
        Self {
            documents: lengths.len(),
            average_length,
            shortest: lengths.iter().copied().min().unwrap_or(0),
            longest: lengths.iter().copied().max().unwrap_or(0),
            terms: index.vocab.len(),
            most_common_term: most_common.map(|(t, _)| String::from_utf8_lossy(t).into_owned()),
            most_common_postings: most_common.map_or(0, |(_, e)| e.postings()),
        }
    }
}

/// Differences between two vocabularies, compared by postings size.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct VocabDiff {
    pub only_in_a: Vec<String>,
    pub only_in_b: Vec<String>,
    /// (term, size in a, size in b), sizes in bytes.
    pub differing: Vec<(String, u32, u32)>,
}

impl VocabDiff {
    pub fn compute(a: &LoadedIndex, b: &LoadedIndex) -> Self {
        let name = |t: &[u8]| String::from_utf8_lossy(t).into_owned();
        let mut diff = VocabDiff::default();
        for (term, ea) in &a.vocab {
            match b.vocab.get(term) {
                None => diff.only_in_a.push(name(term)),
                Some(eb) if eb.size != ea.size => diff.differing.push((name(term), ea.size, eb.size)),
                Some(_) => {}
            }
        }
        diff.only_in_b = b.vocab.keys().filter(|t| !a.vocab.contains_key(*t)).map(|t| name(t)).collect();
        diff.only_in_a.sort();
        diff.only_in_b.sort();
        diff.differing.sort();
        diff
    }

    pub fn is_empty(&self) -> bool {
        self.only_in_a.is_empty() && self.only_in_b.is_empty() && self.differing.is_empty()
    }
}

/// Locate the `<DOC>..</DOC>` block whose primary key is `docno` and return
/// its raw bytes.
pub fn extract_document<'a>(source: &'a [u8], docno: &str) -> Option<&'a [u8]> {
    let mut doc_start: Option<usize> = None;
    let mut expect_key = false;
    let mut found = false;
    for token in Lexer::new(source) {
        if expect_key {
            expect_key = false;
            found = !token.is_tag() && token.bytes == docno.as_bytes();
        }
        match token.bytes {
            DOC_START => {
                doc_start = Some(token.start);
                found = false;
            }
            PRIMARY_KEY => expect_key = true,
            DOC_END if found => return doc_start.map(|s| &source[s..token.end()]),
            _ => {}
        }
    }
    None
}
