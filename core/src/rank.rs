use crate::DocId;
use std::cmp::Ordering;
use std::io::{self, Write};

/// Standard TREC evaluation depth.
pub const DEFAULT_RESULT_LIMIT: usize = 1000;
pub const DEFAULT_RUN_TAG: &str = "okapi";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub doc_id: DocId,
    pub score: f64,
}

/// Higher score first, then lower doc id.
fn by_rank(a: &Hit, b: &Hit) -> Ordering {
    b.score.total_cmp(&a.score).then(a.doc_id.cmp(&b.doc_id))
}

/// Best `k` documents with a positive score, in rank order.
pub fn top_k(scores: &[f64], k: usize) -> Vec<Hit> {
    let mut hits: Vec<Hit> = scores
        .iter()
        .enumerate()
        .filter(|(_, &s)| s > 0.0)
        .map(|(d, &score)| Hit { doc_id: d as DocId, score })
        .collect();
    if k == 0 {
        return Vec::new();
    }
    if hits.len() > k {
        hits.select_nth_unstable_by(k - 1, by_rank);
        hits.truncate(k);
    }
    hits.sort_unstable_by(by_rank);
    hits
}

/// Renders hits in trec_eval run format:
/// `query-id Q0 document-id rank score run-tag`.
pub struct TrecWriter<W: Write> {
    out: W,
    run_tag: String,
}

impl<W: Write> TrecWriter<W> {
    pub fn new(out: W, run_tag: impl Into<String>) -> Self {
        Self { out, run_tag: run_tag.into() }
    }

    pub fn write_hits(&mut self, query_id: &str, hits: &[Hit], primary_keys: &[String]) -> io::Result<()> {
        for (rank, hit) in hits.iter().enumerate() {
            let key = primary_keys.get(hit.doc_id as usize).map(String::as_str).unwrap_or("");
            writeln!(self.out, "{} Q0 {} {} {:.4} {}", query_id, key, rank + 1, hit.score, self.run_tag)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> { self.out.flush() }

    pub fn into_inner(self) -> W { self.out }
}
