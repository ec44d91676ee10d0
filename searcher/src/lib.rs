use anyhow::{Context, Result};
use okapi_core::persist::IndexPaths;
use okapi_core::rank::{DEFAULT_RESULT_LIMIT, DEFAULT_RUN_TAG};
use okapi_core::{Bm25Params, Query, Searcher, TrecWriter};
use std::io::{BufRead, Write};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub index_dir: PathBuf,
    pub params: Bm25Params,
    pub limit: usize,
    pub run_tag: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            index_dir: PathBuf::from("."),
            params: Bm25Params::default(),
            limit: DEFAULT_RESULT_LIMIT,
            run_tag: DEFAULT_RUN_TAG.to_string(),
        }
    }
}

pub fn open_searcher(config: &SearchConfig) -> Result<Searcher> {
    let paths = IndexPaths::new(&config.index_dir);
    Searcher::open(&paths, config.params).with_context(|| format!("loading index from {}", config.index_dir.display()))
}

/// Answer one query per input line, writing a TREC run block for each.
/// Returns the number of queries processed.
pub fn run_queries<R: BufRead, W: Write>(searcher: &mut Searcher, mut input: R, output: W, config: &SearchConfig) -> Result<usize> {
    let mut out = TrecWriter::new(output, config.run_tag.clone());
    let mut line = Vec::new();
    let mut queries = 0;
    loop {
        line.clear();
        if input.read_until(b'\n', &mut line).context("reading queries")? == 0 {
            break;
        }
        let query = Query::parse(&line);
        let hits = searcher.search(&query, config.limit).with_context(|| format!("query {}", query.id))?;
        tracing::debug!(query = %query.id, terms = query.terms.len(), hits = hits.len(), "query done");
        out.write_hits(&query.id, &hits, searcher.primary_keys()).context("writing results")?;
        queries += 1;
    }
    out.flush().context("writing results")?;
    Ok(queries)
}
