use anyhow::Result;
use clap::Parser;
use okapi_core::rank::{DEFAULT_RESULT_LIMIT, DEFAULT_RUN_TAG};
use okapi_core::Bm25Params;
use searcher::{open_searcher, run_queries, SearchConfig};
use std::io::{self, BufWriter};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

/// Read queries from stdin, one per line, and print BM25 rankings in
/// trec_eval format.
#[derive(Parser)]
#[command(name = "okapi-search")]
struct Args {
    /// Index directory path
    #[arg(long, env = "OKAPI_INDEX_DIR", default_value = ".")]
    index: PathBuf,
    /// BM25 term-frequency saturation
    #[arg(long, env = "OKAPI_K1", default_value_t = Bm25Params::default().k1)]
    k1: f64,
    /// BM25 length normalization
    #[arg(long, env = "OKAPI_B", default_value_t = Bm25Params::default().b)]
    b: f64,
    /// Maximum results per query
    #[arg(long, env = "OKAPI_LIMIT", default_value_t = DEFAULT_RESULT_LIMIT)]
    limit: usize,
    /// Run name in the last output column
    #[arg(long, env = "OKAPI_RUN_TAG", default_value = DEFAULT_RUN_TAG)]
    run_tag: String,
}

impl From<Args> for SearchConfig {
    fn from(a: Args) -> Self {
        SearchConfig { index_dir: a.index, params: Bm25Params { k1: a.k1, b: a.b }, limit: a.limit, run_tag: a.run_tag }
    }
}

fn main() -> Result<()> {
    // results go to stdout, logs to stderr
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(io::stderr).init();
    let config = SearchConfig::from(Args::parse());
    let mut searcher = open_searcher(&config)?;
    tracing::info!(documents = searcher.num_docs(), avgdl = searcher.average_doc_length(), "index ready");

    let stdin = io::stdin();
    let stdout = io::stdout();
    let queries = run_queries(&mut searcher, stdin.lock(), BufWriter::new(stdout.lock()), &config)?;
    tracing::info!(queries, "done");
    Ok(())
}
