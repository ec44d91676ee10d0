use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use okapi_core::index::{BuildOptions, DocLengthPolicy, IndexBuilder};
use okapi_core::persist::{save_index, IndexPaths};
use tracing_subscriber::{fmt, EnvFilter};

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "okapi-index")]
#[command(about = "Build a BM25 inverted index from a TREC-style tagged collection", long_about = None)]
struct Cli {
    /// Collection to index, documents delimited by <DOC> with a <DOCNO> key
    input: PathBuf,
    /// Directory the index files are written to
    #[arg(long, env = "OKAPI_INDEX_DIR", default_value = ".")]
    output: PathBuf,
    /// Which tokens count toward document length
    #[arg(long, value_enum, env = "OKAPI_LENGTH_POLICY", default_value_t = LengthPolicy::Indexed)]
    length_policy: LengthPolicy,
}

#[derive(Clone, Copy, ValueEnum)]
enum LengthPolicy {
    /// Only tokens that are indexed as terms
    Indexed,
    /// Every token in the document, tags included
    All,
}

impl From<LengthPolicy> for DocLengthPolicy {
    fn from(p: LengthPolicy) -> Self {
        match p {
            LengthPolicy::Indexed => DocLengthPolicy::IndexedTokens,
            LengthPolicy::All => DocLengthPolicy::AllTokens,
        }
    }
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(std::io::stderr).init();
    let cli = Cli::parse();
    let options = BuildOptions { length_policy: cli.length_policy.into() };
    build_index(&cli.input, &IndexPaths::new(&cli.output), options)?;
    Ok(())
}

/// Parse `input` and write the index. Returns the number of documents, zero
/// meaning nothing was written.
fn build_index(input: &Path, out_paths: &IndexPaths, options: BuildOptions) -> Result<usize> {
    let f = File::open(input).with_context(|| format!("can't open file {}", input.display()))?;
    let mut reader = BufReader::new(f);
    let mut builder = IndexBuilder::new(options);

    // Lines are lexed one at a time and need not be UTF-8.
    let mut line = Vec::new();
    loop {
        line.clear();
        let read = reader.read_until(b'\n', &mut line).with_context(|| format!("reading {}", input.display()))?;
        if read == 0 {
            break;
        }
        builder.push_text(&line);
    }

    let Some(index) = builder.finish() else {
        tracing::info!(input = %input.display(), "no documents found, nothing written");
        return Ok(0);
    };
    let num_docs = index.num_docs();
    tracing::info!(num_docs, num_terms = index.vocab.len(), "serialising index");
    save_index(out_paths, &index).with_context(|| format!("writing index to {}", out_paths.root.display()))?;
    tracing::info!(output = %out_paths.root.display(), "index build complete");
    Ok(num_docs)
}
