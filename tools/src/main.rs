use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use okapi_core::inspect::{extract_document, IndexStats, VocabDiff};
use okapi_core::persist::{load_index, IndexPaths};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

/// Print at most this many entries per diff section.
const DIFF_SHOWN: usize = 100;

#[derive(Parser)]
#[command(name = "okapi-tools")]
#[command(about = "Inspect okapi indexes and their source collections", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize an index: document count, lengths, vocabulary size
    Stats {
        /// Index directory
        #[arg(long, default_value = ".")]
        index: PathBuf,
        /// Emit JSON instead of text
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Compare the vocabularies of two indexes
    VocabDiff { a: PathBuf, b: PathBuf },
    /// Print the document with the given primary key from a collection file
    ShowDoc { input: PathBuf, docno: String },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(io::stderr).init();
    let cli = Cli::parse();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Stats { index, json } => stats(&index, json, &mut out),
        Commands::VocabDiff { a, b } => vocab_diff(&a, &b, &mut out),
        Commands::ShowDoc { input, docno } => show_doc(&input, &docno, &mut out),
    }
}

fn stats<W: Write>(index: &Path, json: bool, out: &mut W) -> Result<()> {
    let loaded = load_index(&IndexPaths::new(index)).with_context(|| format!("loading index from {}", index.display()))?;
    let s = IndexStats::compute(&loaded);
    if json {
        serde_json::to_writer_pretty(&mut *out, &s)?;
        writeln!(out)?;
        return Ok(());
    }
    writeln!(out, "Num documents: {}", s.documents)?;
    writeln!(out, "Average doc len: {}", s.average_length)?;
    writeln!(out, "Shortest doc: {}", s.shortest)?;
    writeln!(out, "Longest doc: {}", s.longest)?;
    writeln!(out, "Num terms: {}", s.terms)?;
    writeln!(out, "Most common term: {} ({} documents)", s.most_common_term.as_deref().unwrap_or("-"), s.most_common_postings)?;
    Ok(())
}

fn vocab_diff<W: Write>(a: &Path, b: &Path, out: &mut W) -> Result<()> {
    let load = |p: &Path| load_index(&IndexPaths::new(p)).with_context(|| format!("loading index from {}", p.display()));
    let diff = VocabDiff::compute(&load(a)?, &load(b)?);

    writeln!(out, "These terms are only in {}", a.display())?;
    write_section(out, &diff.only_in_a)?;
    writeln!(out, "\nThese terms are only in {}", b.display())?;
    write_section(out, &diff.only_in_b)?;
    writeln!(out, "\nThese terms have differing sizes")?;
    let differing: Vec<String> = diff.differing.iter().map(|(t, sa, sb)| format!("{t} {sa} {sb}")).collect();
    write_section(out, &differing)?;
    Ok(())
}

fn write_section<W: Write>(out: &mut W, items: &[String]) -> io::Result<()> {
    for item in items.iter().take(DIFF_SHOWN) {
        writeln!(out, "  {item}")?;
    }
    if items.len() > DIFF_SHOWN {
        writeln!(out, "  ... {} more", items.len() - DIFF_SHOWN)?;
    }
    Ok(())
}

fn show_doc<W: Write>(input: &Path, docno: &str, out: &mut W) -> Result<()> {
    let source = std::fs::read(input).with_context(|| format!("can't open file {}", input.display()))?;
    tracing::debug!(bytes = source.len(), "collection loaded");
    match extract_document(&source, docno) {
        Some(doc) => {
            out.write_all(doc)?;
            writeln!(out)?;
        }
        None => writeln!(out, "Not found")?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use okapi_core::index::{BuildOptions, IndexBuilder};
    use okapi_core::persist::save_index;
    use tempfile::tempdir;

    fn index_of(dir: &std::path::Path, text: &str) {
        let mut builder = IndexBuilder::new(BuildOptions::default());
        builder.push_text(text.as_bytes());
        save_index(&IndexPaths::new(dir), &builder.finish().unwrap()).unwrap();
    }

    #[test]
    fn stats_as_json() {
        let dir = tempdir().unwrap();
        index_of(dir.path(), "<DOC> <DOCNO> A </DOCNO> cat cat <DOC> <DOCNO> B </DOCNO> cat dog eel fox");
        let mut out = Vec::new();
        stats(dir.path(), true, &mut out).unwrap();
        let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(v["documents"], 2);
        assert_eq!(v["terms"], 4);
        assert_eq!(v["most_common_term"], "cat");
        assert_eq!(v["longest"], 4);
    }

    #[test]
    fn diff_lists_one_sided_terms() {
        let a = tempdir().unwrap();
        let b = tempdir().unwrap();
        index_of(a.path(), "<DOC> <DOCNO> A </DOCNO> cat dog");
        index_of(b.path(), "<DOC> <DOCNO> A </DOCNO> cat eel");
        let mut out = Vec::new();
        vocab_diff(a.path(), b.path(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("  dog\n"));
        assert!(text.contains("  eel\n"));
        assert!(!text.contains("  cat\n"));
    }

    #[test]
    fn show_doc_reports_missing() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("c.xml");
        std::fs::write(&input, "<DOC>\n<DOCNO> X-1 </DOCNO>\nbody\n</DOC>\n").unwrap();
        let mut out = Vec::new();
        show_doc(&input, "X-1", &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "<DOC>\n<DOCNO> X-1 </DOCNO>\nbody\n</DOC>\n");
        let mut out = Vec::new();
        show_doc(&input, "X-2", &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Not found\n");
    }
}
