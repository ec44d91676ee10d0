use okapi_core::index::{BuildOptions, IndexBuilder};
use okapi_core::persist::{save_index, IndexPaths};
use searcher::{open_searcher, run_queries, SearchConfig};
use std::fs;
use std::io::Cursor;
use tempfile::tempdir;

fn build_tiny_index(dir: &std::path::Path) {
    let mut builder = IndexBuilder::new(BuildOptions::default());
    builder.push_text(b"<DOC> <DOCNO> WSJ-0 </DOCNO> <TEXT> cat bird </TEXT> </DOC>");
    builder.push_text(b"<DOC> <DOCNO> WSJ-1 </DOCNO> <TEXT> cat cat dog fish </TEXT> </DOC>");
    builder.push_text(b"<DOC> <DOCNO> WSJ-2 </DOCNO> <TEXT> dog dog </TEXT> </DOC>");
    save_index(&IndexPaths::new(dir), &builder.finish().unwrap()).unwrap();
}

fn run(config: &SearchConfig, queries: &str) -> (usize, String) {
    let mut searcher = open_searcher(config).unwrap();
    let mut out = Vec::new();
    let n = run_queries(&mut searcher, Cursor::new(queries.as_bytes()), &mut out, config).unwrap();
    (n, String::from_utf8(out).unwrap())
}

#[test]
fn search_returns_ranked_results() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());
    let config = SearchConfig { index_dir: dir.path().to_path_buf(), ..Default::default() };

    let (n, text) = run(&config, "51 CAT\n\n52 dog\n");
    assert_eq!(n, 3);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "51 Q0 WSJ-1 1 0.5002 okapi");
    assert_eq!(lines[1], "51 Q0 WSJ-0 2 0.4256 okapi");
    assert!(lines[2].starts_with("52 Q0 WSJ-2 1 "));
    assert!(lines[3].starts_with("52 Q0 WSJ-1 2 "));
}

#[test]
fn output_is_reproducible() {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());
    let config = SearchConfig { index_dir: dir.path().to_path_buf(), limit: 1, run_tag: "run9".into(), ..Default::default() };

    let (_, first) = run(&config, "cat dog\n");
    let (_, second) = run(&config, "cat dog\n");
    assert_eq!(first, second);
    assert_eq!(first.lines().count(), 1);
    assert!(first.starts_with("0 Q0 "));
    assert!(first.trim_end().ends_with(" run9"));
}

#[test]
fn missing_index_is_an_error() {
    let dir = tempdir().unwrap();
    let config = SearchConfig { index_dir: dir.path().join("nowhere"), ..Default::default() };
    assert!(open_searcher(&config).is_err());

    build_tiny_index(dir.path());
    fs::write(dir.path().join("lengths.bin"), b"").unwrap();
    let config = SearchConfig { index_dir: dir.path().to_path_buf(), ..Default::default() };
    let err = open_searcher(&config).unwrap_err();
    assert!(format!("{err:#}").contains("empty"));
}
