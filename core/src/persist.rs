//! On-disk layout shared by the indexer and the searcher.
//!
//! * `docids.bin`   primary keys, one per line, line number = doc id
//! * `lengths.bin`  one `i32` per document
//! * `postings.bin` concatenated `(doc_id: i32, tf: i32)` pairs
//! * `vocab.bin`    records of `u8 len | term | 0x00 | i32 offset | i32 size`
//!
//! All integers are little-endian. `offset` and `size` are byte positions in
//! `postings.bin`; there is no record count, the vocabulary is scanned until
//! exhausted.

use crate::error::{IndexError, Result};
use crate::index::InvertedIndex;
use crate::{DocId, Posting, Term, MAX_TERM_LEN};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

pub const INT_WIDTH: usize = 4;
pub const POSTING_WIDTH: usize = 2 * INT_WIDTH;
/// Fixed bytes of a vocabulary record besides the term itself.
const RECORD_OVERHEAD: usize = 1 + 1 + 2 * INT_WIDTH;

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn doc_ids(&self) -> PathBuf { self.root.join("docids.bin") }
    pub fn lengths(&self) -> PathBuf { self.root.join("lengths.bin") }
    pub fn postings(&self) -> PathBuf { self.root.join("postings.bin") }
    pub fn vocab(&self) -> PathBuf { self.root.join("vocab.bin") }
}

/// Where a term's postings list lives in `postings.bin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VocabEntry {
    pub offset: u32,
    /// Length in bytes, a multiple of [`POSTING_WIDTH`].
    pub size: u32,
}

impl VocabEntry {
    pub fn postings(&self) -> usize { self.size as usize / POSTING_WIDTH }
}

/// The index as reconstructed from disk, without the postings themselves.
#[derive(Debug, Default)]
pub struct LoadedIndex {
    pub doc_lengths: Vec<u32>,
    pub primary_keys: Vec<String>,
    pub vocab: HashMap<Term, VocabEntry>,
}

impl LoadedIndex {
    pub fn num_docs(&self) -> usize { self.doc_lengths.len() }
}

fn create(path: PathBuf) -> Result<(BufWriter<File>, PathBuf)> {
    let f = File::create(&path).map_err(|e| IndexError::io(&path, e))?;
    Ok((BufWriter::new(f), path))
}

fn to_i32(what: &'static str, value: u64) -> Result<i32> {
    i32::try_from(value).map_err(|_| IndexError::Overflow { what, value })
}

pub fn save_index(paths: &IndexPaths, index: &InvertedIndex) -> Result<()> {
    fs::create_dir_all(&paths.root).map_err(|e| IndexError::io(&paths.root, e))?;
    save_primary_keys(paths, &index.primary_keys)?;
    save_postings_and_vocab(paths, &index.vocab)?;
    save_lengths(paths, &index.doc_lengths)?;
    tracing::info!(root = %paths.root.display(), documents = index.num_docs(), terms = index.vocab.len(), "index written");
    Ok(())
}

pub fn save_primary_keys(paths: &IndexPaths, keys: &[String]) -> Result<()> {
    let (mut w, path) = create(paths.doc_ids())?;
    let io = |e: std::io::Error| IndexError::io(&path, e);
    for key in keys {
        w.write_all(key.as_bytes()).map_err(io)?;
        w.write_all(b"\n").map_err(io)?;
    }
    w.flush().map_err(io)
}

pub fn save_lengths(paths: &IndexPaths, lengths: &[u32]) -> Result<()> {
    let (mut w, path) = create(paths.lengths())?;
    for &len in lengths {
        let len = to_i32("document length", len.into())?;
        w.write_i32::<LittleEndian>(len).map_err(|e| IndexError::io(&path, e))?;
    }
    w.flush().map_err(|e| IndexError::io(&path, e))
}

/// Write every postings list and its vocabulary record. Terms go out in
/// byte order so identical input gives identical files.
pub fn save_postings_and_vocab(paths: &IndexPaths, vocab: &HashMap<Term, Vec<Posting>>) -> Result<()> {
    let (mut postings_w, postings_path) = create(paths.postings())?;
    let (mut vocab_w, vocab_path) = create(paths.vocab())?;

    let mut terms: Vec<&Term> = vocab.keys().collect();
    terms.sort_unstable();

    let mut offset: u64 = 0;
    for term in terms {
        let list = &vocab[term];
        let size = (list.len() * POSTING_WIDTH) as u64;
        write_vocab_record(&mut vocab_w, term, to_i32("postings offset", offset)?, to_i32("postings size", size)?)
            .map_err(|e| match e {
                IndexError::Stream(e) => IndexError::io(&vocab_path, e),
                other => other,
            })?;
        encode_postings(&mut postings_w, list).map_err(|e| match e {
            IndexError::Stream(e) => IndexError::io(&postings_path, e),
            other => other,
        })?;
        offset += size;
    }
    postings_w.flush().map_err(|e| IndexError::io(&postings_path, e))?;
    vocab_w.flush().map_err(|e| IndexError::io(&vocab_path, e))
}

pub fn encode_postings<W: Write>(w: &mut W, list: &[Posting]) -> Result<()> {
    for p in list {
        w.write_i32::<LittleEndian>(to_i32("document id", p.doc_id.into())?)?;
        w.write_i32::<LittleEndian>(to_i32("term frequency", p.tf.into())?)?;
    }
    Ok(())
}

/// The one-byte length prefix caps terms at [`MAX_TERM_LEN`] bytes; longer
/// terms are rejected before anything is written.
pub fn write_vocab_record<W: Write>(w: &mut W, term: &[u8], offset: i32, size: i32) -> Result<()> {
    if term.len() > MAX_TERM_LEN {
        return Err(IndexError::Overflow { what: "term length", value: term.len() as u64 });
    }
    w.write_u8(term.len() as u8)?;
    w.write_all(term)?;
    w.write_u8(0)?;
    w.write_i32::<LittleEndian>(offset)?;
    w.write_i32::<LittleEndian>(size)?;
    Ok(())
}

pub fn load_index(paths: &IndexPaths) -> Result<LoadedIndex> {
    let doc_lengths = load_lengths(paths)?;
    let primary_keys = load_primary_keys(paths)?;
    if primary_keys.len() != doc_lengths.len() {
        return Err(IndexError::corrupt(
            "primary key list",
            format!("{} keys for {} documents", primary_keys.len(), doc_lengths.len()),
        ));
    }
    let postings_len = fs::metadata(paths.postings()).map_err(|e| IndexError::io(paths.postings(), e))?.len();
    let vocab_path = paths.vocab();
    let bytes = fs::read(&vocab_path).map_err(|e| IndexError::io(&vocab_path, e))?;
    let vocab = decode_vocab(&bytes, postings_len)?;
    tracing::info!(documents = doc_lengths.len(), terms = vocab.len(), "index loaded");
    Ok(LoadedIndex { doc_lengths, primary_keys, vocab })
}

pub fn load_lengths(paths: &IndexPaths) -> Result<Vec<u32>> {
    let path = paths.lengths();
    let bytes = fs::read(&path).map_err(|e| IndexError::io(&path, e))?;
    if bytes.is_empty() {
        return Err(IndexError::EmptyCorpus(path));
    }
    decode_lengths(&bytes)
}

pub fn decode_lengths(bytes: &[u8]) -> Result<Vec<u32>> {
    if bytes.len() % INT_WIDTH != 0 {
        return Err(IndexError::corrupt("length file", format!("{} bytes is not a multiple of {INT_WIDTH}", bytes.len())));
    }
    let mut rdr = bytes;
    let mut out = Vec::with_capacity(bytes.len() / INT_WIDTH);
    while !rdr.is_empty() {
        let len = rdr.read_i32::<LittleEndian>()?;
        let len = u32::try_from(len)
            .map_err(|_| IndexError::corrupt("length file", format!("negative length {len} for document {}", out.len())))?;
        out.push(len);
    }
    Ok(out)
}

pub fn load_primary_keys(paths: &IndexPaths) -> Result<Vec<String>> {
    let path = paths.doc_ids();
    let f = File::open(&path).map_err(|e| IndexError::io(&path, e))?;
    BufReader::new(f).lines().collect::<std::io::Result<Vec<_>>>().map_err(|e| IndexError::io(&path, e))
}

/// Parse the vocabulary records, checking each one against the size of the
/// postings file it points into.
pub fn decode_vocab(bytes: &[u8], postings_len: u64) -> Result<HashMap<Term, VocabEntry>> {
    let mut vocab = HashMap::new();
    let mut at = 0usize;
    while at < bytes.len() {
        let len = bytes[at] as usize;
        let end = at + RECORD_OVERHEAD + len;
        if end > bytes.len() {
            return Err(IndexError::corrupt("vocabulary", format!("truncated record at byte {at}")));
        }
        let term = &bytes[at + 1..at + 1 + len];
        if bytes[at + 1 + len] != 0 {
            return Err(IndexError::corrupt("vocabulary", format!("record at byte {at} is not NUL-terminated")));
        }
        let mut rdr = &bytes[at + 2 + len..end];
        let offset = rdr.read_i32::<LittleEndian>()?;
        let size = rdr.read_i32::<LittleEndian>()?;
        let entry = check_entry(term, offset, size, postings_len)?;
        if vocab.insert(term.to_vec(), entry).is_some() {
            return Err(IndexError::corrupt("vocabulary", format!("duplicate term {:?}", String::from_utf8_lossy(term))));
        }
        at = end;
    }
    Ok(vocab)
}

fn check_entry(term: &[u8], offset: i32, size: i32, postings_len: u64) -> Result<VocabEntry> {
    let bad = |reason: String| IndexError::corrupt("vocabulary", format!("term {:?}: {reason}", String::from_utf8_lossy(term)));
    let (Ok(offset), Ok(size)) = (u32::try_from(offset), u32::try_from(size)) else {
        return Err(bad(format!("negative offset {offset} or size {size}")));
    };
    if size as usize % POSTING_WIDTH != 0 {
        return Err(bad(format!("size {size} is not a multiple of {POSTING_WIDTH}")));
    }
    if u64::from(offset) + u64::from(size) > postings_len {
        return Err(bad(format!("range {offset}+{size} past end of postings file ({postings_len} bytes)")));
    }
    Ok(VocabEntry { offset, size })
}

/// Seek to `entry` and decode its postings list. Document ids must be
/// strictly increasing and below `num_docs`.
pub fn read_postings<R: Read + Seek>(reader: &mut R, entry: VocabEntry, num_docs: usize) -> Result<Vec<Posting>> {
    let mut buf = vec![0u8; entry.size as usize];
    reader.seek(SeekFrom::Start(entry.offset.into()))?;
    reader.read_exact(&mut buf)?;
    decode_postings(&buf, num_docs)
}

pub fn decode_postings(bytes: &[u8], num_docs: usize) -> Result<Vec<Posting>> {
    if bytes.len() % POSTING_WIDTH != 0 {
        return Err(IndexError::corrupt("postings", format!("{} bytes is not a multiple of {POSTING_WIDTH}", bytes.len())));
    }
    let mut rdr = bytes;
    let mut list: Vec<Posting> = Vec::with_capacity(bytes.len() / POSTING_WIDTH);
    while !rdr.is_empty() {
        let doc_id = rdr.read_i32::<LittleEndian>()?;
        let tf = rdr.read_i32::<LittleEndian>()?;
        let doc_id = match DocId::try_from(doc_id) {
            Ok(d) if (d as usize) < num_docs => d,
            _ => return Err(IndexError::corrupt("postings", format!("document id {doc_id} outside [0, {num_docs})"))),
        };
        if tf < 1 {
            return Err(IndexError::corrupt("postings", format!("term frequency {tf} for document {doc_id}")));
        }
        if list.last().is_some_and(|last| last.doc_id >= doc_id) {
            return Err(IndexError::corrupt("postings", format!("document id {doc_id} out of order")));
        }
        list.push(Posting::new(doc_id, tf as u32));
    }
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn vocab_record_layout() {
        let mut buf = Vec::new();
        write_vocab_record(&mut buf, b"cat", 16, 8).unwrap();
        assert_eq!(buf, vec![3, b'c', b'a', b't', 0, 16, 0, 0, 0, 8, 0, 0, 0]);
        let vocab = decode_vocab(&buf, 24).unwrap();
        assert_eq!(vocab[&b"cat".to_vec()], VocabEntry { offset: 16, size: 8 });
    }

    #[test]
    fn empty_term_record_is_legal() {
        let mut buf = Vec::new();
        write_vocab_record(&mut buf, b"", 0, 0).unwrap();
        assert_eq!(buf.len(), RECORD_OVERHEAD);
        assert_eq!(decode_vocab(&buf, 0).unwrap().len(), 1);
    }

    #[test]
    fn truncated_vocab_is_corrupt() {
        let mut buf = Vec::new();
        write_vocab_record(&mut buf, b"cat", 0, 8).unwrap();
        buf.pop();
        assert!(matches!(decode_vocab(&buf, 8), Err(IndexError::Corrupt { .. })));
    }

    #[test]
    fn missing_nul_is_corrupt() {
        let mut buf = Vec::new();
        write_vocab_record(&mut buf, b"cat", 0, 8).unwrap();
        buf[4] = b'x';
        assert!(matches!(decode_vocab(&buf, 8), Err(IndexError::Corrupt { .. })));
    }

    #[test]
    fn ragged_or_out_of_range_sizes_are_corrupt() {
        let mut buf = Vec::new();
        write_vocab_record(&mut buf, b"cat", 0, 12).unwrap();
        assert!(decode_vocab(&buf, 64).is_err());

        let mut buf = Vec::new();
        write_vocab_record(&mut buf, b"cat", 8, 16).unwrap();
        assert!(decode_vocab(&buf, 16).is_err());

        let mut buf = Vec::new();
        write_vocab_record(&mut buf, b"cat", -8, 8).unwrap();
        assert!(decode_vocab(&buf, 16).is_err());
    }

    #[test]
    fn over_long_term_is_rejected_before_writing() {
        let mut buf = Vec::new();
        let term = vec![b'a'; MAX_TERM_LEN + 45];
        let err = write_vocab_record(&mut buf, &term, 0, 8).unwrap_err();
        assert!(matches!(err, IndexError::Overflow { what: "term length", value: 300 }));
        assert!(buf.is_empty());
        write_vocab_record(&mut buf, &term[..MAX_TERM_LEN], 0, 8).unwrap();
        assert_eq!(buf[0] as usize, MAX_TERM_LEN);
    }

    #[test]
    fn save_fails_on_unnormalized_term() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = InvertedIndex { doc_lengths: vec![2], primary_keys: vec!["A".into()], ..Default::default() };
        index.vocab.insert(vec![b'x'; 300], vec![Posting::new(0, 1)]);
        index.vocab.insert(b"cat".to_vec(), vec![Posting::new(0, 1)]);
        let err = save_index(&IndexPaths::new(dir.path()), &index).unwrap_err();
        assert!(matches!(err, IndexError::Overflow { what: "term length", .. }));
    }

    #[test]
    fn duplicate_terms_are_corrupt() {
        let mut buf = Vec::new();
        write_vocab_record(&mut buf, b"cat", 0, 8).unwrap();
        write_vocab_record(&mut buf, b"cat", 0, 8).unwrap();
        assert!(decode_vocab(&buf, 8).is_err());
    }

    #[test]
    fn lengths_must_be_whole_and_non_negative() {
        assert_eq!(decode_lengths(&[2, 0, 0, 0, 4, 0, 0, 0]).unwrap(), vec![2, 4]);
        assert!(decode_lengths(&[2, 0, 0]).is_err());
        assert!(decode_lengths(&(-1i32).to_le_bytes()).is_err());
    }

    #[test]
    fn postings_seek_and_validate() {
        let mut file = Vec::new();
        encode_postings(&mut file, &[Posting::new(0, 1), Posting::new(2, 3)]).unwrap();
        encode_postings(&mut file, &[Posting::new(1, 5)]).unwrap();
        let mut cur = Cursor::new(file);
        let second = read_postings(&mut cur, VocabEntry { offset: 16, size: 8 }, 3).unwrap();
        assert_eq!(second, vec![Posting::new(1, 5)]);
        let first = read_postings(&mut cur, VocabEntry { offset: 0, size: 16 }, 3).unwrap();
        assert_eq!(first, vec![Posting::new(0, 1), Posting::new(2, 3)]);
        // doc id 2 is outside a two-document corpus
        assert!(read_postings(&mut cur, VocabEntry { offset: 0, size: 16 }, 2).is_err());
    }

    #[test]
    fn unordered_postings_are_corrupt() {
        let mut bytes = Vec::new();
        encode_postings(&mut bytes, &[Posting::new(1, 1), Posting::new(1, 1)]).unwrap();
        assert!(decode_postings(&bytes, 4).is_err());
        assert!(decode_postings(&bytes[..7], 4).is_err());
    }
}
