use lazy_static::lazy_static;
use regex::bytes::Regex;

lazy_static! {
    // A tag runs from '<' to the next '>' (or to the end of the buffer when
    // unterminated). A word starts alphanumeric and may carry hyphens, since
    // TREC <DOCNO> primary keys contain them.
    static ref RE: Regex = Regex::new(r"(?-u)<[^>]*>?|[A-Za-z0-9][A-Za-z0-9-]*").expect("valid regex");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Tag,
    Word,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub bytes: &'a [u8],
    /// Byte offset of the token in the lexed buffer.
    pub start: usize,
}

impl<'a> Token<'a> {
    pub fn is_tag(&self) -> bool { self.kind == TokenKind::Tag }
    pub fn end(&self) -> usize { self.start + self.bytes.len() }
}

/// Lazy tokenizer over a byte buffer. Each instance owns its cursor, so
/// several lexers can run over different buffers independently.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(buf: &'a [u8]) -> Self { Self { buf, pos: 0 } }

    /// Rewind to the start of the buffer.
    pub fn reset(&mut self) { self.pos = 0; }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        if self.pos >= self.buf.len() {
            return None;
        }
        let Some(m) = RE.find_at(self.buf, self.pos) else {
            self.pos = self.buf.len();
            return None;
        };
        self.pos = m.end();
        let bytes = m.as_bytes();
        let kind = if bytes[0] == b'<' { TokenKind::Tag } else { TokenKind::Word };
        Some(Token { kind, bytes, start: m.start() })
    }
}
