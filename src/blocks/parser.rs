//! Block document parser
//!
//! Implements the block serialization grammar used by the block editor:
//!
//! - opener: `<!-- wp:ns/name {"json":"attrs"} -->`
//! - closer: `<!-- /wp:ns/name -->`
//! - void:   `<!-- wp:ns/name {"json":"attrs"} /-->`
//!
//! Names without a namespace belong to `core/`. Attribute JSON runs from
//! `{` to the first `}` that is followed by whitespace and the end of the
//! comment. HTML between delimiters is collected into `inner_html` and
//! `inner_content`; HTML outside any block becomes freeform blocks.
//!
//! The parser never fails. Malformed delimiters are treated as plain HTML,
//! unclosed openers are closed at the end of input, and a closer without an
//! opener stops parsing, leaving the rest of the document as freeform HTML.

use super::{Attrs, Block};

/// Parse a serialized block document into its top-level blocks.
pub fn parse_blocks(document: &str) -> Vec<Block> {
    let mut parser = Parser::new(document);
    while parser.proceed() {}
    parser.output
}

/// Decode stored content.
///
/// Content that is a JSON array of block objects is decoded directly,
/// anything else is parsed as delimited markup.
pub fn decode_document(content: &str) -> Vec<Block> {
    if content.trim_start().starts_with('[') {
        if let Ok(blocks) = serde_json::from_str::<Vec<Block>>(content) {
            return blocks;
        }
    }
    parse_blocks(content)
}

#[derive(Debug, PartialEq)]
enum TokenKind {
    Opener,
    Closer,
    Void,
}

#[derive(Debug)]
struct Token {
    kind: TokenKind,
    name: String,
    attrs: Attrs,
    start: usize,
    len: usize,
}

/// An open block waiting for its closer
struct Frame {
    block: Block,
    token_start: usize,
    token_len: usize,
    /// Where this block's not-yet-collected HTML starts
    prev_offset: usize,
    /// Start of freeform HTML that preceded the opener, if any
    leading_html_start: Option<usize>,
}

struct Parser<'a> {
    document: &'a str,
    offset: usize,
    /// Where the tokenizer resumes scanning
    cursor: usize,
    output: Vec<Block>,
    stack: Vec<Frame>,
}

impl<'a> Parser<'a> {
    fn new(document: &'a str) -> Self {
        Self {
            document,
            offset: 0,
            cursor: 0,
            output: Vec::new(),
            stack: Vec::new(),
        }
    }

    /// Consume one token. Returns false once parsing is finished.
    fn proceed(&mut self) -> bool {
        let depth = self.stack.len();

        let token = match self.next_token() {
            Some(token) => token,
            None => {
                match depth {
                    0 => self.add_freeform(),
                    _ => {
                        while !self.stack.is_empty() {
                            self.add_block_from_stack(None);
                        }
                    }
                }
                return false;
            }
        };

        let leading_html_start = (token.start > self.offset).then_some(self.offset);
        let token_end = token.start + token.len;

        match token.kind {
            TokenKind::Void => {
                let block = Block::new(token.name, token.attrs);
                if depth == 0 {
                    if let Some(start) = leading_html_start {
                        self.output.push(Block::freeform(&self.document[start..token.start]));
                    }
                    self.output.push(block);
                } else {
                    self.add_inner_block(block, token.start, token.len, None);
                }
                self.offset = token_end;
                true
            }
            TokenKind::Opener => {
                self.stack.push(Frame {
                    block: Block::new(token.name, token.attrs),
                    token_start: token.start,
                    token_len: token.len,
                    prev_offset: token_end,
                    leading_html_start,
                });
                self.offset = token_end;
                true
            }
            TokenKind::Closer => {
                if depth == 0 {
                    self.add_freeform();
                    return false;
                }

                if depth == 1 {
                    self.add_block_from_stack(Some(token.start));
                    self.offset = token_end;
                    return true;
                }

                if let Some(mut top) = self.stack.pop() {
                    let html = &self.document[top.prev_offset..token.start];
                    top.block.push_html(html);
                    self.add_inner_block(top.block, top.token_start, top.token_len, Some(token_end));
                }
                self.offset = token_end;
                true
            }
        }
    }

    /// Push everything from `offset` to the end of the document as freeform HTML.
    fn add_freeform(&mut self) {
        if self.offset < self.document.len() {
            self.output.push(Block::freeform(&self.document[self.offset..]));
        }
    }

    fn add_inner_block(&mut self, block: Block, token_start: usize, token_len: usize, last_offset: Option<usize>) {
        let document = self.document;
        let Some(parent) = self.stack.last_mut() else {
            return;
        };

        parent.block.inner_blocks.push(block);
        let html = &document[parent.prev_offset..token_start];
        if !html.is_empty() {
            parent.block.push_html(html);
        }
        parent.block.inner_content.push(None);
        parent.prev_offset = last_offset.unwrap_or(token_start + token_len);
    }

    fn add_block_from_stack(&mut self, end_offset: Option<usize>) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        let Frame {
            mut block,
            token_start,
            prev_offset,
            leading_html_start,
            ..
        } = frame;

        let end = end_offset.unwrap_or(self.document.len());
        let html = &self.document[prev_offset..end];
        if !html.is_empty() {
            block.push_html(html);
        }

        if let Some(start) = leading_html_start {
            self.output.push(Block::freeform(&self.document[start..token_start]));
        }
        self.output.push(block);
    }

    /// Find the next block delimiter at or after the cursor.
    fn next_token(&mut self) -> Option<Token> {
        while let Some(found) = self.document[self.cursor..].find("<!--") {
            let start = self.cursor + found;
            if let Some(token) = match_delimiter(self.document, start) {
                self.cursor = start + token.len;
                return Some(token);
            }
            self.cursor = start + 4;
        }
        self.cursor = self.document.len();
        None
    }
}

/// Try to read a block delimiter starting exactly at `start` (which points at `<!--`).
fn match_delimiter(doc: &str, start: usize) -> Option<Token> {
    let mut pos = start + 4;

    pos = skip_whitespace(doc, pos, true)?;

    let is_closer = doc[pos..].starts_with('/');
    if is_closer {
        pos += 1;
    }

    if !doc[pos..].starts_with("wp:") {
        return None;
    }
    pos += 3;

    let (name, after_name) = read_block_name(doc, pos)?;
    pos = skip_whitespace(doc, after_name, true)?;

    let mut attrs_json = None;
    if doc[pos..].starts_with('{') {
        let (json, end) = read_attrs(doc, pos)?;
        attrs_json = Some(json);
        pos = end;
    }

    let is_void = doc[pos..].starts_with('/');
    if is_void {
        pos += 1;
    }

    if !doc[pos..].starts_with("-->") {
        return None;
    }
    pos += 3;

    let kind = if is_void {
        TokenKind::Void
    } else if is_closer {
        TokenKind::Closer
    } else {
        TokenKind::Opener
    };

    let attrs = match (&kind, attrs_json) {
        (TokenKind::Closer, _) | (_, None) => Attrs::new(),
        (_, Some(json)) => serde_json::from_str::<Attrs>(json).unwrap_or_default(),
    };

    Some(Token {
        kind,
        name,
        attrs,
        start,
        len: pos - start,
    })
}

/// Skip whitespace from `pos`. With `required`, at least one character must be skipped.
fn skip_whitespace(doc: &str, pos: usize, required: bool) -> Option<usize> {
    let skipped: usize = doc[pos..]
        .chars()
        .take_while(|c| c.is_whitespace())
        .map(char::len_utf8)
        .sum();
    if required && skipped == 0 {
        None
    } else {
        Some(pos + skipped)
    }
}

/// Length of a `[a-z][a-z0-9_-]*` segment at `pos` (0 when there is none)
fn name_segment_len(doc: &str, pos: usize) -> usize {
    let bytes = &doc.as_bytes()[pos..];
    match bytes.first() {
        Some(b) if b.is_ascii_lowercase() => {}
        _ => return 0,
    }
    bytes
        .iter()
        .take_while(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || **b == b'_' || **b == b'-')
        .count()
}

/// Read `name` or `namespace/name`, returning the qualified name and the end offset.
fn read_block_name(doc: &str, pos: usize) -> Option<(String, usize)> {
    let first = name_segment_len(doc, pos);
    if first == 0 {
        return None;
    }
    let first_end = pos + first;

    if doc[first_end..].starts_with('/') {
        let second = name_segment_len(doc, first_end + 1);
        if second > 0 {
            let end = first_end + 1 + second;
            return Some((doc[pos..end].to_string(), end));
        }
    }

    Some((format!("core/{}", &doc[pos..first_end]), first_end))
}

/// Read the attribute JSON starting at `pos` (pointing at `{`).
///
/// The object ends at the first `}` followed by whitespace and an optional
/// `/` before `-->`. Returns the JSON text and the offset just past the
/// whitespace that follows it.
fn read_attrs(doc: &str, pos: usize) -> Option<(&str, usize)> {
    for (idx, _) in doc[pos..].match_indices('}') {
        let close = pos + idx;
        let Some(after) = skip_whitespace(doc, close + 1, true) else {
            continue;
        };
        let rest = &doc[after..];
        if rest.starts_with("-->") || rest.starts_with("/-->") {
            return Some((&doc[pos..=close], after));
        }
    }
    None
}
