//! Incremental parser for file blocks embedded in generated text:
//!
//! ```text
//! 🔧 CREATE_FILE: <path>\n<content...>🔧 END_FILE
//! 🔧 UPDATE_FILE: <path>\n<content...>🔧 END_FILE
//! ```
//!
//! Text is fed in arbitrary slices. Only the unconsumed suffix is kept, so a
//! session costs linear time in the response length, and a marker split
//! across two slices is still recognized.

use crate::streaming::OperationKind;

pub const CREATE_MARKER: &str = "🔧 CREATE_FILE:";
pub const UPDATE_MARKER: &str = "🔧 UPDATE_FILE:";
pub const END_MARKER: &str = "🔧 END_FILE";

const OPEN_MARKERS: [(&str, OperationKind); 2] = [
    (CREATE_MARKER, OperationKind::Create),
    (UPDATE_MARKER, OperationKind::Update),
];

/// A block whose end marker has been seen.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedBlock {
    pub kind: OperationKind,
    pub path: String,
    pub content: String,
    /// The block exactly as it appeared, markers included.
    pub raw: String,
}

#[derive(Debug)]
enum State {
    Outside,
    Header {
        kind: OperationKind,
    },
    Body {
        kind: OperationKind,
        header: String,
        scanned: usize,
    },
}

#[derive(Debug)]
pub struct OperationParser {
    state: State,
    pending: String,
}

impl Default for OperationParser {
    fn default() -> Self {
        Self::new()
    }
}

impl OperationParser {
    pub fn new() -> Self {
        Self {
            state: State::Outside,
            pending: String::new(),
        }
    }

    pub fn is_inside_block(&self) -> bool {
        !matches!(self.state, State::Outside)
    }

    /// Feed the next slice of text; returns the blocks it completed.
    pub fn feed(&mut self, text: &str) -> Vec<ParsedBlock> {
        self.pending.push_str(text);
        let mut blocks = Vec::new();

        loop {
            match &mut self.state {
                State::Outside => match find_open_marker(&self.pending) {
                    Some((at, marker, kind)) => {
                        self.pending.drain(..at + marker.len());
                        self.state = State::Header { kind };
                    }
                    None => {
                        let keep_from = partial_marker_start(&self.pending);
                        self.pending.drain(..keep_from);
                        break;
                    }
                },
                State::Header { kind } => match self.pending.find('\n') {
                    Some(newline) => {
                        let kind = *kind;
                        let header: String = self.pending.drain(..=newline).collect();
                        self.state = State::Body {
                            kind,
                            header: header[..header.len() - 1].to_string(),
                            scanned: 0,
                        };
                    }
                    None => break,
                },
                State::Body {
                    kind,
                    header,
                    scanned,
                } => match self.pending[*scanned..].find(END_MARKER) {
                    Some(offset) => {
                        let end = *scanned + offset;
                        let content = self.pending[..end].to_string();
                        self.pending.drain(..end + END_MARKER.len());

                        let kind = *kind;
                        let header = std::mem::take(header);
                        self.state = State::Outside;

                        let path = header.trim().to_string();
                        if path.is_empty() {
                            log::warn!("Discarding {} block without a path", kind.marker());
                            continue;
                        }
                        blocks.push(ParsedBlock {
                            raw: format!("{}{}\n{}{}", kind.marker(), header, content, END_MARKER),
                            kind,
                            path,
                            content,
                        });
                    }
                    None => {
                        // the end marker may straddle this slice and the next
                        *scanned = floor_char_boundary(
                            &self.pending,
                            self.pending.len().saturating_sub(END_MARKER.len() - 1),
                        );
                        break;
                    }
                },
            }
        }

        blocks
    }
}

impl OperationKind {
    pub fn marker(&self) -> &'static str {
        match self {
            OperationKind::Create => CREATE_MARKER,
            OperationKind::Update => UPDATE_MARKER,
        }
    }
}

fn find_open_marker(text: &str) -> Option<(usize, &'static str, OperationKind)> {
    OPEN_MARKERS
        .iter()
        .filter_map(|(marker, kind)| text.find(marker).map(|at| (at, *marker, *kind)))
        .min_by_key(|(at, _, _)| *at)
}

/// Start of the longest suffix of `text` that could still grow into an open
/// marker; everything before it can be dropped.
fn partial_marker_start(text: &str) -> usize {
    let mut keep = 0;
    for (marker, _) in OPEN_MARKERS.iter() {
        for len in (1..marker.len()).rev() {
            if len <= keep {
                break;
            }
            if marker.is_char_boundary(len) && text.ends_with(&marker[..len]) {
                keep = len;
                break;
            }
        }
    }
    text.len() - keep
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(parser: &mut OperationParser, parts: &[&str]) -> Vec<ParsedBlock> {
        parts.iter().flat_map(|p| parser.feed(p)).collect()
    }

    #[test]
    fn test_single_block_in_one_slice() {
        let mut parser = OperationParser::new();
        let blocks = parser.feed("Here you go:\n🔧 CREATE_FILE: /x.ts\nhello🔧 END_FILE\nDone.");

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].kind, OperationKind::Create);
        assert_eq!(blocks[0].path, "/x.ts");
        assert_eq!(blocks[0].content, "hello");
        assert_eq!(blocks[0].raw, "🔧 CREATE_FILE: /x.ts\nhello🔧 END_FILE");
        assert!(!parser.is_inside_block());
    }

    #[test]
    fn test_block_split_character_by_character() {
        let text = "intro 🔧 UPDATE_FILE: src/app.rs\nfn main() {}\n🔧 END_FILE outro";
        let mut parser = OperationParser::new();
        let mut blocks = Vec::new();
        for ch in text.chars() {
            blocks.extend(parser.feed(&ch.to_string()));
        }

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].kind, OperationKind::Update);
        assert_eq!(blocks[0].path, "src/app.rs");
        assert_eq!(blocks[0].content, "fn main() {}\n");
    }

    #[test]
    fn test_markers_split_at_every_position() {
        let text = "a🔧 CREATE_FILE: /p.md\nbody🔧 END_FILEz";
        for split in 0..=text.len() {
            if !text.is_char_boundary(split) {
                continue;
            }
            let mut parser = OperationParser::new();
            let blocks = feed_all(&mut parser, &[&text[..split], &text[split..]]);
            assert_eq!(blocks.len(), 1, "split at {}", split);
            assert_eq!(blocks[0].content, "body");
        }
    }

    #[test]
    fn test_multiple_blocks_in_order() {
        let mut parser = OperationParser::new();
        let blocks = feed_all(
            &mut parser,
            &[
                "🔧 CREATE_FILE: /a.ts\nA🔧 END_FILE\n",
                "text between\n🔧 UPDATE_FILE: /b.ts\n",
                "B1\nB2🔧 END_FILE",
            ],
        );

        let summary: Vec<(OperationKind, &str, &str)> = blocks
            .iter()
            .map(|b| (b.kind, b.path.as_str(), b.content.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (OperationKind::Create, "/a.ts", "A"),
                (OperationKind::Update, "/b.ts", "B1\nB2"),
            ]
        );
    }

    #[test]
    fn test_unterminated_block_yields_nothing() {
        let mut parser = OperationParser::new();
        let blocks = parser.feed("🔧 CREATE_FILE: /a.ts\nhalf of it");
        assert!(blocks.is_empty());
        assert!(parser.is_inside_block());
    }

    #[test]
    fn test_block_without_path_is_discarded() {
        let mut parser = OperationParser::new();
        let blocks = parser.feed("🔧 CREATE_FILE:   \nx🔧 END_FILE🔧 CREATE_FILE: /ok\ny🔧 END_FILE");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].path, "/ok");
    }

    #[test]
    fn test_plain_text_is_not_retained() {
        let mut parser = OperationParser::new();
        parser.feed(&"lorem ipsum ".repeat(1000));
        assert!(parser.pending.is_empty());

        parser.feed("ends with 🔧 CRE");
        assert_eq!(parser.pending, "🔧 CRE");
    }

    #[test]
    fn test_identical_blocks_are_both_reported() {
        // dedup belongs to the session, not the parser
        let block = "🔧 CREATE_FILE: /a.ts\nA🔧 END_FILE";
        let mut parser = OperationParser::new();
        let blocks = parser.feed(&format!("{}{}", block, block));
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].raw, blocks[1].raw);
    }
}
