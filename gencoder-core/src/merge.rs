//! Block merge engine
//!
//! Generated files may contain named blocks:
//!
//! ```text
//! // @gencoder.block.start: fields
//! ...regenerated on every run...
//! // @gencoder.block.end: fields
//! ```
//!
//! When a file already exists, its text outside blocks is kept as is. Each old
//! block whose identifier also appears in the freshly rendered content is
//! replaced, markers included, by the new block. Old blocks without a
//! counterpart are kept verbatim. New text outside blocks has no effect.
//!
//! Markers are detected by substring containment on the trimmed line, so a
//! marker string appearing inside ordinary code is treated as a marker.
//! Template authors must keep marker strings out of generated code.

use crate::config::BlockMarker;
use indexmap::IndexMap;

/// Start and end sentinels delimiting blocks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockMarkers {
    start: String,
    end: String,
}

/// Identifier to full block text (start and end lines included, no trailing newline)
pub type Blocks = IndexMap<String, String>;

/// Result of merging old and new content
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub content: String,
    /// Old blocks replaced by their new counterpart
    pub replaced: Vec<String>,
    /// Old blocks kept because the new content has no block with that identifier
    pub preserved: Vec<String>,
}

enum Line<'a> {
    Start(&'a str),
    End,
    Text,
}

impl BlockMarkers {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn end(&self) -> &str {
        &self.end
    }

    fn classify<'a>(&self, line: &'a str) -> Line<'a> {
        let trimmed = line.trim();
        if let Some(pos) = trimmed.find(&self.start) {
            Line::Start(trimmed[pos + self.start.len()..].trim())
        } else if trimmed.contains(&self.end) {
            Line::End
        } else {
            Line::Text
        }
    }
}

impl Default for BlockMarkers {
    fn default() -> Self {
        Self::from(&BlockMarker::default())
    }
}

impl From<&BlockMarker> for BlockMarkers {
    fn from(marker: &BlockMarker) -> Self {
        Self::new(marker.start(), marker.end())
    }
}

/// An open block while scanning
struct OpenBlock {
    id: String,
    text: String,
}

impl OpenBlock {
    fn new(id: &str, line: &str) -> Self {
        let mut text = String::with_capacity(line.len() + 1);
        text.push_str(line);
        text.push('\n');
        Self {
            id: id.to_string(),
            text,
        }
    }

    fn push(&mut self, line: &str) {
        self.text.push_str(line);
        self.text.push('\n');
    }

    fn into_block(self) -> (String, String) {
        let mut text = self.text;
        if text.ends_with('\n') {
            text.pop();
        }
        (self.id, text)
    }
}

/// Collect every block in `text`, keyed by identifier in document order
///
/// A block still open at end of input is recorded with what was accumulated.
/// A start marker inside an open block closes it and opens the next one.
pub fn extract_blocks(markers: &BlockMarkers, text: &str) -> Blocks {
    let mut blocks = Blocks::new();
    let mut current: Option<OpenBlock> = None;

    for line in text.split('\n') {
        match markers.classify(line) {
            Line::Start(id) => {
                if let Some(open) = current.take() {
                    let (id, text) = open.into_block();
                    blocks.insert(id, text);
                }
                current = Some(OpenBlock::new(id, line));
            }
            Line::End => {
                if let Some(mut open) = current.take() {
                    open.push(line);
                    let (id, text) = open.into_block();
                    blocks.insert(id, text);
                }
            }
            Line::Text => {
                if let Some(open) = current.as_mut() {
                    open.push(line);
                }
            }
        }
    }

    if let Some(open) = current {
        let (id, text) = open.into_block();
        blocks.insert(id, text);
    }

    blocks
}

/// Merge freshly rendered content into an existing file's content
pub fn merge_blocks(markers: &BlockMarkers, old_content: &str, new_content: &str) -> String {
    merge_blocks_with_report(markers, old_content, new_content).content
}

/// Same as [`merge_blocks`], also reporting which blocks were replaced or preserved
pub fn merge_blocks_with_report(
    markers: &BlockMarkers,
    old_content: &str,
    new_content: &str,
) -> MergeOutcome {
    let new_blocks = extract_blocks(markers, new_content);
    let mut outcome = MergeOutcome {
        content: String::with_capacity(old_content.len().max(new_content.len())),
        ..Default::default()
    };
    let mut current: Option<OpenBlock> = None;

    for line in old_content.split('\n') {
        match markers.classify(line) {
            Line::Start(id) => {
                if let Some(open) = current.take() {
                    flush(&mut outcome, &new_blocks, open);
                }
                current = Some(OpenBlock::new(id, line));
            }
            Line::End if current.is_some() => {
                if let Some(mut open) = current.take() {
                    open.push(line);
                    flush(&mut outcome, &new_blocks, open);
                }
            }
            _ => match current.as_mut() {
                Some(open) => open.push(line),
                None => {
                    outcome.content.push_str(line);
                    outcome.content.push('\n');
                }
            },
        }
    }

    if let Some(open) = current {
        flush(&mut outcome, &new_blocks, open);
    }

    if outcome.content.ends_with('\n') {
        outcome.content.pop();
    }
    outcome
}

fn flush(outcome: &mut MergeOutcome, new_blocks: &Blocks, open: OpenBlock) {
    let (id, old_text) = open.into_block();
    match new_blocks.get(&id) {
        Some(new_text) => {
            outcome.content.push_str(new_text);
            outcome.replaced.push(id);
        }
        None => {
            outcome.content.push_str(&old_text);
            outcome.preserved.push(id);
        }
    }
    outcome.content.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markers() -> BlockMarkers {
        BlockMarkers::new("gencoder block start:", "gencoder block end:")
    }

    #[test]
    fn test_extract_blocks() {
        let content = "
out of block
gencoder block start: block1
block1
block1
gencoder block end: block1

gencoder block start: block2
block2
block2
gencoder block end: block2
out of block
";
        let blocks = extract_blocks(&markers(), content);

        assert_eq!(blocks.len(), 2);
        assert_eq!(
            blocks["block1"],
            "gencoder block start: block1\nblock1\nblock1\ngencoder block end: block1"
        );
        assert_eq!(
            blocks["block2"],
            "gencoder block start: block2\nblock2\nblock2\ngencoder block end: block2"
        );
    }

    #[test]
    fn test_extract_blocks_document_order() {
        let content = "gencoder block start: z\ngencoder block end: z\n\
                       gencoder block start: a\ngencoder block end: a\n\
                       gencoder block start: m\ngencoder block end: m";
        let blocks = extract_blocks(&markers(), content);
        let ids: Vec<_> = blocks.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["z", "a", "m"]);
        assert_eq!(extract_blocks(&markers(), content), blocks);
    }

    #[test]
    fn test_extract_unterminated_block() {
        let content = "head\n// gencoder block start: tail\nline 1\nline 2";
        let blocks = extract_blocks(&markers(), content);
        assert_eq!(blocks["tail"], "// gencoder block start: tail\nline 1\nline 2");
    }

    #[test]
    fn test_extract_start_inside_open_block() {
        let content = "gencoder block start: a\nx\ngencoder block start: b\ny\ngencoder block end: b";
        let blocks = extract_blocks(&markers(), content);
        assert_eq!(blocks["a"], "gencoder block start: a\nx");
        assert_eq!(blocks["b"], "gencoder block start: b\ny\ngencoder block end: b");
    }

    #[test]
    fn test_identifier_is_trimmed() {
        let content = "  /* gencoder block start:   spaced id   \n  */ gencoder block end:";
        let blocks = extract_blocks(&markers(), content);
        assert!(blocks.contains_key("spaced id"));
    }

    #[test]
    fn test_replace_matching_block() {
        let old = "header
gencoder block start: A
old-A
gencoder block end: A
middle
gencoder block start: B
old-B
gencoder block end: B
footer";
        let new = "new header
gencoder block start: A
new-A
gencoder block end: A
new footer";

        let outcome = merge_blocks_with_report(&markers(), old, new);

        assert_eq!(
            outcome.content,
            "header
gencoder block start: A
new-A
gencoder block end: A
middle
gencoder block start: B
old-B
gencoder block end: B
footer"
        );
        assert_eq!(outcome.replaced, vec!["A"]);
        assert_eq!(outcome.preserved, vec!["B"]);
    }

    #[test]
    fn test_merge_start_inside_open_block() {
        let old = "top
gencoder block start: a
old-a
gencoder block start: b
old-b
gencoder block end: b
bottom";
        let new = "gencoder block start: a
new-a
gencoder block end: a
gencoder block start: b
new-b
gencoder block end: b";

        let outcome = merge_blocks_with_report(&markers(), old, new);

        assert_eq!(
            outcome.content,
            "top
gencoder block start: a
new-a
gencoder block end: a
gencoder block start: b
new-b
gencoder block end: b
bottom"
        );
        assert_eq!(outcome.replaced, vec!["a", "b"]);
        assert!(outcome.preserved.is_empty());
    }

    #[test]
    fn test_unmatched_block_preserved() {
        let old = "gencoder block start: C\nkeep-me\ngencoder block end: C\n";
        let new = "gencoder block start: D\nother\ngencoder block end: D\n";

        let merged = merge_blocks(&markers(), old, new);
        assert_eq!(merged, old);
    }

    #[test]
    fn test_new_markers_replace_old_markers() {
        let old = "// gencoder block start: A\nold\n// gencoder block end: A";
        let new = "# gencoder block start: A\nnew\n# gencoder block end: A";
        assert_eq!(merge_blocks(&markers(), old, new), new);
    }

    #[test]
    fn test_idempotent_with_identical_blocks() {
        let old = "user code\n\
                   gencoder block start: fields\n\
                   a: i32,\n\
                   gencoder block end: fields\n\
                   more user code\n";
        assert_eq!(merge_blocks(&markers(), old, old), old);
    }

    #[test]
    fn test_idempotent_preserves_crlf() {
        let old = "a\r\ngencoder block start: x\r\nbody\r\ngencoder block end: x\r\nz\r\n";
        assert_eq!(merge_blocks(&markers(), old, old), old);
    }

    #[test]
    fn test_no_trailing_newline_is_kept() {
        let old = "line one\nline two";
        assert_eq!(merge_blocks(&markers(), old, "whatever"), old);
    }

    #[test]
    fn test_unterminated_old_block_is_replaced() {
        let old = "top\ngencoder block start: A\nstale";
        let new = "gencoder block start: A\nfresh\ngencoder block end: A";
        assert_eq!(
            merge_blocks(&markers(), old, new),
            "top\ngencoder block start: A\nfresh\ngencoder block end: A"
        );
    }

    #[test]
    fn test_stray_end_marker_outside_block_is_text() {
        let old = "gencoder block end: nothing\nbody";
        assert_eq!(merge_blocks(&markers(), old, ""), old);
    }

    #[test]
    fn test_marker_inside_code_is_misdetected() {
        // Known limitation: containment, not prefix matching.
        let old = "// see gencoder block start: x\nrest";
        let new = "gencoder block start: x\nreplacement\ngencoder block end: x";
        assert_eq!(
            merge_blocks(&markers(), old, new),
            "gencoder block start: x\nreplacement\ngencoder block end: x"
        );
    }

    #[test]
    fn test_default_markers() {
        let markers = BlockMarkers::default();
        assert_eq!(markers.start(), "@gencoder.block.start:");
        assert_eq!(markers.end(), "@gencoder.block.end:");
    }
}
