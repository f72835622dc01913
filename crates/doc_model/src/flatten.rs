//! Plain-text view of a document with a map back to the owning nodes

use crate::text::char_len;
use crate::{DocNode, DocumentTree, NodeId, NodeType};

/// The char range one text-bearing node occupies in the flattened text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSegment {
    pub node_id: NodeId,
    pub node_type: NodeType,
    pub start: usize,
    pub end: usize,
}

impl TextSegment {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Document text with paragraphs joined by `'\n'`, offsets in chars
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatText {
    pub text: String,
    pub segments: Vec<TextSegment>,
}

impl FlatText {
    /// The single segment whose range contains `[start, end)`
    pub fn segment_containing(&self, start: usize, end: usize) -> Option<&TextSegment> {
        if start >= end {
            return None;
        }
        self.segments
            .iter()
            .find(|segment| !segment.is_empty() && segment.start <= start && end <= segment.end)
    }

    pub fn char_len(&self) -> usize {
        char_len(&self.text)
    }
}

impl DocumentTree {
    /// Flatten the document in reading order. Table cell paragraphs count as
    /// paragraphs; annotation and overlay markers contribute their text.
    pub fn flatten(&self) -> FlatText {
        let mut flat = FlatText::default();
        let mut offset = 0;
        let mut first_block = true;

        for id in self.descendants(self.root_id()) {
            let Some(node) = self.get(id) else { continue };
            match node.node_type() {
                NodeType::Paragraph => {
                    if !first_block {
                        flat.text.push('\n');
                        offset += 1;
                    }
                    first_block = false;
                }
                NodeType::TextRun | NodeType::AnnotationMarker | NodeType::OverlayMarker => {
                    let text = node.text_content().unwrap_or_default();
                    let len = char_len(text);
                    flat.text.push_str(text);
                    flat.segments.push(TextSegment {
                        node_id: id,
                        node_type: node.node_type(),
                        start: offset,
                        end: offset + len,
                    });
                    offset += len;
                }
                NodeType::Document | NodeType::Table | NodeType::TableRow | NodeType::TableCell => {}
            }
        }
        flat
    }

    /// The whole document as plain text
    pub fn text_content(&self) -> String {
        self.flatten().text
    }

    /// Text of one inline node, if it carries any
    pub fn node_text(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(DocNode::text_content)
    }
}
