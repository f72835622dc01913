//! HTML reader
//!
//! Tolerant parser for stored letters and pasted markup. Unknown tags are
//! transparent, void elements may be left unclosed, and loose inline text is
//! wrapped in an implicit paragraph.

use crate::error::HtmlResult;
use doc_model::{
    AnnotationMarker, AnnotationRegistry, DocNode, DocumentTree, HeaderState, NodeId, NodeType,
    RunStyle, Table, TableAlignment, TableCell,
};
use html_escape::decode_html_entities;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Parse HTML into a document tree.
///
/// The tree's endnote registry starts as a copy of `registry` (seeded from
/// the letter's metadata). Every endnote span keeps its serialized id; a
/// span without an inline value takes the value from the registry.
pub fn import_html(html: &str, registry: &AnnotationRegistry) -> HtmlResult<DocumentTree> {
    let mut reader = Reader::from_str(html);
    let config = reader.config_mut();
    config.trim_text(false);
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut builder = TreeBuilder::new(registry);
    loop {
        match reader.read_event()? {
            Event::Start(ref e) => {
                let tag = tag_name(e);
                if is_void(&tag) {
                    builder.empty_element(&tag, e)?;
                } else {
                    builder.open_element(tag, e)?;
                }
            }
            Event::Empty(ref e) => {
                let tag = tag_name(e);
                builder.empty_element(&tag, e)?;
            }
            Event::End(ref e) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
                builder.close_element(&tag)?;
            }
            Event::Text(ref e) => {
                let raw = String::from_utf8_lossy(e);
                builder.text(&decode_html_entities(&raw))?;
            }
            Event::CData(ref e) => {
                builder.text(&String::from_utf8_lossy(e))?;
            }
            Event::Eof => break,
            _ => {}
        }
    }
    builder.finish()
}

/// Elements that never have content or an end tag
fn is_void(tag: &str) -> bool {
    matches!(
        tag,
        "br" | "hr" | "img" | "input" | "meta" | "link" | "col" | "area" | "base" | "wbr" | "source"
    )
}

fn tag_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase()
}

/// Attribute value with entities decoded. Valueless and malformed
/// attributes are ignored.
fn attribute(e: &BytesStart, name: &str) -> Option<String> {
    e.attributes()
        .with_checks(false)
        .filter_map(|a| a.ok())
        .find(|a| a.key.as_ref().eq_ignore_ascii_case(name.as_bytes()))
        .map(|a| decode_html_entities(&String::from_utf8_lossy(&a.value)).into_owned())
}

fn parse_span(value: Option<String>) -> u32 {
    value
        .and_then(|v| v.trim().parse::<u32>().ok())
        .unwrap_or(1)
        .max(1)
}

/// Read `justify-self` and `width` from a table's style attribute
fn parse_table_style(style: &str, table: &mut Table) {
    for declaration in style.split(';') {
        let Some((property, value)) = declaration.split_once(':') else { continue };
        match property.trim().to_ascii_lowercase().as_str() {
            "justify-self" => {
                if let Some(alignment) = TableAlignment::from_css(value) {
                    table.alignment = alignment;
                }
            }
            "width" => {
                let value = value.trim();
                if let Some(percent) = value.strip_suffix('%').and_then(|v| v.trim().parse::<f32>().ok()) {
                    table.width = Some(percent);
                } else {
                    tracing::debug!("Ignoring non-percentage table width '{}'", value);
                }
            }
            _ => {}
        }
    }
}

fn parse_column_widths(value: &str) -> Option<Vec<f32>> {
    value
        .split(',')
        .map(|w| w.trim().parse::<f32>().ok())
        .collect()
}

fn parse_header_state(tag: &str, value: Option<String>) -> HeaderState {
    match value.as_deref().map(str::trim) {
        Some("both") => HeaderState { row: true, column: true },
        Some("row") => HeaderState { row: true, column: false },
        Some("column") => HeaderState { row: false, column: true },
        Some(_) => HeaderState::NONE,
        // A bare <th> is treated as part of a header row
        None if tag == "th" => HeaderState { row: true, column: false },
        None => HeaderState::NONE,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StyleFlag {
    Bold,
    Italic,
    Underline,
}

/// Endnote span being read
#[derive(Debug, Default)]
struct PendingEndnote {
    id: Option<u32>,
    text: Option<String>,
    value: Option<String>,
    collected: String,
}

#[derive(Debug)]
enum Frame {
    Paragraph(NodeId),
    Style(StyleFlag),
    Table(NodeId),
    Row(NodeId),
    Cell(NodeId),
    Endnote(PendingEndnote),
    /// `<sup>` holding an endnote's number
    EndnoteNumber,
    /// Content of `<script>`, `<style>` and the like is dropped
    Skip,
    Transparent,
}

#[derive(Debug)]
struct OpenElement {
    tag: String,
    frame: Frame,
}

struct TreeBuilder<'a> {
    tree: DocumentTree,
    seed: &'a AnnotationRegistry,
    stack: Vec<OpenElement>,
    /// Paragraph opened for loose inline text
    implicit: Option<NodeId>,
}

impl<'a> TreeBuilder<'a> {
    fn new(seed: &'a AnnotationRegistry) -> Self {
        let mut tree = DocumentTree::new();
        *tree.annotations_mut() = seed.clone();
        Self {
            tree,
            seed,
            stack: Vec::new(),
            implicit: None,
        }
    }

    // =========================================================================
    // Context
    // =========================================================================

    /// Innermost block container: a cell, or the root. `None` while inside
    /// a table or row without an open cell.
    fn container(&self) -> Option<NodeId> {
        for open in self.stack.iter().rev() {
            match open.frame {
                Frame::Cell(id) => return Some(id),
                Frame::Table(_) | Frame::Row(_) => return None,
                _ => {}
            }
        }
        Some(self.tree.root_id())
    }

    /// Explicit paragraph open in the current container
    fn open_paragraph(&self) -> Option<NodeId> {
        for open in self.stack.iter().rev() {
            match open.frame {
                Frame::Paragraph(id) => return Some(id),
                Frame::Cell(_) | Frame::Table(_) | Frame::Row(_) => return None,
                _ => {}
            }
        }
        None
    }

    fn skipping(&self) -> bool {
        self.stack.iter().any(|open| matches!(open.frame, Frame::Skip))
    }

    fn pending_endnote(&mut self) -> Option<&mut PendingEndnote> {
        self.stack.iter_mut().rev().find_map(|open| match &mut open.frame {
            Frame::Endnote(pending) => Some(pending),
            _ => None,
        })
    }

    fn in_endnote_number(&self) -> bool {
        self.stack.iter().any(|open| matches!(open.frame, Frame::EndnoteNumber))
    }

    fn current_style(&self) -> RunStyle {
        let mut style = RunStyle::plain();
        for open in &self.stack {
            match open.frame {
                Frame::Style(StyleFlag::Bold) => style.bold = true,
                Frame::Style(StyleFlag::Italic) => style.italic = true,
                Frame::Style(StyleFlag::Underline) => style.underline = true,
                _ => {}
            }
        }
        style
    }

    /// Paragraph that inline content goes into, creating an implicit one
    /// when needed
    fn inline_target(&mut self) -> HtmlResult<Option<NodeId>> {
        if let Some(paragraph) = self.open_paragraph() {
            return Ok(Some(paragraph));
        }
        let Some(container) = self.container() else {
            return Ok(None);
        };
        if let Some(paragraph) = self.implicit {
            if self.tree.parent(paragraph) == Some(container) {
                return Ok(Some(paragraph));
            }
        }
        let paragraph = self.tree.insert_node(DocNode::paragraph(), container, None)?;
        self.implicit = Some(paragraph);
        Ok(Some(paragraph))
    }

    fn innermost(&self, matches: impl Fn(&Frame) -> bool) -> Option<usize> {
        self.stack.iter().rposition(|open| matches(&open.frame))
    }

    // =========================================================================
    // Events
    // =========================================================================

    fn open_element(&mut self, tag: String, e: &BytesStart) -> HtmlResult<()> {
        let frame = match tag.as_str() {
            "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "li" => {
                // A block start ends any paragraph still open
                if let Some(index) = self.innermost(|f| matches!(f, Frame::Paragraph(_))) {
                    if self.open_paragraph().is_some() {
                        self.pop_to(index)?;
                    }
                }
                self.implicit = None;
                match self.container() {
                    Some(container) => Frame::Paragraph(self.tree.insert_node(DocNode::paragraph(), container, None)?),
                    None => {
                        tracing::warn!("Ignoring <{}> directly inside a table", tag);
                        Frame::Transparent
                    }
                }
            }
            "strong" | "b" => Frame::Style(StyleFlag::Bold),
            "em" | "i" => Frame::Style(StyleFlag::Italic),
            "u" => Frame::Style(StyleFlag::Underline),
            "table" => self.open_table(e)?,
            "tr" => self.open_row()?,
            "td" | "th" => self.open_cell(&tag, e)?,
            "span" if self.is_endnote_span(e) => Frame::Endnote(PendingEndnote {
                id: attribute(e, "data-endnote-id").and_then(|v| v.trim().parse().ok()),
                text: attribute(e, "data-endnote-text"),
                value: attribute(e, "data-endnote-value"),
                collected: String::new(),
            }),
            "sup" if self.innermost(|f| matches!(f, Frame::Endnote(_))).is_some() => Frame::EndnoteNumber,
            "script" | "style" | "head" | "title" | "template" => Frame::Skip,
            "div" | "blockquote" | "ul" | "ol" | "section" | "article" => {
                self.implicit = None;
                Frame::Transparent
            }
            _ => Frame::Transparent,
        };
        self.stack.push(OpenElement { tag, frame });
        Ok(())
    }

    fn is_endnote_span(&self, e: &BytesStart) -> bool {
        attribute(e, "data-endnote-id").is_some()
            || attribute(e, "class").is_some_and(|class| class.split_whitespace().any(|c| c == "endnote-ref"))
    }

    fn open_table(&mut self, e: &BytesStart) -> HtmlResult<Frame> {
        // Tables end an open paragraph, as in HTML
        if self.open_paragraph().is_some() {
            if let Some(index) = self.innermost(|f| matches!(f, Frame::Paragraph(_))) {
                self.pop_to(index)?;
            }
        }
        self.implicit = None;
        let Some(container) = self.container() else {
            tracing::warn!("Ignoring a table nested directly in another table");
            return Ok(Frame::Transparent);
        };

        let mut table = Table::new();
        if let Some(style) = attribute(e, "style") {
            parse_table_style(&style, &mut table);
        }
        if let Some(widths) = attribute(e, "data-column-widths") {
            match parse_column_widths(&widths) {
                Some(widths) => table.column_widths = widths,
                None => tracing::warn!("Ignoring malformed column widths '{}'", widths),
            }
        }
        let table_id = self.tree.insert_node(DocNode::table(table), container, None)?;
        Ok(Frame::Table(table_id))
    }

    fn open_row(&mut self) -> HtmlResult<Frame> {
        let Some(table_index) = self.innermost(|f| matches!(f, Frame::Table(_))) else {
            tracing::warn!("Ignoring <tr> outside a table");
            return Ok(Frame::Transparent);
        };
        // An unclosed row or cell of the same table ends here
        if let Some(row_index) = self.innermost(|f| matches!(f, Frame::Row(_))) {
            if row_index > table_index {
                self.pop_to(row_index)?;
            }
        }
        let Frame::Table(table_id) = self.stack[table_index].frame else {
            return Ok(Frame::Transparent);
        };
        let row_id = self.tree.insert_node(DocNode::table_row(), table_id, None)?;
        Ok(Frame::Row(row_id))
    }

    fn open_cell(&mut self, tag: &str, e: &BytesStart) -> HtmlResult<Frame> {
        let Some(table_index) = self.innermost(|f| matches!(f, Frame::Table(_))) else {
            tracing::warn!("Ignoring <{}> outside a table", tag);
            return Ok(Frame::Transparent);
        };
        if let Some(cell_index) = self.innermost(|f| matches!(f, Frame::Cell(_))) {
            if cell_index > table_index {
                self.pop_to(cell_index)?;
            }
        }

        let row_id = match self.innermost(|f| matches!(f, Frame::Row(_))) {
            Some(index) if index > table_index => match self.stack[index].frame {
                Frame::Row(id) => id,
                _ => return Ok(Frame::Transparent),
            },
            _ => {
                // Cell without a row: open one implicitly
                let frame = self.open_row()?;
                let Frame::Row(id) = frame else { return Ok(Frame::Transparent) };
                self.stack.push(OpenElement {
                    tag: "tr".into(),
                    frame,
                });
                id
            }
        };

        let cell = TableCell {
            row_span: parse_span(attribute(e, "rowspan")),
            col_span: parse_span(attribute(e, "colspan")),
            header: parse_header_state(tag, attribute(e, "data-header-state")),
            ..TableCell::new()
        };
        let cell_id = self.tree.insert_node(DocNode::table_cell(cell), row_id, None)?;
        self.implicit = None;
        Ok(Frame::Cell(cell_id))
    }

    fn empty_element(&mut self, tag: &str, e: &BytesStart) -> HtmlResult<()> {
        if self.skipping() {
            return Ok(());
        }
        match tag {
            "br" => {
                if let Some(pending) = self.pending_endnote() {
                    pending.collected.push(' ');
                    return Ok(());
                }
                let style = self.current_style();
                if let Some(paragraph) = self.inline_target()? {
                    self.tree.insert_node(DocNode::styled_text("\n", style), paragraph, None)?;
                }
            }
            "p" => {
                // <p/> is an empty paragraph
                self.open_element("p".into(), e)?;
                self.close_element("p")?;
            }
            "td" | "th" => {
                let frame = self.open_cell(tag, e)?;
                self.stack.push(OpenElement { tag: tag.into(), frame });
                self.close_element(tag)?;
            }
            _ => {}
        }
        Ok(())
    }

    fn close_element(&mut self, tag: &str) -> HtmlResult<()> {
        match self.stack.iter().rposition(|open| open.tag == tag) {
            Some(index) => self.pop_to(index),
            None => {
                tracing::debug!("Ignoring stray </{}>", tag);
                Ok(())
            }
        }
    }

    fn text(&mut self, text: &str) -> HtmlResult<()> {
        if text.is_empty() || self.skipping() {
            return Ok(());
        }
        if self.in_endnote_number() {
            return Ok(());
        }
        let text = text.replace(['\r', '\n', '\t'], " ");
        if let Some(pending) = self.pending_endnote() {
            pending.collected.push_str(&text);
            return Ok(());
        }

        // Formatting whitespace between blocks
        if text.trim().is_empty() && self.open_paragraph().is_none() && self.implicit_is_closed() {
            return Ok(());
        }

        let style = self.current_style();
        match self.inline_target()? {
            Some(paragraph) => {
                self.tree.insert_node(DocNode::styled_text(text, style), paragraph, None)?;
            }
            None => tracing::debug!("Dropping text placed directly inside a table"),
        }
        Ok(())
    }

    fn implicit_is_closed(&self) -> bool {
        match (self.implicit, self.container()) {
            (Some(paragraph), Some(container)) => self.tree.parent(paragraph) != Some(container),
            _ => true,
        }
    }

    /// Close the element at `index` and everything opened after it
    fn pop_to(&mut self, index: usize) -> HtmlResult<()> {
        while self.stack.len() > index {
            if let Some(open) = self.stack.pop() {
                self.finish_frame(open.frame)?;
            }
        }
        Ok(())
    }

    fn finish_frame(&mut self, frame: Frame) -> HtmlResult<()> {
        match frame {
            Frame::Cell(cell_id) => {
                if self.tree.children(cell_id).is_empty() {
                    self.tree.insert_node(DocNode::paragraph(), cell_id, None)?;
                }
                self.implicit = None;
            }
            Frame::Table(table_id) => {
                if self.tree.children(table_id).is_empty() {
                    tracing::warn!("Dropping a table without rows");
                    self.tree.remove_node(table_id)?;
                }
                self.implicit = None;
            }
            Frame::Endnote(pending) => self.finish_endnote(pending)?,
            Frame::Paragraph(_) => self.implicit = None,
            Frame::Row(_) | Frame::Style(_) | Frame::EndnoteNumber | Frame::Skip | Frame::Transparent => {}
        }
        Ok(())
    }

    fn finish_endnote(&mut self, pending: PendingEndnote) -> HtmlResult<()> {
        let reference_text = pending
            .text
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| pending.collected.trim().to_string());
        let Some(paragraph) = self.inline_target()? else {
            return Ok(());
        };

        let id = match pending.id {
            Some(id) if id > 0 => id,
            _ => {
                tracing::warn!("Endnote reference without a valid id, keeping its text");
                let style = self.current_style();
                self.tree
                    .insert_node(DocNode::styled_text(reference_text, style), paragraph, None)?;
                return Ok(());
            }
        };

        let value = pending
            .value
            .or_else(|| self.seed.get(id).map(|entry| entry.value.clone()))
            .unwrap_or_default();
        if self.tree.find_annotation_marker(id).is_some() {
            tracing::warn!("Endnote {} is referenced more than once", id);
        }
        let marker = AnnotationMarker::new(id, reference_text.clone(), value.clone());
        self.tree.insert_node(DocNode::annotation_marker(marker), paragraph, None)?;
        self.tree.annotations_mut().register(id, reference_text, value);
        Ok(())
    }

    fn finish(mut self) -> HtmlResult<DocumentTree> {
        self.pop_to(0)?;

        let root = self.tree.root_id();
        if self.tree.children(root).is_empty() {
            self.tree.insert_node(DocNode::paragraph(), root, None)?;
        }
        for paragraph in self.tree.nodes_of_type(NodeType::Paragraph) {
            self.tree.merge_adjacent_runs(paragraph)?;
        }
        self.tree.validate()?;
        Ok(self.tree)
    }
}
