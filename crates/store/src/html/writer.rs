//! HTML writer
//!
//! Produces the markup the letter editor stores: one `<p>` per paragraph,
//! tables with their layout attributes, and endnote references as spans that
//! carry the note's id, text and value.

use doc_model::{
    AnnotationMarker, DocumentTree, HeaderState, NodeData, NodeId, RunStyle, Table, TableCell,
};
use html_escape::{encode_double_quoted_attribute, encode_text};

/// Serialize a document tree to HTML
pub fn export_html(tree: &DocumentTree) -> String {
    let mut html = String::new();
    HtmlWriter::new(tree).write_blocks(&mut html, tree.root_id());
    html
}

/// Writer for one document
pub struct HtmlWriter<'a> {
    tree: &'a DocumentTree,
}

impl<'a> HtmlWriter<'a> {
    pub fn new(tree: &'a DocumentTree) -> Self {
        Self { tree }
    }

    /// Write every block child of the document root or a cell
    pub fn write_blocks(&self, html: &mut String, container_id: NodeId) {
        for &child_id in self.tree.children(container_id) {
            let Some(node) = self.tree.get(child_id) else { continue };
            match node.data() {
                NodeData::Paragraph => self.write_paragraph(html, child_id),
                NodeData::Table(table) => self.write_table(html, child_id, table),
                other => {
                    tracing::warn!("Skipping {:?} outside a paragraph", other.node_type());
                }
            }
        }
    }

    fn write_paragraph(&self, html: &mut String, paragraph_id: NodeId) {
        html.push_str("<p>");
        for &child_id in self.tree.children(paragraph_id) {
            let Some(node) = self.tree.get(child_id) else { continue };
            match node.data() {
                NodeData::TextRun(run) => write_styled_text(html, &run.text, run.style),
                // Overlays are transient; only their text is kept
                NodeData::OverlayMarker(overlay) => write_styled_text(html, &overlay.text, overlay.style),
                NodeData::AnnotationMarker(marker) => write_endnote_ref(html, marker),
                other => {
                    tracing::warn!("Skipping {:?} inside a paragraph", other.node_type());
                }
            }
        }
        html.push_str("</p>");
    }

    fn write_table(&self, html: &mut String, table_id: NodeId, table: &Table) {
        html.push_str(&format!(
            r#"<table style="{}""#,
            encode_double_quoted_attribute(&table_style(table))
        ));
        if !table.column_widths.is_empty() {
            let widths: Vec<String> = table.column_widths.iter().map(|w| format_number(*w)).collect();
            html.push_str(&format!(r#" data-column-widths="{}""#, widths.join(",")));
        }
        html.push_str("><tbody>");

        for &row_id in self.tree.children(table_id) {
            html.push_str("<tr>");
            for &cell_id in self.tree.children(row_id) {
                if let Some(cell) = self.tree.get_table_cell(cell_id) {
                    self.write_cell(html, cell_id, cell);
                }
            }
            html.push_str("</tr>");
        }

        html.push_str("</tbody></table>");
    }

    fn write_cell(&self, html: &mut String, cell_id: NodeId, cell: &TableCell) {
        let tag = if cell.header.is_header() { "th" } else { "td" };
        html.push('<');
        html.push_str(tag);
        if cell.effective_col_span() > 1 {
            html.push_str(&format!(r#" colspan="{}""#, cell.effective_col_span()));
        }
        if cell.effective_row_span() > 1 {
            html.push_str(&format!(r#" rowspan="{}""#, cell.effective_row_span()));
        }
        if let Some(state) = header_state_attr(cell.header) {
            html.push_str(&format!(r#" data-header-state="{}""#, state));
        }
        html.push('>');
        self.write_blocks(html, cell_id);
        html.push_str("</");
        html.push_str(tag);
        html.push('>');
    }
}

/// `justify-self` and, when set, `width` as one style attribute
fn table_style(table: &Table) -> String {
    let mut style = format!("justify-self: {}", table.alignment.as_css());
    if let Some(width) = table.width {
        style.push_str(&format!("; width: {}%", format_number(width)));
    }
    style
}

fn header_state_attr(header: HeaderState) -> Option<&'static str> {
    match (header.row, header.column) {
        (true, true) => Some("both"),
        (true, false) => Some("row"),
        (false, true) => Some("column"),
        (false, false) => None,
    }
}

/// Whole numbers print without a fraction
fn format_number(value: f32) -> String {
    format!("{}", value)
}

fn write_styled_text(html: &mut String, text: &str, style: RunStyle) {
    if text.is_empty() {
        return;
    }
    if style.bold {
        html.push_str("<strong>");
    }
    if style.italic {
        html.push_str("<em>");
    }
    if style.underline {
        html.push_str("<u>");
    }

    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            html.push_str("<br/>");
        }
        html.push_str(&encode_text(line));
    }

    if style.underline {
        html.push_str("</u>");
    }
    if style.italic {
        html.push_str("</em>");
    }
    if style.bold {
        html.push_str("</strong>");
    }
}

fn write_endnote_ref(html: &mut String, marker: &AnnotationMarker) {
    html.push_str(&format!(
        r#"<span class="endnote-ref" id="{}" data-endnote-id="{}" data-endnote-text="{}" data-endnote-value="{}">"#,
        encode_double_quoted_attribute(&marker.anchor_ref),
        marker.annotation_id,
        encode_double_quoted_attribute(&marker.reference_text),
        encode_double_quoted_attribute(&marker.value),
    ));
    html.push_str(&encode_text(&marker.reference_text));
    html.push_str(&format!("<sup>[{}]</sup></span>", marker.annotation_id));
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_model::{DocNode, TableAlignment};

    fn paragraph_with(tree: &mut DocumentTree, nodes: Vec<DocNode>) -> NodeId {
        let root = tree.root_id();
        let paragraph = tree.insert_node(DocNode::paragraph(), root, None).unwrap();
        for node in nodes {
            tree.insert_node(node, paragraph, None).unwrap();
        }
        paragraph
    }

    #[test]
    fn test_paragraph_with_styles_and_break() {
        let mut tree = DocumentTree::new();
        paragraph_with(
            &mut tree,
            vec![
                DocNode::text("Dear "),
                DocNode::styled_text("Officer", RunStyle::bold()),
                DocNode::text(",\nRe: <A&B>"),
            ],
        );
        assert_eq!(
            export_html(&tree),
            "<p>Dear <strong>Officer</strong>,<br/>Re: &lt;A&amp;B&gt;</p>"
        );
    }

    #[test]
    fn test_combined_styles_nest_in_order() {
        let mut tree = DocumentTree::new();
        let style = RunStyle {
            bold: true,
            italic: true,
            underline: true,
        };
        paragraph_with(&mut tree, vec![DocNode::styled_text("Urgent", style)]);
        assert_eq!(
            export_html(&tree),
            "<p><strong><em><u>Urgent</u></em></strong></p>"
        );
    }

    #[test]
    fn test_endnote_reference() {
        let mut tree = DocumentTree::new();
        paragraph_with(
            &mut tree,
            vec![
                DocNode::text("See the "),
                DocNode::annotation_marker(AnnotationMarker::new(3, "receipt", "Form \"I-797C\"")),
            ],
        );
        assert_eq!(
            export_html(&tree),
            concat!(
                r#"<p>See the <span class="endnote-ref" id="endnote-ref-3" data-endnote-id="3" "#,
                r#"data-endnote-text="receipt" data-endnote-value="Form &quot;I-797C&quot;">"#,
                "receipt<sup>[3]</sup></span></p>"
            )
        );
    }

    #[test]
    fn test_overlay_exports_as_text() {
        let mut tree = DocumentTree::new();
        paragraph_with(
            &mut tree,
            vec![
                DocNode::text("the "),
                DocNode::overlay_marker(doc_model::OverlayMarker::new(
                    "reciept",
                    vec!["receipt".into()],
                    RunStyle::italic(),
                )),
            ],
        );
        assert_eq!(export_html(&tree), "<p>the <em>reciept</em></p>");
    }

    #[test]
    fn test_table_layout_attributes() {
        let mut tree = DocumentTree::new();
        let root = tree.root_id();
        let table = Table::new()
            .with_alignment(TableAlignment::Center)
            .with_width(80.0)
            .with_column_widths(vec![120.0, 80.5]);
        let table_id = tree.insert_table(table, root, None, 1, 2).unwrap();
        let row = tree.children(table_id)[0];
        let first = tree.children(row)[0];
        tree.get_table_cell_mut(first).unwrap().header = HeaderState { row: true, column: true };

        assert_eq!(
            export_html(&tree),
            concat!(
                r#"<table style="justify-self: center; width: 80%" data-column-widths="120,80.5">"#,
                r#"<tbody><tr><th data-header-state="both"><p></p></th><td><p></p></td></tr></tbody></table>"#
            )
        );
    }

    #[test]
    fn test_spans() {
        let mut tree = DocumentTree::new();
        let root = tree.root_id();
        let table_id = tree.insert_table(Table::new(), root, None, 2, 2).unwrap();
        let first_row = tree.children(table_id)[0];
        let second_row = tree.children(table_id)[1];
        let first = tree.children(first_row)[0];
        let covered = tree.children(second_row)[0];
        tree.remove_node(covered).unwrap();
        tree.get_table_cell_mut(first).unwrap().row_span = 2;

        let html = export_html(&tree);
        assert!(html.contains(r#"<td rowspan="2"><p></p></td>"#));
        assert!(html.contains(r#"<tr><td><p></p></td></tr></tbody>"#));
    }
}
