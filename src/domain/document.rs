//! Parsed README document.
//!
//! The Markdown parser's own tree is converted into this closed set of node
//! kinds before rendering, so the block renderer can match exhaustively and a
//! new kind is a compile-time decision.

/// Bullet or numbered list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Unordered,
    Ordered { start: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Header,
    Body,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    None,
    Left,
    Center,
    Right,
}

impl Alignment {
    pub fn as_attr(&self) -> Option<&'static str> {
        match self {
            Alignment::None => None,
            Alignment::Left => Some("left"),
            Alignment::Center => Some("center"),
            Alignment::Right => Some("right"),
        }
    }
}

/// Where embedded markup appeared in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawPlacement {
    Block,
    Inline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxNode {
    Heading {
        level: u8,
        children: Vec<SyntaxNode>,
    },
    Paragraph(Vec<SyntaxNode>),
    /// Tight lists render their item paragraphs without `<p>` wrappers.
    List {
        kind: ListKind,
        tight: bool,
        items: Vec<SyntaxNode>,
    },
    ListItem(Vec<SyntaxNode>),
    BlockQuote(Vec<SyntaxNode>),
    Table {
        rows: Vec<SyntaxNode>,
    },
    TableRow {
        header: bool,
        cells: Vec<SyntaxNode>,
    },
    TableCell {
        kind: CellKind,
        alignment: Alignment,
        children: Vec<SyntaxNode>,
    },
    Link {
        href: String,
        title: String,
        children: Vec<SyntaxNode>,
    },
    Image {
        src: String,
        alt: String,
        title: String,
    },
    /// Fenced or indented code. `declared` is the first word of the info string.
    CodeBlock {
        literal: String,
        declared: Option<String>,
    },
    InlineCode(String),
    Text(String),
    Emphasis(Vec<SyntaxNode>),
    Strong(Vec<SyntaxNode>),
    Strikethrough(Vec<SyntaxNode>),
    SoftBreak,
    LineBreak,
    ThematicBreak,
    RawMarkup {
        placement: RawPlacement,
        literal: String,
    },
}

impl SyntaxNode {
    /// Stable lowercase name used in rendered metadata.
    pub fn kind_name(&self) -> &'static str {
        match self {
            SyntaxNode::Heading { .. } => "heading",
            SyntaxNode::Paragraph(_) => "paragraph",
            SyntaxNode::List { .. } => "list",
            SyntaxNode::ListItem(_) => "list_item",
            SyntaxNode::BlockQuote(_) => "blockquote",
            SyntaxNode::Table { .. } => "table",
            SyntaxNode::TableRow { .. } => "table_row",
            SyntaxNode::TableCell { .. } => "table_cell",
            SyntaxNode::Link { .. } => "link",
            SyntaxNode::Image { .. } => "image",
            SyntaxNode::CodeBlock { .. } => "code_block",
            SyntaxNode::InlineCode(_) => "inline_code",
            SyntaxNode::Text(_) => "text",
            SyntaxNode::Emphasis(_) => "emphasis",
            SyntaxNode::Strong(_) => "strong",
            SyntaxNode::Strikethrough(_) => "strikethrough",
            SyntaxNode::SoftBreak => "soft_break",
            SyntaxNode::LineBreak => "line_break",
            SyntaxNode::ThematicBreak => "thematic_break",
            SyntaxNode::RawMarkup { .. } => "raw_markup",
        }
    }

    /// Concatenated plain text of this node and its descendants.
    pub fn plain_text(&self) -> String {
        let mut buffer = String::new();
        collect_text(self, &mut buffer);
        buffer
    }
}

fn collect_text(node: &SyntaxNode, buffer: &mut String) {
    match node {
        SyntaxNode::Text(text) | SyntaxNode::InlineCode(text) => buffer.push_str(text),
        SyntaxNode::SoftBreak | SyntaxNode::LineBreak => buffer.push(' '),
        SyntaxNode::Image { alt, .. } => buffer.push_str(alt),
        SyntaxNode::CodeBlock { literal, .. } => buffer.push_str(literal),
        SyntaxNode::Heading { children, .. }
        | SyntaxNode::Paragraph(children)
        | SyntaxNode::ListItem(children)
        | SyntaxNode::BlockQuote(children)
        | SyntaxNode::TableCell { children, .. }
        | SyntaxNode::Link { children, .. }
        | SyntaxNode::Emphasis(children)
        | SyntaxNode::Strong(children)
        | SyntaxNode::Strikethrough(children) => {
            children.iter().for_each(|child| collect_text(child, buffer))
        }
        SyntaxNode::List { items, .. } => items.iter().for_each(|item| collect_text(item, buffer)),
        SyntaxNode::Table { rows } => rows.iter().for_each(|row| collect_text(row, buffer)),
        SyntaxNode::TableRow { cells, .. } => {
            cells.iter().for_each(|cell| collect_text(cell, buffer))
        }
        SyntaxNode::ThematicBreak | SyntaxNode::RawMarkup { .. } => {}
    }
}

/// Top-level blocks of one README, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    pub blocks: Vec<SyntaxNode>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_flattens_inline_children() {
        let node = SyntaxNode::Paragraph(vec![
            SyntaxNode::Text("Run ".into()),
            SyntaxNode::InlineCode("cargo".into()),
            SyntaxNode::SoftBreak,
            SyntaxNode::Strong(vec![SyntaxNode::Text("now".into())]),
        ]);
        assert_eq!(node.plain_text(), "Run cargo now");
    }
}
