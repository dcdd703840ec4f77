//! Conversion from the comrak AST into [`Document`].

use comrak::nodes::{AstNode, ListType, NodeValue, TableAlignment};

use crate::application::render::types::RenderError;
use crate::domain::document::{
    Alignment, CellKind, Document, ListKind, RawPlacement, SyntaxNode,
};

/// Convert a parsed tree. Fails when nesting exceeds `max_depth`.
pub(crate) fn to_document<'a>(
    root: &'a AstNode<'a>,
    max_depth: usize,
) -> Result<Document, RenderError> {
    let converter = Converter { max_depth };
    let blocks = converter.children(root, 0)?;
    Ok(Document { blocks })
}

struct Converter {
    max_depth: usize,
}

impl Converter {
    fn children(&self, node: &AstNode<'_>, depth: usize) -> Result<Vec<SyntaxNode>, RenderError> {
        let mut converted = Vec::new();
        let mut child = node.first_child();
        while let Some(next) = child {
            self.convert_into(next, depth + 1, &mut converted)?;
            child = next.next_sibling();
        }
        Ok(converted)
    }

    fn convert_into(
        &self,
        node: &AstNode<'_>,
        depth: usize,
        out: &mut Vec<SyntaxNode>,
    ) -> Result<(), RenderError> {
        if depth > self.max_depth {
            return Err(RenderError::NestingTooDeep {
                limit: self.max_depth,
            });
        }

        let data = node.data.borrow();
        let converted = match &data.value {
            NodeValue::Heading(heading) => SyntaxNode::Heading {
                level: heading.level.clamp(1, 6),
                children: self.children(node, depth)?,
            },
            NodeValue::Paragraph => SyntaxNode::Paragraph(self.children(node, depth)?),
            NodeValue::List(list) => SyntaxNode::List {
                kind: match list.list_type {
                    ListType::Ordered => ListKind::Ordered { start: list.start },
                    ListType::Bullet => ListKind::Unordered,
                },
                tight: list.tight,
                items: self.children(node, depth)?,
            },
            NodeValue::Item(_) => SyntaxNode::ListItem(self.children(node, depth)?),
            NodeValue::BlockQuote => SyntaxNode::BlockQuote(self.children(node, depth)?),
            NodeValue::Table(table) => {
                let alignments: Vec<Alignment> =
                    table.alignments.iter().map(convert_alignment).collect();
                SyntaxNode::Table {
                    rows: self.table_rows(node, &alignments, depth)?,
                }
            }
            NodeValue::CodeBlock(block) => SyntaxNode::CodeBlock {
                literal: block.literal.clone(),
                declared: block
                    .info
                    .split_whitespace()
                    .next()
                    .map(|word| word.to_string()),
            },
            NodeValue::HtmlBlock(block) => SyntaxNode::RawMarkup {
                placement: RawPlacement::Block,
                literal: block.literal.clone(),
            },
            NodeValue::HtmlInline(literal) => SyntaxNode::RawMarkup {
                placement: RawPlacement::Inline,
                literal: literal.to_string(),
            },
            NodeValue::ThematicBreak => SyntaxNode::ThematicBreak,
            NodeValue::Text(text) => SyntaxNode::Text(text.to_string()),
            NodeValue::Code(code) => SyntaxNode::InlineCode(code.literal.clone()),
            NodeValue::SoftBreak => SyntaxNode::SoftBreak,
            NodeValue::LineBreak => SyntaxNode::LineBreak,
            NodeValue::Emph => SyntaxNode::Emphasis(self.children(node, depth)?),
            NodeValue::Strong => SyntaxNode::Strong(self.children(node, depth)?),
            NodeValue::Strikethrough => SyntaxNode::Strikethrough(self.children(node, depth)?),
            NodeValue::Link(link) => SyntaxNode::Link {
                href: link.url.clone(),
                title: link.title.clone(),
                children: self.children(node, depth)?,
            },
            NodeValue::Image(link) => SyntaxNode::Image {
                src: link.url.clone(),
                alt: collapse_whitespace(&collect_inline_text(node)),
                title: link.title.clone(),
            },
            // Anything else contributes only its content.
            _ => {
                let children = self.children(node, depth)?;
                out.extend(children);
                return Ok(());
            }
        };

        out.push(converted);
        Ok(())
    }

    fn table_rows(
        &self,
        table: &AstNode<'_>,
        alignments: &[Alignment],
        depth: usize,
    ) -> Result<Vec<SyntaxNode>, RenderError> {
        let mut rows = Vec::new();
        let mut row = table.first_child();
        while let Some(current) = row {
            let header = matches!(current.data.borrow().value, NodeValue::TableRow(true));
            let mut cells = Vec::new();
            let mut cell = current.first_child();
            let mut column = 0;
            while let Some(next) = cell {
                if depth + 2 > self.max_depth {
                    return Err(RenderError::NestingTooDeep {
                        limit: self.max_depth,
                    });
                }
                cells.push(SyntaxNode::TableCell {
                    kind: if header { CellKind::Header } else { CellKind::Body },
                    alignment: alignments.get(column).copied().unwrap_or_default(),
                    children: self.children(next, depth + 2)?,
                });
                column += 1;
                cell = next.next_sibling();
            }
            rows.push(SyntaxNode::TableRow { header, cells });
            row = current.next_sibling();
        }
        Ok(rows)
    }
}

fn convert_alignment(alignment: &TableAlignment) -> Alignment {
    match alignment {
        TableAlignment::None => Alignment::None,
        TableAlignment::Left => Alignment::Left,
        TableAlignment::Center => Alignment::Center,
        TableAlignment::Right => Alignment::Right,
    }
}

fn collect_inline_text(node: &AstNode<'_>) -> String {
    fn walk(node: &AstNode<'_>, buffer: &mut String) {
        {
            let data = node.data.borrow();
            match &data.value {
                NodeValue::Text(text) => buffer.push_str(text),
                NodeValue::Code(code) => buffer.push_str(&code.literal),
                NodeValue::LineBreak | NodeValue::SoftBreak => buffer.push(' '),
                _ => {}
            }
        }
        let mut child = node.first_child();
        while let Some(next) = child {
            walk(next, buffer);
            child = next.next_sibling();
        }
    }

    let mut text = String::new();
    let mut child = node.first_child();
    while let Some(next) = child {
        walk(next, &mut text);
        child = next.next_sibling();
    }
    text
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}
