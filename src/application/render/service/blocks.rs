//! HTML emission for [`SyntaxNode`] trees, one top-level block at a time.

use ammonia::Builder as AmmoniaBuilder;
use syntect::{html::ClassStyle, parsing::SyntaxSet};
use tracing::warn;
use url::Url;

use crate::application::render::classify;
use crate::application::render::types::{
    CodeBadge, CodeFenceInfo, RawMarkupPolicy, RenderedBlock,
};
use crate::domain::document::{Alignment, CellKind, ListKind, RawPlacement, SyntaxNode};

use super::config::{is_unsafe_image_source, is_unsafe_link};
use super::highlight;

/// Fences longer than this get a line-number gutter.
pub(crate) const LINE_NUMBER_THRESHOLD: usize = 5;

pub(crate) struct BlockRenderer<'a> {
    pub(crate) syntax_set: &'a SyntaxSet,
    pub(crate) class_style: &'a ClassStyle,
    pub(crate) sanitizer: &'a AmmoniaBuilder<'static>,
    pub(crate) raw_markup: RawMarkupPolicy,
    pub(crate) base_url: Option<&'a Url>,
}

#[derive(Default)]
struct BlockOutput {
    html: String,
    code: Vec<CodeFenceInfo>,
    contains_raw: bool,
}

impl BlockRenderer<'_> {
    pub(crate) fn render_block(&self, node: &SyntaxNode) -> RenderedBlock {
        let mut out = BlockOutput::default();
        self.write_node(node, &mut out);

        let html = if out.contains_raw && self.raw_markup == RawMarkupPolicy::Sanitize {
            self.sanitizer.clean(&out.html).to_string()
        } else {
            out.html
        };

        RenderedBlock {
            kind: node.kind_name(),
            html,
            code: out.code,
        }
    }

    fn write_all(&self, nodes: &[SyntaxNode], out: &mut BlockOutput) {
        for node in nodes {
            self.write_node(node, out);
        }
    }

    fn write_node(&self, node: &SyntaxNode, out: &mut BlockOutput) {
        match node {
            SyntaxNode::Heading { level, children } => {
                out.html.push_str(&format!("<h{level}>"));
                self.write_all(children, out);
                out.html.push_str(&format!("</h{level}>\n"));
            }
            SyntaxNode::Paragraph(children) => {
                out.html.push_str("<p>");
                self.write_all(children, out);
                out.html.push_str("</p>\n");
            }
            SyntaxNode::List { kind, tight, items } => {
                let close = match kind {
                    ListKind::Unordered => {
                        out.html.push_str("<ul>\n");
                        "</ul>\n"
                    }
                    ListKind::Ordered { start: 1 } => {
                        out.html.push_str("<ol>\n");
                        "</ol>\n"
                    }
                    ListKind::Ordered { start } => {
                        out.html.push_str(&format!("<ol start=\"{start}\">\n"));
                        "</ol>\n"
                    }
                };
                for item in items {
                    match item {
                        SyntaxNode::ListItem(children) => {
                            self.write_list_item(children, *tight, out)
                        }
                        other => self.write_node(other, out),
                    }
                }
                out.html.push_str(close);
            }
            SyntaxNode::ListItem(children) => self.write_list_item(children, false, out),
            SyntaxNode::BlockQuote(children) => {
                out.html.push_str("<blockquote>\n");
                self.write_all(children, out);
                out.html.push_str("</blockquote>\n");
            }
            SyntaxNode::Table { rows } => self.write_table(rows, out),
            SyntaxNode::TableRow { cells, .. } => {
                out.html.push_str("<tr>\n");
                self.write_all(cells, out);
                out.html.push_str("</tr>\n");
            }
            SyntaxNode::TableCell {
                kind,
                alignment,
                children,
            } => self.write_table_cell(*kind, *alignment, children, out),
            SyntaxNode::Link {
                href,
                title,
                children,
            } => self.write_link(href, title, children, out),
            SyntaxNode::Image { src, alt, title } => self.write_image(src, alt, title, out),
            SyntaxNode::CodeBlock { literal, declared } => {
                self.write_code_block(literal, declared.as_deref(), out)
            }
            SyntaxNode::InlineCode(code) => write_inline_code(code, out),
            SyntaxNode::Text(text) => out.html.push_str(&escape_html(text)),
            SyntaxNode::Emphasis(children) => {
                out.html.push_str("<em>");
                self.write_all(children, out);
                out.html.push_str("</em>");
            }
            SyntaxNode::Strong(children) => {
                out.html.push_str("<strong>");
                self.write_all(children, out);
                out.html.push_str("</strong>");
            }
            SyntaxNode::Strikethrough(children) => {
                out.html.push_str("<del>");
                self.write_all(children, out);
                out.html.push_str("</del>");
            }
            SyntaxNode::SoftBreak => out.html.push('\n'),
            SyntaxNode::LineBreak => out.html.push_str("<br>\n"),
            SyntaxNode::ThematicBreak => out.html.push_str("<hr>\n"),
            SyntaxNode::RawMarkup { placement, literal } => {
                self.write_raw_markup(*placement, literal, out)
            }
        }
    }

    fn write_list_item(&self, children: &[SyntaxNode], tight: bool, out: &mut BlockOutput) {
        out.html.push_str("<li>");
        for child in children {
            match child {
                SyntaxNode::Paragraph(inline) if tight => self.write_all(inline, out),
                other => self.write_node(other, out),
            }
        }
        out.html.push_str("</li>\n");
    }

    fn write_table(&self, rows: &[SyntaxNode], out: &mut BlockOutput) {
        let (head, body): (Vec<&SyntaxNode>, Vec<&SyntaxNode>) = rows
            .iter()
            .partition(|row| matches!(row, SyntaxNode::TableRow { header: true, .. }));

        out.html.push_str(
            "<div class=\"readme-table-scroll\" role=\"region\" tabindex=\"0\" aria-label=\"Table\">\n<table>\n",
        );
        if !head.is_empty() {
            out.html.push_str("<thead>\n");
            head.into_iter().for_each(|row| self.write_node(row, out));
            out.html.push_str("</thead>\n");
        }
        if !body.is_empty() {
            out.html.push_str("<tbody>\n");
            body.into_iter().for_each(|row| self.write_node(row, out));
            out.html.push_str("</tbody>\n");
        }
        out.html.push_str("</table>\n</div>\n");
    }

    fn write_table_cell(
        &self,
        kind: CellKind,
        alignment: Alignment,
        children: &[SyntaxNode],
        out: &mut BlockOutput,
    ) {
        let tag = match kind {
            CellKind::Header => "th",
            CellKind::Body => "td",
        };
        match alignment.as_attr() {
            Some(align) => out.html.push_str(&format!("<{tag} align=\"{align}\">")),
            None => out.html.push_str(&format!("<{tag}>")),
        }
        self.write_all(children, out);
        out.html.push_str(&format!("</{tag}>\n"));
    }

    fn write_link(&self, href: &str, title: &str, children: &[SyntaxNode], out: &mut BlockOutput) {
        let href = href.trim();
        if href.is_empty() || is_unsafe_link(href) {
            self.write_all(children, out);
            return;
        }

        let in_page = href.starts_with('#');
        let resolved = if in_page {
            href.to_string()
        } else {
            self.resolve_url(href)
        };

        out.html.push_str("<a href=\"");
        out.html.push_str(&escape_html(&resolved));
        out.html.push('"');
        if !title.is_empty() {
            out.html.push_str(" title=\"");
            out.html.push_str(&escape_html(title));
            out.html.push('"');
        }
        if !in_page {
            out.html.push_str(" target=\"_blank\" rel=\"noopener noreferrer\"");
        }
        out.html.push('>');
        self.write_all(children, out);
        out.html.push_str("</a>");
    }

    fn write_image(&self, src: &str, alt: &str, title: &str, out: &mut BlockOutput) {
        let src = src.trim();
        if src.is_empty() || is_unsafe_image_source(src) {
            out.html.push_str(&escape_html(alt));
            return;
        }

        out.html.push_str("<img src=\"");
        out.html.push_str(&escape_html(&self.resolve_url(src)));
        out.html.push_str("\" alt=\"");
        out.html.push_str(&escape_html(alt));
        out.html.push('"');
        if !title.is_empty() {
            out.html.push_str(" title=\"");
            out.html.push_str(&escape_html(title));
            out.html.push('"');
        }
        out.html.push_str(" class=\"readme-image\" loading=\"lazy\" decoding=\"async\">");
    }

    fn write_code_block(&self, literal: &str, declared: Option<&str>, out: &mut BlockOutput) {
        let body = strip_trailing_newline(literal);
        let declared = declared.map(str::trim).filter(|tag| !tag.is_empty());

        // A one-line untagged fence reads as a snippet, not a listing.
        if declared.is_none() && !body.contains('\n') {
            write_inline_code(body, out);
            return;
        }

        let resolution = classify::resolve(declared, body);
        let line_count = body.split('\n').count();
        let line_numbers = line_count > LINE_NUMBER_THRESHOLD;
        let gutter = line_numbers.then_some(line_count);

        let pre = match highlight::highlight_code(
            &resolution.tag,
            body,
            gutter,
            self.syntax_set,
            self.class_style,
        ) {
            Ok(html) => html,
            Err(err) => {
                warn!(
                    target = "application::render::highlight",
                    language = %resolution.tag,
                    error = %err,
                    "Syntax highlighting failed; rendering plain code"
                );
                highlight::plain_code_block(&resolution.tag, body, gutter)
            }
        };

        let language = escape_html(resolution.tag.as_str());
        let badge = resolution.badge();
        out.html.push_str(&format!(
            "<figure class=\"readme-code\" data-language=\"{language}\">\n\
             <figcaption class=\"readme-code-header\"><span class=\"readme-code-language\">{language}</span>"
        ));
        if let Some(badge) = badge {
            let modifier = match badge {
                CodeBadge::AutoDetected => "auto",
                CodeBadge::NoLanguage => "none",
            };
            out.html.push_str(&format!(
                "<span class=\"readme-code-badge readme-code-badge-{modifier}\">{}</span>",
                badge.label()
            ));
        }
        out.html.push_str(&format!(
            "</figcaption>\n<div class=\"readme-code-scroll\" role=\"region\" tabindex=\"0\" aria-label=\"{language} code\">{pre}</div>\n</figure>\n"
        ));

        out.code.push(CodeFenceInfo {
            language: resolution.tag.clone(),
            source: resolution.source,
            badge,
            line_count,
            line_numbers,
        });
    }

    fn write_raw_markup(&self, placement: RawPlacement, literal: &str, out: &mut BlockOutput) {
        match self.raw_markup {
            RawMarkupPolicy::Escape => match placement {
                RawPlacement::Block => {
                    out.html.push_str("<div class=\"readme-raw-markup\">");
                    out.html.push_str(&escape_html(literal.trim_end()));
                    out.html.push_str("</div>\n");
                }
                RawPlacement::Inline => out.html.push_str(&escape_html(literal)),
            },
            RawMarkupPolicy::Sanitize => {
                out.contains_raw = true;
                out.html.push_str(literal);
            }
            RawMarkupPolicy::Trust => out.html.push_str(literal),
        }
    }

    /// Resolve relative targets against the base URL, when one is known.
    fn resolve_url(&self, raw: &str) -> String {
        if Url::parse(raw).is_ok() {
            return raw.to_string();
        }
        let Some(base) = self.base_url else {
            return raw.to_string();
        };

        // Root-relative paths point at the repository root, not the host root.
        let relative = match raw.strip_prefix('/') {
            Some(rest) if !rest.starts_with('/') => rest,
            _ => raw,
        };
        base.join(relative)
            .map(|url| url.to_string())
            .unwrap_or_else(|_| raw.to_string())
    }
}

fn write_inline_code(code: &str, out: &mut BlockOutput) {
    out.html.push_str("<code class=\"readme-inline-code\">");
    out.html.push_str(&escape_html(code));
    out.html.push_str("</code>");
}

fn strip_trailing_newline(literal: &str) -> &str {
    match literal.strip_suffix('\n') {
        Some(rest) => rest.strip_suffix('\r').unwrap_or(rest),
        None => literal,
    }
}

pub(crate) fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
