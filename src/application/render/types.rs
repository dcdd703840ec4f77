use std::str::FromStr;

use gitreader_api_types::{
    CodeBadgeView, CodeFenceView, LanguageSourceView, RenderedBlockView, Theme,
};
use serde::Deserialize;
use thiserror::Error;

use crate::domain::language::LanguageTag;

/// Rendering request passed into the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    /// Untrusted Markdown, usually a README.
    pub markdown: String,
    pub theme: Theme,
    /// Normalised base used to resolve relative link and image targets.
    pub base_url: Option<String>,
}

impl RenderRequest {
    pub fn new(markdown: impl Into<String>, theme: Theme) -> Self {
        Self {
            markdown: markdown.into(),
            theme,
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let normalized = normalize_base_url(base_url.into().as_str());
        if !normalized.is_empty() {
            self.base_url = Some(normalized);
        }
        self
    }
}

fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let without_trailing = trimmed.trim_end_matches('/');
    format!("{without_trailing}/")
}

/// How embedded HTML found in Markdown is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawMarkupPolicy {
    /// Show the markup as literal text.
    #[default]
    Escape,
    /// Pass blocks containing markup through an HTML allow-list.
    Sanitize,
    /// Emit markup verbatim. Only for sources the operator controls.
    Trust,
}

impl RawMarkupPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RawMarkupPolicy::Escape => "escape",
            RawMarkupPolicy::Sanitize => "sanitize",
            RawMarkupPolicy::Trust => "trust",
        }
    }
}

impl FromStr for RawMarkupPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "escape" => Ok(RawMarkupPolicy::Escape),
            "sanitize" => Ok(RawMarkupPolicy::Sanitize),
            "trust" => Ok(RawMarkupPolicy::Trust),
            other => Err(format!(
                "unknown raw markup policy `{other}`, expected escape, sanitize or trust"
            )),
        }
    }
}

/// Whether a fence's language came from its info string or from content sniffing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageSource {
    Declared,
    Inferred,
}

/// Header badge shown next to the language label of inferred fences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeBadge {
    AutoDetected,
    NoLanguage,
}

impl CodeBadge {
    pub fn label(&self) -> &'static str {
        match self {
            CodeBadge::AutoDetected => "Auto-detected",
            CodeBadge::NoLanguage => "No language specified",
        }
    }
}

/// Outcome of the language classifier for one fence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageResolution {
    pub tag: LanguageTag,
    pub source: LanguageSource,
}

impl LanguageResolution {
    pub fn badge(&self) -> Option<CodeBadge> {
        match self.source {
            LanguageSource::Declared => None,
            LanguageSource::Inferred if self.tag.is_text() => Some(CodeBadge::NoLanguage),
            LanguageSource::Inferred => Some(CodeBadge::AutoDetected),
        }
    }
}

/// Metadata for a code fence rendered in block presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeFenceInfo {
    pub language: LanguageTag,
    pub source: LanguageSource,
    pub badge: Option<CodeBadge>,
    pub line_count: usize,
    pub line_numbers: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedBlock {
    pub kind: &'static str,
    pub html: String,
    /// Code fences found inside this block, in source order.
    pub code: Vec<CodeFenceInfo>,
}

/// Deterministic rendering result returned to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub theme: Theme,
    /// Blocks joined inside a themed `<article>` wrapper.
    pub html: String,
    pub blocks: Vec<RenderedBlock>,
    /// Set when the document could not be parsed and was shown as raw text.
    pub degraded: bool,
}

impl RenderedDocument {
    pub fn code_fences(&self) -> impl Iterator<Item = &CodeFenceInfo> {
        self.blocks.iter().flat_map(|block| block.code.iter())
    }
}

impl From<&CodeFenceInfo> for CodeFenceView {
    fn from(info: &CodeFenceInfo) -> Self {
        Self {
            language: info.language.to_string(),
            source: match info.source {
                LanguageSource::Declared => LanguageSourceView::Declared,
                LanguageSource::Inferred => LanguageSourceView::Inferred,
            },
            badge: info.badge.map(|badge| match badge {
                CodeBadge::AutoDetected => CodeBadgeView::AutoDetected,
                CodeBadge::NoLanguage => CodeBadgeView::NoLanguage,
            }),
            line_count: info.line_count,
            line_numbers: info.line_numbers,
        }
    }
}

impl From<&RenderedBlock> for RenderedBlockView {
    fn from(block: &RenderedBlock) -> Self {
        Self {
            kind: block.kind.to_string(),
            html: block.html.clone(),
            code: block.code.iter().map(CodeFenceView::from).collect(),
        }
    }
}

/// Structured errors raised inside the pipeline. None of them escape
/// [`RenderService::render_request`]; they select a fallback instead.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("markdown nesting exceeds {limit} levels")]
    NestingTooDeep { limit: usize },
    #[error("syntax highlighting failed: {language}: {message}")]
    Highlighting { language: String, message: String },
}

/// Trait exposed by the rendering pipeline. Implementations must be pure and
/// deterministic: the same request always yields the same document.
pub trait RenderService: Send + Sync {
    fn render_request(&self, request: &RenderRequest) -> RenderedDocument;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalised_with_trailing_slash() {
        let request = RenderRequest::new("", Theme::Light)
            .with_base_url("https://raw.githubusercontent.com/octo/demo/HEAD//");
        assert_eq!(
            request.base_url.as_deref(),
            Some("https://raw.githubusercontent.com/octo/demo/HEAD/")
        );

        let blank = RenderRequest::new("", Theme::Light).with_base_url("  ");
        assert!(blank.base_url.is_none());
    }

    #[test]
    fn raw_markup_policy_parses() {
        assert_eq!("Sanitize".parse(), Ok(RawMarkupPolicy::Sanitize));
        assert_eq!(RawMarkupPolicy::default(), RawMarkupPolicy::Escape);
        assert!("allow".parse::<RawMarkupPolicy>().is_err());
    }

    #[test]
    fn badge_follows_source_and_tag() {
        let declared = LanguageResolution {
            tag: LanguageTag::normalize("py"),
            source: LanguageSource::Declared,
        };
        assert_eq!(declared.badge(), None);

        let inferred_text = LanguageResolution {
            tag: LanguageTag::text(),
            source: LanguageSource::Inferred,
        };
        assert_eq!(inferred_text.badge(), Some(CodeBadge::NoLanguage));

        let inferred = LanguageResolution {
            tag: LanguageTag::normalize("cpp"),
            source: LanguageSource::Inferred,
        };
        assert_eq!(inferred.badge(), Some(CodeBadge::AutoDetected));
    }
}
