mod blocks;
pub(crate) mod config;
mod highlight;
pub mod palette;
mod transform;

use std::{sync::Arc, time::Instant};

use comrak::{Arena, parse_document};
use gitreader_api_types::Theme;
use metrics::{counter, histogram};
use once_cell::sync::{Lazy, OnceCell};
use syntect::{dumps::from_uncompressed_data, html::ClassStyle, parsing::SyntaxSet};
use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::application::render::types::{
    RawMarkupPolicy, RenderError, RenderRequest, RenderService, RenderedBlock, RenderedDocument,
};

use blocks::{BlockRenderer, escape_html};
use config::{build_raw_markup_sanitizer, default_options};

pub(crate) const DEFAULT_MAX_DEPTH: usize = 128;

/// Comrak-based README renderer with syntect highlighting.
pub struct ReadmeRenderer {
    options: comrak::Options<'static>,
    syntax_set: SyntaxSet,
    class_style: ClassStyle,
    sanitizer: ammonia::Builder<'static>,
    config: RenderPipelineConfig,
}

pub(crate) fn load_syntax_set() -> SyntaxSet {
    let syntax_bytes = include_bytes!(env!("SYNTAX_PACK_FILE"));
    from_uncompressed_data(syntax_bytes).expect("syntax pack must be valid")
}

impl ReadmeRenderer {
    /// Construct a renderer emitting `syntax-` prefixed highlight classes.
    pub fn new(config: RenderPipelineConfig) -> Self {
        Self {
            options: default_options(),
            syntax_set: load_syntax_set(),
            class_style: ClassStyle::SpacedPrefixed { prefix: "syntax-" },
            sanitizer: build_raw_markup_sanitizer(),
            config,
        }
    }

    /// Render untrusted Markdown for `theme`.
    pub fn render(&self, text: &str, theme: Theme) -> RenderedDocument {
        self.render_request(&RenderRequest::new(text, theme))
    }

    pub fn config(&self) -> &RenderPipelineConfig {
        &self.config
    }

    fn render_blocks(&self, request: &RenderRequest) -> Result<Vec<RenderedBlock>, RenderError> {
        let arena = Arena::new();
        let root = parse_document(&arena, &request.markdown, &self.options);
        let document = transform::to_document(root, self.config.max_depth)?;

        let base_url = request
            .base_url
            .as_deref()
            .and_then(|base| Url::parse(base).ok());
        let renderer = BlockRenderer {
            syntax_set: &self.syntax_set,
            class_style: &self.class_style,
            sanitizer: &self.sanitizer,
            raw_markup: self.config.raw_markup,
            base_url: base_url.as_ref(),
        };

        Ok(document
            .blocks
            .iter()
            .map(|block| renderer.render_block(block))
            .collect())
    }
}

impl RenderService for ReadmeRenderer {
    fn render_request(&self, request: &RenderRequest) -> RenderedDocument {
        let started = Instant::now();
        let (blocks, degraded) = match self.render_blocks(request) {
            Ok(blocks) => (blocks, false),
            Err(err) => {
                warn!(
                    target = "application::render",
                    error = %err,
                    bytes = request.markdown.len(),
                    "Markdown could not be rendered; showing raw text"
                );
                counter!("gitreader_render_degraded_total").increment(1);
                (vec![raw_block(&request.markdown)], true)
            }
        };

        counter!("gitreader_render_total").increment(1);
        histogram!("gitreader_render_ms").record(started.elapsed().as_secs_f64() * 1000.0);

        RenderedDocument {
            theme: request.theme,
            html: assemble_article(request.theme, &blocks),
            blocks,
            degraded,
        }
    }
}

fn raw_block(markdown: &str) -> RenderedBlock {
    RenderedBlock {
        kind: "raw",
        html: format!("<pre class=\"readme-raw\">{}</pre>\n", escape_html(markdown)),
        code: Vec::new(),
    }
}

fn assemble_article(theme: Theme, blocks: &[RenderedBlock]) -> String {
    let mut html = format!("<article class=\"readme readme-theme-{theme}\" data-theme=\"{theme}\">\n");
    for block in blocks {
        html.push_str(&block.html);
    }
    html.push_str("</article>\n");
    html
}

static RENDER_SERVICE: Lazy<Arc<ReadmeRenderer>> =
    Lazy::new(|| Arc::new(ReadmeRenderer::new(active_render_config())));

/// Access the shared render service instance, initialised on first use.
pub fn render_service() -> Arc<ReadmeRenderer> {
    Arc::clone(&RENDER_SERVICE)
}

impl Default for ReadmeRenderer {
    fn default() -> Self {
        Self::new(RenderPipelineConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPipelineConfig {
    pub raw_markup: RawMarkupPolicy,
    pub max_depth: usize,
}

impl Default for RenderPipelineConfig {
    fn default() -> Self {
        Self {
            raw_markup: RawMarkupPolicy::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl From<&crate::config::RenderSettings> for RenderPipelineConfig {
    fn from(settings: &crate::config::RenderSettings) -> Self {
        Self {
            raw_markup: settings.raw_markup,
            max_depth: settings.max_depth.get(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RenderConfigError {
    #[error("render service already configured")]
    AlreadyConfigured,
}

static RENDER_PIPELINE_CONFIG: OnceCell<RenderPipelineConfig> = OnceCell::new();

pub fn configure_render_service(config: RenderPipelineConfig) -> Result<(), RenderConfigError> {
    RENDER_PIPELINE_CONFIG
        .set(config)
        .map_err(|_| RenderConfigError::AlreadyConfigured)
}

fn active_render_config() -> RenderPipelineConfig {
    RENDER_PIPELINE_CONFIG.get().cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_renders_empty_article() {
        let document = ReadmeRenderer::default().render("", Theme::Dark);
        assert!(document.blocks.is_empty());
        assert!(!document.degraded);
        assert_eq!(
            document.html,
            "<article class=\"readme readme-theme-dark\" data-theme=\"dark\">\n</article>\n"
        );
    }

    #[test]
    fn excessive_nesting_degrades_to_escaped_text() {
        let renderer = ReadmeRenderer::new(RenderPipelineConfig {
            max_depth: 8,
            ..RenderPipelineConfig::default()
        });
        let markdown = format!("{} <b>deep</b>", ">".repeat(20));
        let document = renderer.render(&markdown, Theme::Light);

        assert!(document.degraded);
        assert_eq!(document.blocks.len(), 1);
        assert_eq!(document.blocks[0].kind, "raw");
        assert!(document.html.contains("&lt;b&gt;deep&lt;/b&gt;"));
    }

    #[test]
    fn base_url_applies_to_relative_images() {
        let request = RenderRequest::new("![logo](img/logo.png)", Theme::Light)
            .with_base_url("https://raw.githubusercontent.com/octo/demo/HEAD");
        let document = ReadmeRenderer::default().render_request(&request);
        assert!(
            document
                .html
                .contains("src=\"https://raw.githubusercontent.com/octo/demo/HEAD/img/logo.png\"")
        );
    }
}
