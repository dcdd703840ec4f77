//! README rendering pipeline.
//!
//! The pipeline is pure: it accepts Markdown and a theme, produces
//! deterministic HTML, and never performs I/O. Failures inside it select a
//! fallback presentation instead of surfacing to the caller.

pub mod classify;
mod service;
mod types;

pub use service::{
    ReadmeRenderer, RenderConfigError, RenderPipelineConfig, configure_render_service,
    palette::{palette_name, stylesheet},
    render_service,
};
pub use types::{
    CodeBadge, CodeFenceInfo, LanguageResolution, LanguageSource, RawMarkupPolicy, RenderError,
    RenderRequest, RenderService, RenderedBlock, RenderedDocument,
};
