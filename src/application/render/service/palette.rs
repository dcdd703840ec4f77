//! Theme stylesheets: syntect palette classes plus README layout rules.

use gitreader_api_types::Theme;
use once_cell::sync::Lazy;
use syntect::highlighting::ThemeSet;
use syntect::html::{ClassStyle, css_for_theme_with_class_style};
use tracing::warn;

const LIGHT_PALETTE: &str = "base16-ocean.light";
const DARK_PALETTE: &str = "base16-ocean.dark";

const LAYOUT_CSS: &str = r#"
.readme { overflow-wrap: break-word; }
.readme-code { margin: 1rem 0; max-width: 100%; }
.readme-code-header { display: flex; gap: 0.5rem; align-items: center; font-size: 0.8rem; }
.readme-code-badge { padding: 0 0.4rem; border-radius: 0.6rem; border: 1px solid currentColor; opacity: 0.75; }
.readme-code-scroll { overflow-x: auto; max-width: 100%; }
.readme-code-scroll:focus-visible { outline: 2px solid Highlight; }
.readme-code-scroll pre { margin: 0; white-space: pre; }
.readme-line-numbers { display: flex; }
.readme-gutter { user-select: none; text-align: right; padding-right: 0.75rem; opacity: 0.5; }
.readme-inline-code { word-break: break-all; overflow-wrap: anywhere; white-space: pre-wrap; }
.readme-table-scroll { overflow-x: auto; max-width: 100%; }
.readme-raw-markup { white-space: pre-wrap; font-family: monospace; }
.readme-raw { overflow-x: auto; white-space: pre-wrap; }
.readme-image { max-width: 100%; height: auto; }
.readme-image::before { content: attr(alt); display: inline-block; padding: 0.25rem 0.5rem; border: 1px dashed currentColor; font-style: italic; }
"#;

static STYLESHEETS: Lazy<(String, String)> = Lazy::new(|| {
    let themes = ThemeSet::load_defaults();
    let build = |name: &str| {
        let palette = themes
            .themes
            .get(name)
            .and_then(|theme| {
                css_for_theme_with_class_style(theme, ClassStyle::SpacedPrefixed { prefix: "syntax-" })
                    .map_err(|err| {
                        warn!(
                            target = "application::render::palette",
                            palette = name,
                            error = %err,
                            "Failed to generate palette stylesheet"
                        );
                    })
                    .ok()
            })
            .unwrap_or_default();
        format!("{palette}{LAYOUT_CSS}")
    };
    (build(LIGHT_PALETTE), build(DARK_PALETTE))
});

/// Name of the syntect theme backing `theme`.
pub fn palette_name(theme: Theme) -> &'static str {
    match theme {
        Theme::Light => LIGHT_PALETTE,
        Theme::Dark => DARK_PALETTE,
    }
}

/// Full stylesheet for rendered READMEs in `theme`.
pub fn stylesheet(theme: Theme) -> &'static str {
    let (light, dark) = &*STYLESHEETS;
    match theme {
        Theme::Light => light.as_str(),
        Theme::Dark => dark.as_str(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn themes_get_distinct_palettes() {
        let light = stylesheet(Theme::Light);
        let dark = stylesheet(Theme::Dark);
        assert_ne!(light, dark);
        assert!(light.contains(".syntax-"));
        assert!(dark.contains(".readme-code-scroll { overflow-x: auto"));
    }

    #[test]
    fn inline_code_may_break_mid_token() {
        assert!(stylesheet(Theme::Light).contains("word-break: break-all"));
    }

    #[test]
    fn palette_names_match_bundled_themes() {
        let themes = ThemeSet::load_defaults();
        assert!(themes.themes.contains_key(palette_name(Theme::Light)));
        assert!(themes.themes.contains_key(palette_name(Theme::Dark)));
    }
}
