use std::collections::HashSet;

use ammonia::Builder as AmmoniaBuilder;
use comrak::options::Options;

pub(crate) fn default_options() -> Options<'static> {
    let mut options = Options::default();
    configure_extensions(&mut options);
    options
}

/// Allow-list applied to blocks that carry embedded HTML when the raw
/// markup policy is `sanitize`. It also has to admit everything the block
/// renderer itself emits, since the whole block goes through it.
pub(crate) fn build_raw_markup_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();

    let tags: HashSet<&'static str> = HashSet::from([
        "a",
        "abbr",
        "b",
        "blockquote",
        "br",
        "center",
        "code",
        "dd",
        "del",
        "details",
        "div",
        "dl",
        "dt",
        "em",
        "figcaption",
        "figure",
        "h1",
        "h2",
        "h3",
        "h4",
        "h5",
        "h6",
        "hr",
        "i",
        "img",
        "ins",
        "kbd",
        "li",
        "ol",
        "p",
        "picture",
        "pre",
        "s",
        "source",
        "span",
        "strong",
        "sub",
        "summary",
        "sup",
        "table",
        "tbody",
        "td",
        "th",
        "thead",
        "tr",
        "u",
        "ul",
    ]);
    builder.tags(tags);

    let generic: HashSet<&'static str> = HashSet::from([
        "class",
        "id",
        "title",
        "lang",
        "dir",
        "align",
        "role",
        "tabindex",
        "aria-hidden",
        "aria-label",
        "data-language",
        "data-theme",
    ]);
    builder.generic_attributes(generic);

    builder.add_tag_attributes("a", &["target"]);
    builder.add_tag_attributes(
        "img",
        &["alt", "width", "height", "loading", "decoding"],
    );
    builder.add_tag_attributes("source", &["srcset", "media", "type"]);
    builder.add_tag_attributes("ol", &["start"]);
    builder.add_tag_attributes("details", &["open"]);
    builder.add_tag_attributes("th", &["colspan", "rowspan", "scope"]);
    builder.add_tag_attributes("td", &["colspan", "rowspan"]);

    builder.add_url_schemes(["http", "https", "mailto", "tel"].iter().copied());

    builder
}

fn configure_extensions(options: &mut Options<'static>) {
    let ext = &mut options.extension;
    ext.strikethrough = true;
    ext.tagfilter = false;
    ext.table = true;
    ext.autolink = true;
}

/// Link targets that must never become clickable.
pub(crate) fn is_unsafe_link(url: &str) -> bool {
    let scheme = compact_lowercase(url);
    ["javascript:", "vbscript:", "data:", "file:"]
        .iter()
        .any(|prefix| scheme.starts_with(prefix))
}

/// Image sources follow the link rule, except inline raster data.
pub(crate) fn is_unsafe_image_source(url: &str) -> bool {
    let scheme = compact_lowercase(url);
    if scheme.starts_with("data:image/") && !scheme.starts_with("data:image/svg") {
        return false;
    }
    is_unsafe_link(url)
}

// Browsers ignore embedded tabs, newlines and other control characters
// when reading a scheme, so `java\tscript:` must be caught too.
fn compact_lowercase(url: &str) -> String {
    url.chars()
        .filter(|ch| !ch.is_whitespace() && !ch.is_control())
        .collect::<String>()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsafe_link_schemes_are_detected() {
        assert!(is_unsafe_link("javascript:alert(1)"));
        assert!(is_unsafe_link("  JavaScript:alert(1)"));
        assert!(is_unsafe_link("java\tscript:alert(1)"));
        assert!(is_unsafe_link("vbscript:msgbox"));
        assert!(is_unsafe_link("data:text/html,<b>x</b>"));
        assert!(is_unsafe_link("file:///etc/passwd"));
        assert!(!is_unsafe_link("https://example.com"));
        assert!(!is_unsafe_link("#install"));
        assert!(!is_unsafe_link("docs/guide.md"));
    }

    #[test]
    fn raster_data_images_are_allowed() {
        assert!(!is_unsafe_image_source("data:image/png;base64,AAAA"));
        assert!(is_unsafe_image_source("data:image/svg+xml;base64,AAAA"));
        assert!(is_unsafe_image_source("javascript:alert(1)"));
    }

    #[test]
    fn sanitizer_strips_scripts_and_keeps_layout_markup() {
        let sanitizer = build_raw_markup_sanitizer();
        let html = sanitizer
            .clean(
                "<div class=\"readme-code-scroll\" role=\"region\" tabindex=\"0\">ok</div>\
                 <script>alert(1)</script><img src=\"x.png\" onerror=\"alert(1)\" loading=\"lazy\">",
            )
            .to_string();

        assert!(html.contains("role=\"region\""));
        assert!(html.contains("tabindex=\"0\""));
        assert!(html.contains("loading=\"lazy\""));
        assert!(!html.contains("<script"));
        assert!(!html.contains("onerror"));
    }

    #[test]
    fn sanitizer_keeps_details_blocks() {
        let sanitizer = build_raw_markup_sanitizer();
        let html = sanitizer
            .clean("<details open><summary>More</summary><p>Body</p></details>")
            .to_string();
        assert!(html.contains("<details open"));
        assert!(html.contains("<summary>More</summary>"));
    }
}
