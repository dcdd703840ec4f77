use gitreader::application::render::{
    CodeBadge, LanguageSource, RawMarkupPolicy, ReadmeRenderer, RenderPipelineConfig,
    RenderRequest, RenderService, classify,
};
use gitreader::domain::{Theme, language::LanguageTag};

const FIXTURE: &str = include_str!("fixtures/readme_features.md");
const BASE_URL: &str = "https://raw.githubusercontent.com/octo/demo/HEAD/";

fn renderer() -> ReadmeRenderer {
    ReadmeRenderer::new(RenderPipelineConfig::default())
}

fn renderer_with(raw_markup: RawMarkupPolicy, max_depth: usize) -> ReadmeRenderer {
    ReadmeRenderer::new(RenderPipelineConfig {
        raw_markup,
        max_depth,
    })
}

#[test]
fn classifier_never_returns_an_empty_tag() {
    let samples = [
        (None, ""),
        (None, "   \n  "),
        (Some(""), "plain words"),
        (Some("   "), "SELECT 1;"),
        (Some("Rust"), "fn main() {}"),
        (None, "??!!"),
    ];

    for (declared, content) in samples {
        let resolution = classify::resolve(declared, content);
        assert!(
            !resolution.tag.as_str().is_empty(),
            "empty tag for {declared:?} / {content:?}"
        );
    }
}

#[test]
fn normalizing_twice_is_a_no_op() {
    for raw in ["js", "YML", "PY", "c++", "shell", "Dockerfile", "unknownlang", ""] {
        let once = LanguageTag::normalize(raw);
        let twice = LanguageTag::normalize(once.as_str());
        assert_eq!(once, twice, "normalize not idempotent for {raw:?}");
    }
}

#[test]
fn aliases_fold_to_canonical_names() {
    assert_eq!(LanguageTag::normalize("js").as_str(), "javascript");
    assert_eq!(LanguageTag::normalize("yml").as_str(), "yaml");
    assert_eq!(LanguageTag::normalize("PY").as_str(), "python");
}

#[test]
fn declared_tags_win_over_content() {
    let resolution = classify::resolve(Some("ts"), "SELECT * FROM users;");
    assert_eq!(resolution.source, LanguageSource::Declared);
    assert_ne!(resolution.tag.as_str(), "sql");
    assert!(resolution.badge().is_none());
}

#[test]
fn javascript_outranks_markup() {
    let content = "const root = document.body;\nroot.innerHTML = \"<div>hello</div>\";";
    let resolution = classify::resolve(None, content);
    assert_eq!(resolution.tag.as_str(), "javascript");
    assert_eq!(resolution.source, LanguageSource::Inferred);
    assert_eq!(resolution.badge(), Some(CodeBadge::AutoDetected));
}

#[test]
fn prose_and_broken_json_are_text() {
    let prose = classify::resolve(None, "This sentence is just prose about the project.");
    assert!(prose.tag.is_text());
    assert_eq!(prose.badge(), Some(CodeBadge::NoLanguage));

    let broken = classify::resolve(None, "{ invalid json here");
    assert_ne!(broken.tag.as_str(), "json");

    let trailing_comma = classify::resolve(None, "{\"a\": 1,}");
    assert!(trailing_comma.tag.is_text());
}

#[test]
fn valid_json_is_detected() {
    let resolution = classify::resolve(None, "{\n  \"name\": \"demo\",\n  \"version\": 1\n}");
    assert_eq!(resolution.tag.as_str(), "json");
}

#[test]
fn rendering_is_deterministic() {
    let renderer = renderer();
    let first = renderer.render(FIXTURE, Theme::Dark);
    let second = renderer.render(FIXTURE, Theme::Dark);
    assert_eq!(first, second);
}

#[test]
fn untagged_one_liner_renders_inline() {
    let document = renderer().render("```\necho hello\n```\n", Theme::Light);

    assert!(
        document
            .html
            .contains("<code class=\"readme-inline-code\">echo hello</code>")
    );
    assert!(!document.html.contains("<figure"));
    assert_eq!(document.code_fences().count(), 0);
}

#[test]
fn tagged_one_liner_stays_a_block_without_badge() {
    let document = renderer().render("```bash\necho hello\n```\n", Theme::Light);

    assert!(
        document
            .html
            .contains("<figure class=\"readme-code\" data-language=\"bash\">")
    );
    assert!(!document.html.contains("readme-code-badge"));

    let fences: Vec<_> = document.code_fences().collect();
    assert_eq!(fences.len(), 1);
    assert_eq!(fences[0].source, LanguageSource::Declared);
    assert!(fences[0].badge.is_none());
}

#[test]
fn declared_python_fence_keeps_its_language() {
    let markdown = "```python\ndef greet():\n    return \"hi\"\n```\n";
    let document = renderer().render(markdown, Theme::Light);

    let fence = document.code_fences().next().expect("one fence");
    assert_eq!(fence.language.as_str(), "python");
    assert_eq!(fence.source, LanguageSource::Declared);
    assert_eq!(fence.line_count, 2);
    assert!(!fence.line_numbers);
}

#[test]
fn untagged_c_source_is_inferred_as_cpp() {
    let markdown = "```\n#include <stdio.h>\nint main(){return 0;}\n```\n";
    let document = renderer().render(markdown, Theme::Light);

    let fence = document.code_fences().next().expect("one fence");
    assert_eq!(fence.language.as_str(), "cpp");
    assert_eq!(fence.source, LanguageSource::Inferred);
    assert_eq!(fence.badge, Some(CodeBadge::AutoDetected));
    assert!(document.html.contains("readme-code-badge-auto"));
    assert!(document.html.contains("&lt;stdio.h&gt;"));
}

#[test]
fn untagged_multiline_prose_gets_no_language_badge() {
    let markdown = "```\nfirst plain line\nsecond plain line\n```\n";
    let document = renderer().render(markdown, Theme::Light);

    let fence = document.code_fences().next().expect("one fence");
    assert!(fence.language.is_text());
    assert_eq!(fence.badge, Some(CodeBadge::NoLanguage));
    assert!(document.html.contains("readme-code-badge-none"));
}

#[test]
fn every_new_tab_link_carries_noopener() {
    let request = RenderRequest::new(FIXTURE, Theme::Light).with_base_url(BASE_URL);
    let document = renderer().render_request(&request);

    let anchors: Vec<&str> = document
        .html
        .split("<a ")
        .skip(1)
        .map(|rest| rest.split('>').next().unwrap_or_default())
        .collect();
    assert!(!anchors.is_empty());

    for anchor in anchors {
        if anchor.contains("target=\"_blank\"") {
            assert!(
                anchor.contains("rel=\"noopener noreferrer\""),
                "missing rel on anchor: {anchor}"
            );
        } else {
            assert!(anchor.contains("href=\"#"), "external anchor without target: {anchor}");
        }
    }
}

#[test]
fn unsafe_link_targets_are_dropped() {
    let document = renderer().render(
        "[click](javascript:alert(1)) and [data](data:text/html,hi)",
        Theme::Light,
    );

    assert!(!document.html.contains("javascript:"));
    assert!(!document.html.contains("data:text/html"));
    assert!(document.html.contains("click"));
    assert!(document.html.contains("data"));
}

#[test]
fn empty_input_renders_an_empty_article() {
    let document = renderer().render("", Theme::Dark);

    assert!(!document.degraded);
    assert!(document.blocks.is_empty());
    assert_eq!(
        document.html,
        "<article class=\"readme readme-theme-dark\" data-theme=\"dark\">\n</article>\n"
    );
}

#[test]
fn excessive_nesting_degrades_to_raw_text() {
    let markdown = "> > > > > deeply <nested> quote\n";
    let document = renderer_with(RawMarkupPolicy::Escape, 2).render(markdown, Theme::Light);

    assert!(document.degraded);
    assert_eq!(document.blocks.len(), 1);
    assert_eq!(document.blocks[0].kind, "raw");
    assert!(document.html.contains("<pre class=\"readme-raw\">"));
    assert!(document.html.contains("&lt;nested&gt;"));

    let relaxed = renderer().render(markdown, Theme::Light);
    assert!(!relaxed.degraded);
}

#[test]
fn fixture_renders_every_feature() {
    let request = RenderRequest::new(FIXTURE, Theme::Light).with_base_url(BASE_URL);
    let document = renderer().render_request(&request);
    let html = &document.html;

    assert!(!document.degraded);
    assert!(html.starts_with("<article class=\"readme readme-theme-light\" data-theme=\"light\">"));

    assert!(html.contains("<h1>Demo Project</h1>"));
    assert!(html.contains("<strong>fast</strong>"));
    assert!(html.contains("<del>slow</del>"));
    assert!(html.contains("<li>[x] parse</li>"));
    assert!(html.contains("<blockquote>"));

    // Relative targets resolve against the repository root.
    assert!(html.contains("href=\"https://raw.githubusercontent.com/octo/demo/HEAD/docs/GUIDE.md\""));
    assert!(html.contains("src=\"https://raw.githubusercontent.com/octo/demo/HEAD/assets/logo.png\""));
    assert!(html.contains("href=\"#usage\""));
    assert!(html.contains("href=\"https://example.com/demo\""));

    // The untagged install line is a snippet; the rest are listings.
    assert!(html.contains("<code class=\"readme-inline-code\">pip install demo</code>"));
    let languages: Vec<&str> = document
        .code_fences()
        .map(|fence| fence.language.as_str())
        .collect();
    assert_eq!(languages, vec!["bash", "python", "cpp"]);

    let python = document
        .code_fences()
        .find(|fence| fence.language.as_str() == "python")
        .expect("python fence");
    assert_eq!(python.line_count, 7);
    assert!(python.line_numbers);

    // Tables scroll horizontally.
    assert!(html.contains("readme-table-scroll"));

    // Raw markup is escaped under the default policy.
    assert!(html.contains("&lt;script&gt;"));
    assert!(!html.contains("<script>"));
    assert!(!html.contains("javascript:"));
}

#[test]
fn sanitize_policy_strips_scripts_but_keeps_markup() {
    let document = renderer_with(RawMarkupPolicy::Sanitize, 128).render(FIXTURE, Theme::Light);

    assert!(!document.html.contains("<script>"));
    assert!(!document.html.contains("alert(1)</script>"));
    assert!(document.html.contains("Inline HTML"));
    assert!(document.html.contains("<div"));
}

#[test]
fn theme_is_reflected_in_the_wrapper() {
    let light = renderer().render("# Title", Theme::Light);
    let dark = renderer().render("# Title", Theme::Dark);

    assert_eq!(light.theme, Theme::Light);
    assert_eq!(dark.theme, Theme::Dark);
    assert!(dark.html.contains("readme-theme-dark"));
    assert_eq!(light.blocks, dark.blocks);
}
