use syntect::{
    html::{ClassStyle, ClassedHTMLGenerator},
    parsing::{SyntaxReference, SyntaxSet},
    util::LinesWithEndings,
};

use crate::application::render::types::RenderError;
use crate::domain::language::LanguageTag;

use super::blocks::escape_html;

/// Render a `<pre>` block with syntect classes for `language`.
///
/// `code` arrives without the fence's closing newline, so a trailing newline
/// left in it is a blank last line and is kept. `line_count` adds a gutter of
/// line numbers when present.
pub(crate) fn highlight_code(
    language: &LanguageTag,
    code: &str,
    line_count: Option<usize>,
    syntax_set: &SyntaxSet,
    class_style: &ClassStyle,
) -> Result<String, RenderError> {
    let syntax = if language.is_text() {
        syntax_set.find_syntax_plain_text()
    } else {
        find_syntax(syntax_set, syntax_token(language.as_str()))
            .unwrap_or_else(|| syntax_set.find_syntax_plain_text())
    };

    let code_with_newline = format!("{code}\n");

    let mut generator =
        ClassedHTMLGenerator::new_with_class_style(syntax, syntax_set, *class_style);

    for line in LinesWithEndings::from(code_with_newline.as_str()) {
        generator
            .parse_html_for_line_which_includes_newline(line)
            .map_err(|err| RenderError::Highlighting {
                language: language.to_string(),
                message: err.to_string(),
            })?;
    }

    Ok(wrap_pre(language, &generator.finalize(), line_count))
}

/// Uncoloured variant used when highlighting fails.
pub(crate) fn plain_code_block(
    language: &LanguageTag,
    code: &str,
    line_count: Option<usize>,
) -> String {
    let mut escaped = escape_html(code);
    escaped.push('\n');
    wrap_pre(language, &escaped, line_count)
}

fn wrap_pre(language: &LanguageTag, body: &str, line_count: Option<usize>) -> String {
    let lang = escape_html(language.as_str());
    let mut pre_class = format!("syntax-highlight syntax-lang-{lang}");
    let gutter = match line_count {
        Some(count) => {
            pre_class.push_str(" readme-line-numbers");
            let numbers = (1..=count)
                .map(|number| number.to_string())
                .collect::<Vec<_>>()
                .join("\n");
            format!("<span class=\"readme-gutter\" aria-hidden=\"true\">{numbers}\n</span>")
        }
        None => String::new(),
    };

    format!(
        "<pre class=\"{pre_class}\" data-language=\"{lang}\">{gutter}<code class=\"language-{lang} syntax-code\">{body}</code></pre>"
    )
}

/// Canonical tags are highlighter-neutral; syntect knows some of them by
/// another token.
fn syntax_token(tag: &str) -> &str {
    match tag {
        "markup" => "html",
        "bash" => "sh",
        "csharp" => "cs",
        "docker" => "dockerfile",
        "powershell" => "ps1",
        "batch" => "bat",
        "makefile" => "make",
        "vim" => "vimscript",
        other => other,
    }
}

fn find_syntax<'a>(syntax_set: &'a SyntaxSet, token: &str) -> Option<&'a SyntaxReference> {
    let lowercase = token.to_ascii_lowercase();
    syntax_set
        .find_syntax_by_token(&lowercase)
        .or_else(|| syntax_set.find_syntax_by_name(&lowercase))
        .or_else(|| syntax_set.find_syntax_by_extension(&lowercase))
}
