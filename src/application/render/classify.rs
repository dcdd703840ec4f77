//! Language classification for code fences.
//!
//! A declared info-string tag always wins. Untagged fences are sniffed by an
//! ordered list of cheap content predicates; the first one that fires names
//! the language, and when none fire the fence is plain `text`.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::language::LanguageTag;

use super::types::{LanguageResolution, LanguageSource};

type Detector = fn(&str) -> bool;

/// Evaluated top to bottom. Earlier entries shadow later ones, so
/// `#include <stdio.h>` is `cpp` even though it also contains a tag.
const DETECTORS: &[(&str, Detector)] = &[
    ("javascript", looks_like_javascript),
    ("python", looks_like_python),
    ("java", looks_like_java),
    ("cpp", looks_like_cpp),
    ("markup", looks_like_markup),
    ("css", looks_like_css),
    ("json", looks_like_json),
    ("sql", looks_like_sql),
    ("bash", looks_like_bash),
];

/// Resolve the canonical language of a fence.
///
/// A declared tag that is blank after trimming counts as absent.
pub fn resolve(declared: Option<&str>, content: &str) -> LanguageResolution {
    match declared.map(str::trim).filter(|tag| !tag.is_empty()) {
        Some(tag) => LanguageResolution {
            tag: LanguageTag::normalize(tag),
            source: LanguageSource::Declared,
        },
        None => LanguageResolution {
            tag: infer(content),
            source: LanguageSource::Inferred,
        },
    }
}

/// Guess a language from content alone.
pub fn infer(content: &str) -> LanguageTag {
    let trimmed = content.trim();
    DETECTORS
        .iter()
        .find(|(_, detect)| detect(trimmed))
        .map(|(tag, _)| LanguageTag::from_static(tag))
        .unwrap_or_else(LanguageTag::text)
}

fn pattern(source: &str) -> Regex {
    Regex::new(source).unwrap_or_else(|err| panic!("invalid detector pattern {source}: {err}"))
}

static JS_KEYWORD: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?m)^(function|const|let|var|class|import|export)"));
static JS_CONSOLE: Lazy<Regex> = Lazy::new(|| pattern(r"console\.(log|error|warn)"));

static PY_KEYWORD: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?m)^(def|class|import|from|if __name__|print\()"));
static PY_COMMENT: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)^\s*#.*python"));

static JAVA_DECL: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?m)^(public|private|protected)\s+(class|interface)"));

static CPP_INCLUDE: Lazy<Regex> = Lazy::new(|| pattern(r"#include\s*<.*>"));
static CPP_MAIN: Lazy<Regex> = Lazy::new(|| pattern(r"int\s+main\s*\("));

static MARKUP_TAG: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)</?[a-z][\s\S]*>"));

// Requires an unquoted property name, which keeps JSON objects out.
static CSS_RULE: Lazy<Regex> =
    Lazy::new(|| pattern(r"\{(?:[^{}]*?[;\s])?[-A-Za-z][-\w]*\s*:[^}]*\}"));
static CALL_AT_LINE_START: Lazy<Regex> = Lazy::new(|| pattern(r"(?m)^\s*[\w-]+\s*\("));

static SQL_STATEMENT: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?im)^(SELECT|INSERT|UPDATE|DELETE|CREATE|ALTER|DROP)\s+"));

static SHELL_COMMAND: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?m)^\s*(echo|ls|cd|mkdir|rm|cp|mv|grep|awk|sed)\s+"));

fn looks_like_javascript(content: &str) -> bool {
    JS_KEYWORD.is_match(content) || JS_CONSOLE.is_match(content)
}

fn looks_like_python(content: &str) -> bool {
    PY_KEYWORD.is_match(content) || PY_COMMENT.is_match(content)
}

fn looks_like_java(content: &str) -> bool {
    JAVA_DECL.is_match(content) || content.contains("System.out.println")
}

fn looks_like_cpp(content: &str) -> bool {
    CPP_INCLUDE.is_match(content) || CPP_MAIN.is_match(content)
}

fn looks_like_markup(content: &str) -> bool {
    MARKUP_TAG.is_match(content)
}

fn looks_like_css(content: &str) -> bool {
    CSS_RULE.is_match(content) && !CALL_AT_LINE_START.is_match(content)
}

fn looks_like_json(content: &str) -> bool {
    let bracketed = (content.starts_with('{') && content.ends_with('}'))
        || (content.starts_with('[') && content.ends_with(']'));
    bracketed && serde_json::from_str::<serde_json::Value>(content).is_ok()
}

fn looks_like_sql(content: &str) -> bool {
    SQL_STATEMENT.is_match(content)
}

fn looks_like_bash(content: &str) -> bool {
    content.starts_with("#!") || SHELL_COMMAND.is_match(content)
}
