//! Canonical language identifiers for code fences.
//!
//! Tags follow the naming used by common syntax highlighters (`javascript`,
//! `markup`, `bash`, ...). Authors write all sorts of aliases in fence info
//! strings, so every declared tag is folded through [`LanguageTag::normalize`]
//! before it reaches the colorizer.

use std::fmt;

use serde::Serialize;

/// Sentinel meaning "no syntax coloring rule applies".
pub const TEXT: &str = "text";

const ALIASES: &[(&str, &str)] = &[
    ("js", "javascript"),
    ("ts", "typescript"),
    ("py", "python"),
    ("rb", "ruby"),
    ("sh", "bash"),
    ("shell", "bash"),
    ("yml", "yaml"),
    ("md", "markdown"),
    ("cpp", "cpp"),
    ("c++", "cpp"),
    ("csharp", "csharp"),
    ("c#", "csharp"),
    ("cs", "csharp"),
    ("php", "php"),
    ("go", "go"),
    ("rust", "rust"),
    ("rs", "rust"),
    ("swift", "swift"),
    ("kotlin", "kotlin"),
    ("kt", "kotlin"),
    ("scala", "scala"),
    ("r", "r"),
    ("matlab", "matlab"),
    ("sql", "sql"),
    ("html", "markup"),
    ("xml", "markup"),
    ("css", "css"),
    ("scss", "scss"),
    ("sass", "sass"),
    ("less", "less"),
    ("json", "json"),
    ("dockerfile", "docker"),
    ("makefile", "makefile"),
    ("vim", "vim"),
    ("powershell", "powershell"),
    ("ps1", "powershell"),
    ("batch", "batch"),
    ("bat", "batch"),
];

/// A normalized, lowercase language identifier. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct LanguageTag(String);

impl LanguageTag {
    /// The `text` sentinel.
    pub fn text() -> Self {
        Self(TEXT.to_string())
    }

    /// Fold a raw tag through the alias table.
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace. Tags
    /// missing from the table pass through lowercased; blank input becomes
    /// `text`. Every alias target maps to itself, so normalizing twice is a
    /// no-op.
    pub fn normalize(raw: &str) -> Self {
        let lowered = raw.trim().to_lowercase();
        if lowered.is_empty() {
            return Self::text();
        }

        match ALIASES.iter().find(|(alias, _)| *alias == lowered) {
            Some((_, canonical)) => Self((*canonical).to_string()),
            None => Self(lowered),
        }
    }

    pub(crate) fn from_static(tag: &'static str) -> Self {
        Self(tag.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_text(&self) -> bool {
        self.0 == TEXT
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve_case_insensitively() {
        assert_eq!(LanguageTag::normalize("js").as_str(), "javascript");
        assert_eq!(LanguageTag::normalize("yml").as_str(), "yaml");
        assert_eq!(LanguageTag::normalize("PY").as_str(), "python");
        assert_eq!(LanguageTag::normalize("  Shell ").as_str(), "bash");
        assert_eq!(LanguageTag::normalize("HTML").as_str(), "markup");
    }

    #[test]
    fn unknown_tags_pass_through_lowercased() {
        assert_eq!(LanguageTag::normalize("Haskell").as_str(), "haskell");
        assert_eq!(LanguageTag::normalize("toml").as_str(), "toml");
    }

    #[test]
    fn blank_tags_become_text() {
        assert!(LanguageTag::normalize("").is_text());
        assert!(LanguageTag::normalize("   ").is_text());
    }

    #[test]
    fn normalization_is_idempotent() {
        let samples = ["Js", "c#", "Dockerfile", "bat", "elixir", "TEXT", " ", "markup"];
        for sample in samples
            .iter()
            .copied()
            .chain(ALIASES.iter().map(|(alias, _)| *alias))
        {
            let once = LanguageTag::normalize(sample);
            let twice = LanguageTag::normalize(once.as_str());
            assert_eq!(once, twice, "normalizing `{sample}` twice changed the tag");
        }
    }
}
