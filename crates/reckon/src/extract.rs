// Copyright © 2026 reckon contributors
// Licensed under the Apache License, Version 2.0

//! Turning raw completions into programs.
//!
//! Plain mode splits the completion on line breaks verbatim. Fenced mode
//! handles chat-style models that wrap code in markdown fences despite
//! instructions not to: prefer the fence tagged with the target language,
//! fall back to a generic fence, fall back to the whole text. Extraction
//! never fails.

/// An ordered sequence of source lines derived from one completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    lines: Vec<String>,
}

impl Program {
    /// Plain mode: split the raw text on line breaks verbatim.
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: text.split('\n').map(|l| l.to_string()).collect(),
        }
    }

    /// Fenced mode: strip a markdown fence for `language` first, then split.
    pub fn from_fenced(text: &str, language: &str) -> Self {
        Self::from_text(extract_fenced(text, language))
    }

    /// The program's lines.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// The program joined back into one source string.
    pub fn source(&self) -> String {
        self.lines.join("\n")
    }

    /// Whether the program contains no non-blank line.
    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.trim().is_empty())
    }

    /// Split for default-mode execution: everything before the last
    /// non-blank line as statements, that line itself as the final
    /// expression. `None` when the program is blank.
    pub fn split_last_expression(&self) -> Option<(String, &str)> {
        let last = self.lines.iter().rposition(|l| !l.trim().is_empty())?;
        let statements = self.lines[..last].join("\n");
        Some((statements, self.lines[last].as_str()))
    }
}

/// Extract the body of the first fenced code block, if any.
fn fenced_block<'a>(text: &'a str, marker: &str) -> Option<&'a str> {
    let open = text.find(marker)? + marker.len();
    // Body starts after the rest of the marker line.
    let body = open + text[open..].find('\n')? + 1;
    let close = text[body..].find("```")?;
    Some(&text[body..body + close])
}

/// Best-effort fence stripping: language-tagged fence, then generic fence,
/// then the unmodified text.
pub fn extract_fenced<'a>(text: &'a str, language: &str) -> &'a str {
    let tagged = format!("```{language}");
    fenced_block(text, &tagged)
        .or_else(|| fenced_block(text, "```"))
        .unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_split_is_verbatim() {
        let program = Program::from_text("let a = 1;\n\nlet b = 2;");
        assert_eq!(program.lines().len(), 3);
        assert_eq!(program.lines()[1], "");
        assert_eq!(program.source(), "let a = 1;\n\nlet b = 2;");
    }

    #[test]
    fn test_tagged_fence_preferred() {
        let text = "Sure, here it is:\n```rhai\nlet x = 1;\nx\n```\nHope that helps!";
        assert_eq!(extract_fenced(text, "rhai"), "let x = 1;\nx\n");
    }

    #[test]
    fn test_generic_fence_fallback() {
        let text = "```\nlet x = 1;\n```";
        assert_eq!(extract_fenced(text, "rhai"), "let x = 1;\n");
    }

    #[test]
    fn test_no_fence_returns_whole_text() {
        let text = "let x = 1;\nx";
        assert_eq!(extract_fenced(text, "rhai"), text);
    }

    #[test]
    fn test_unterminated_fence_returns_whole_text() {
        let text = "```rhai\nlet x = 1;";
        assert_eq!(extract_fenced(text, "rhai"), text);
    }

    #[test]
    fn test_split_last_expression_skips_trailing_blanks() {
        let program = Program::from_text("let x = 2 + 2;\nx\n\n");
        let (statements, expr) = program.split_last_expression().unwrap();
        assert_eq!(statements, "let x = 2 + 2;");
        assert_eq!(expr, "x");
    }

    #[test]
    fn test_split_last_expression_single_line() {
        let program = Program::from_text("1 + 1");
        let (statements, expr) = program.split_last_expression().unwrap();
        assert_eq!(statements, "");
        assert_eq!(expr, "1 + 1");
    }

    #[test]
    fn test_blank_program() {
        let program = Program::from_text("\n  \n");
        assert!(program.is_empty());
        assert!(program.split_last_expression().is_none());
    }
}
