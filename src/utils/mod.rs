//! Utilities module for contemplative-md
//!
//! Shared helper functions:
//! - Path utilities
//! - Text utilities (escaping, line counting)

use std::path::Path;

/// Path utilities
pub mod path {
    use super::*;

    /// Get the file extension, lowercased
    pub fn extension(path: &Path) -> Option<String> {
        path.extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase())
    }

    /// Check if path has a markdown extension
    pub fn is_markdown(path: &Path) -> bool {
        matches!(
            extension(path).as_deref(),
            Some("md" | "markdown" | "mdown" | "mkd")
        )
    }
}

/// Text utilities
pub mod text {
    /// Escape the five HTML-significant characters `& < > " '`
    pub fn escape_html(s: &str) -> String {
        let mut out = String::with_capacity(s.len());
        for c in s.chars() {
            match c {
                '&' => out.push_str("&amp;"),
                '<' => out.push_str("&lt;"),
                '>' => out.push_str("&gt;"),
                '"' => out.push_str("&quot;"),
                '\'' => out.push_str("&#39;"),
                _ => out.push(c),
            }
        }
        out
    }

    /// Count lines in text. A trailing newline does not start a new line.
    pub fn line_count(text: &str) -> usize {
        if text.is_empty() {
            0
        } else {
            text.lines().count()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_markdown() {
        assert!(path::is_markdown(Path::new("test.md")));
        assert!(path::is_markdown(Path::new("notes/Entry.MARKDOWN")));
        assert!(!path::is_markdown(Path::new("test.txt")));
    }

    #[test]
    fn test_extension_lowercased() {
        assert_eq!(path::extension(Path::new("App.TSX")).as_deref(), Some("tsx"));
        assert_eq!(path::extension(Path::new("Makefile")), None);
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            text::escape_html(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;"
        );
        assert_eq!(text::escape_html("plain"), "plain");
    }

    #[test]
    fn test_line_count() {
        assert_eq!(text::line_count(""), 0);
        assert_eq!(text::line_count("one"), 1);
        assert_eq!(text::line_count("one\ntwo\n"), 2);
        assert_eq!(text::line_count("one\n\nthree"), 3);
    }
}
