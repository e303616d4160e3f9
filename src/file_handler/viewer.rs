//! Code-file viewer
//!
//! Gates file content by size and a binary heuristic, then highlights what
//! passes. Rejected content never reaches the highlighter.

use super::io::read_file;
use crate::config::{Config, ViewerConfig};
use crate::error::{AppResult, FileError, HighlightResult, RenderError};
use crate::markdown::syntax::{Highlighter, Language, PLAIN_TEXT};
use crate::utils::path;
use serde::Serialize;
use std::path::Path;

/// Outcome of viewing a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewStatus {
    Success,
    TooLarge,
    Binary,
}

/// Result handed to the file browser
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeFileView {
    pub status: ViewStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_count: Option<usize>,
    /// Content size in UTF-8 bytes
    pub file_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl CodeFileView {
    fn rejected(status: ViewStatus, file_size: u64, message: String) -> Self {
        Self {
            status,
            html: None,
            language: None,
            line_count: None,
            file_size,
            error_message: Some(message),
        }
    }
}

/// True when content contains NUL, or when control bytes other than tab,
/// LF and CR make up more than `threshold` of the first `sample_size` bytes
pub fn is_binary(content: &[u8], sample_size: usize, threshold: f64) -> bool {
    if content.contains(&0) {
        return true;
    }

    let sample = &content[..content.len().min(sample_size)];
    if sample.is_empty() {
        return false;
    }
    let control = sample
        .iter()
        .filter(|&&b| b < 32 && !matches!(b, b'\t' | b'\n' | b'\r'))
        .count();
    control as f64 / sample.len() as f64 > threshold
}

/// Size- and content-gated highlighter front end
#[derive(Debug, Clone, Default)]
pub struct CodeViewer {
    limits: ViewerConfig,
}

impl CodeViewer {
    pub fn new(limits: ViewerConfig) -> Self {
        Self { limits }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.viewer.clone())
    }

    fn too_large(&self, size: u64) -> CodeFileView {
        log::warn!(
            "Refusing to highlight {} bytes (limit {})",
            size,
            self.limits.max_file_size
        );
        CodeFileView::rejected(
            ViewStatus::TooLarge,
            size,
            format!(
                "This file is too large to display ({} bytes, limit {} bytes).",
                size, self.limits.max_file_size
            ),
        )
    }

    /// The rejection for this content, if any. Size is checked first.
    pub fn check(&self, content: &str) -> Option<CodeFileView> {
        let size = content.len() as u64;

        if size > self.limits.max_file_size {
            return Some(self.too_large(size));
        }

        if is_binary(
            content.as_bytes(),
            self.limits.binary_sample_size,
            self.limits.binary_threshold,
        ) {
            log::warn!("Refusing to highlight binary content ({} bytes)", size);
            return Some(CodeFileView::rejected(
                ViewStatus::Binary,
                size,
                "This appears to be a binary file and cannot be displayed.".to_string(),
            ));
        }

        None
    }

    /// View content with an explicit highlighter
    pub fn view_with(&self, content: &str, extension: &str, highlighter: &Highlighter) -> CodeFileView {
        if let Some(rejection) = self.check(content) {
            return rejection;
        }

        let language = Language::from_extension(extension)
            .map(|l| l.as_str())
            .unwrap_or(PLAIN_TEXT);
        let highlighted = highlighter.highlight(content, language);

        CodeFileView {
            status: ViewStatus::Success,
            html: Some(highlighted.html),
            language: Some(highlighted.language),
            line_count: Some(highlighted.line_count),
            file_size: content.len() as u64,
            error_message: None,
        }
    }

    /// View content with the shared highlighter, which is only awaited for
    /// content that passes the gates
    pub async fn view(&self, content: &str, extension: &str) -> HighlightResult<CodeFileView> {
        if let Some(rejection) = self.check(content) {
            return Ok(rejection);
        }
        let highlighter = Highlighter::shared().await?;
        Ok(self.view_with(content, extension, highlighter))
    }

    /// Read a file from disk and view it. Files over the size limit are
    /// rejected from their metadata without being read.
    pub async fn view_file(&self, file: impl AsRef<Path>) -> AppResult<CodeFileView> {
        let file = file.as_ref();

        if let Ok(metadata) = tokio::fs::metadata(file).await {
            if metadata.is_file() && metadata.len() > self.limits.max_file_size {
                return Ok(self.too_large(metadata.len()));
            }
        }

        let read = match read_file(file).await {
            Ok(read) => read,
            Err(FileError::FileTooLarge { size, .. }) => return Ok(self.too_large(size)),
            Err(e) => return Err(e.into()),
        };
        let extension = path::extension(file).unwrap_or_default();
        let view = self
            .view(&read.content, &extension)
            .await
            .map_err(RenderError::from)?;
        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_VIEWABLE_FILE_SIZE;

    #[test]
    fn test_is_binary() {
        assert!(!is_binary(b"", 8192, 0.10));
        assert!(!is_binary(b"plain\ttext\r\n", 8192, 0.10));
        assert!(is_binary(b"abc\0def", 8192, 0.10));
        // 1 control byte in 10 is not more than 10%
        assert!(!is_binary(b"\x01bcdefghij", 8192, 0.10));
        assert!(is_binary(b"\x01\x02cdefghij", 8192, 0.10));
    }

    #[test]
    fn test_nul_beyond_sample_is_binary() {
        let mut content = vec![b'a'; 10_000];
        content.push(0);
        assert!(is_binary(&content, 8192, 0.10));
    }

    #[test]
    fn test_too_large_is_rejected_first() {
        let viewer = CodeViewer::default();
        let content = "a".repeat(MAX_VIEWABLE_FILE_SIZE as usize + 1);
        let view = viewer.check(&content).unwrap();
        assert_eq!(view.status, ViewStatus::TooLarge);
        assert_eq!(view.file_size, 524_289);
        assert!(view.html.is_none());

        let mut with_nul = content.clone();
        with_nul.push('\0');
        assert_eq!(viewer.check(&with_nul).unwrap().status, ViewStatus::TooLarge);
    }

    #[test]
    fn test_nul_is_binary() {
        let view = CodeViewer::default().check("let a = 1;\0").unwrap();
        assert_eq!(view.status, ViewStatus::Binary);
        assert!(view.error_message.is_some());
    }

    #[test]
    fn test_multibyte_size_counts_bytes() {
        // 262_144 two-byte characters are exactly at the limit
        let content = "é".repeat(262_144);
        assert_eq!(content.len(), 524_288);
        assert!(CodeViewer::default().check(&content).is_none());
        let over = format!("{}a", content);
        assert!(CodeViewer::default().check(&over).is_some());
    }

    #[tokio::test]
    async fn test_exact_limit_succeeds() {
        let content = "a".repeat(MAX_VIEWABLE_FILE_SIZE as usize);
        let view = CodeViewer::default().view(&content, "txt").await.unwrap();
        assert_eq!(view.status, ViewStatus::Success);
        assert_eq!(view.language.as_deref(), Some("text"));
        assert_eq!(view.line_count, Some(1));
        assert_eq!(view.file_size, 524_288);
    }

    #[tokio::test]
    async fn test_supported_extension_is_highlighted() {
        let view = CodeViewer::default()
            .view("def f():\n    return 1\n", "py")
            .await
            .unwrap();
        assert_eq!(view.status, ViewStatus::Success);
        assert_eq!(view.language.as_deref(), Some("python"));
        assert_eq!(view.line_count, Some(2));
        assert!(view.html.unwrap().contains("data-rehype-pretty-code-figure"));
    }

    #[test]
    fn test_serialized_shape() {
        let view = CodeViewer::default().check("\0").unwrap();
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["status"], "binary");
        assert_eq!(json["fileSize"], 1);
        assert!(json.get("html").is_none());
        assert!(json.get("errorMessage").is_some());

        let too_large = CodeViewer::new(ViewerConfig {
            max_file_size: 1,
            ..ViewerConfig::default()
        })
        .check("ab")
        .unwrap();
        assert_eq!(serde_json::to_value(&too_large).unwrap()["status"], "too-large");
    }

    #[tokio::test]
    async fn test_view_file_over_read_cap_is_too_large() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("big.ts");
        let size = crate::file_handler::io::MAX_READ_SIZE + 1024 * 1024;
        std::fs::File::create(&file).unwrap().set_len(size).unwrap();

        let view = CodeViewer::default().view_file(&file).await.unwrap();
        assert_eq!(view.status, ViewStatus::TooLarge);
        assert_eq!(view.file_size, size);
        assert!(view.html.is_none());
    }

    #[tokio::test]
    async fn test_view_file_just_over_limit_is_too_large() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("app.js");
        std::fs::write(&file, "a".repeat(MAX_VIEWABLE_FILE_SIZE as usize + 1)).unwrap();

        let view = CodeViewer::default().view_file(&file).await.unwrap();
        assert_eq!(view.status, ViewStatus::TooLarge);
        assert_eq!(view.file_size, 524_289);
    }

    #[tokio::test]
    async fn test_view_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("styles.CSS");
        std::fs::write(&file, "a { color: red; }\n").unwrap();

        let view = CodeViewer::default().view_file(&file).await.unwrap();
        assert_eq!(view.status, ViewStatus::Success);
        assert_eq!(view.language.as_deref(), Some("css"));
    }
}
