//! contemplative-md
//!
//! Markdown to safe HTML for a personal site. Prose goes through a parse,
//! convert, highlight, link-annotate and sanitize pipeline; standalone source
//! files go through a size- and binary-gated code viewer.

pub mod config;
pub mod error;
pub mod file_handler;
pub mod markdown;
pub mod utils;

pub use config::Config;
pub use error::{AppError, AppResult, RenderError};
pub use file_handler::{CodeFileView, CodeViewer, ViewStatus};
pub use markdown::{MarkdownRenderer, SiteOrigin, UiElement};
