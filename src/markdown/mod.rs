//! Markdown module for contemplative-md
//!
//! The prose rendering pipeline:
//! - Parsing markdown into a syntax tree
//! - Converting it into an HTML tree
//! - Highlighting fenced code blocks
//! - Annotating external links
//! - Sanitizing against an allow-list schema
//! - Rendering the result into UI elements

pub mod autolink;
pub mod convert;
pub mod hast;
pub mod links;
pub mod parser;
pub mod preview;
pub mod sanitize;
pub mod syntax;

pub use convert::to_hast;
pub use hast::{Element, Node, PropertyValue};
pub use links::{annotate_external_links, LinkKind, SiteOrigin};
pub use parser::{parse, Align, MarkdownParser, MdNode};
pub use preview::{render_to_ui, UiElement};
pub use sanitize::{default_schema, sanitize, AttributeRule, Schema};
pub use syntax::{
    highlight_code_blocks, FenceDirectives, HighlightedCode, Highlighter, Language, Theme,
};

use crate::config::{Config, DEFAULT_ERROR_MESSAGE};
use crate::error::{ConfigResult, RenderError, RenderResult};
use std::sync::Arc;
use std::time::Instant;

/// Run every pipeline stage from markdown source to a sanitized tree
pub fn run_stages(source: &str, highlighter: &Highlighter, site: &SiteOrigin, schema: &Schema) -> Node {
    let started = Instant::now();

    let mdast = parse(source);
    let mut tree = to_hast(&mdast);
    highlight_code_blocks(&mut tree, highlighter);
    annotate_external_links(&mut tree, site);
    let clean = sanitize(&tree, schema);

    log::debug!(
        "Rendered {} bytes of markdown in {:?}",
        source.len(),
        started.elapsed()
    );
    clean
}

/// Run a pipeline closure on the blocking pool, turning a panic or
/// cancellation into a [`RenderError`]
pub async fn run_guarded<F, T>(job: F) -> RenderResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job).await.map_err(|e| {
        if e.is_panic() {
            RenderError::Panicked
        } else {
            RenderError::Cancelled
        }
    })
}

/// Prose renderer: markdown in, sanitized UI tree out
#[derive(Debug, Clone)]
pub struct MarkdownRenderer {
    site: SiteOrigin,
    schema: Arc<Schema>,
    error_message: String,
}

impl MarkdownRenderer {
    pub fn new(site: SiteOrigin) -> Self {
        Self {
            site,
            schema: Arc::new(default_schema().clone()),
            error_message: DEFAULT_ERROR_MESSAGE.to_string(),
        }
    }

    pub fn from_config(config: &Config) -> ConfigResult<Self> {
        let site = SiteOrigin::from_config(&config.site)?;
        Ok(Self::new(site).with_error_message(config.render.error_message.clone()))
    }

    /// Use a custom sanitizer schema
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Arc::new(schema);
        self
    }

    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = message.into();
        self
    }

    pub fn site(&self) -> &SiteOrigin {
        &self.site
    }

    /// Render markdown into a sanitized HTML tree
    pub async fn render_hast(&self, source: &str) -> RenderResult<Node> {
        let highlighter = Highlighter::shared().await?;
        let source = source.to_string();
        let site = self.site.clone();
        let schema = Arc::clone(&self.schema);

        run_guarded(move || run_stages(&source, highlighter, &site, &schema)).await
    }

    /// Render markdown into sanitized HTML
    pub async fn render_html(&self, source: &str) -> RenderResult<String> {
        let tree = self.render_hast(source).await?;
        Ok(hast::to_html(&tree))
    }

    /// Render markdown into UI elements. Never fails: any pipeline error
    /// becomes an alert placeholder.
    pub async fn render(&self, source: &str) -> UiElement {
        let result = self.render_hast(source).await;
        self.into_ui(result)
    }

    /// Turn a pipeline result into UI, replacing errors with the placeholder
    pub fn into_ui(&self, result: RenderResult<Node>) -> UiElement {
        match result {
            Ok(tree) => render_to_ui(&tree, &self.site),
            Err(e) => {
                log::warn!("Markdown rendering failed: {}", e);
                UiElement::alert(self.error_message.clone())
            }
        }
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new(SiteOrigin::unknown())
    }
}
