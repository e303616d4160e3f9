//! Syntax highlighting for fenced code blocks
//!
//! Code is tokenized with syntect and every token is wrapped in a span whose
//! style references a CSS custom property (`color:var(--syntax-keyword)`), so
//! pages restyle highlighted markup through their own theme variables. The
//! syntax set and theme are built once per process and shared.

use super::hast::{Element, Node, PropertyValue};
use crate::error::{HighlightError, HighlightResult};
use crate::utils::text::{escape_html, line_count};
use regex::Regex;
use std::fmt::Write as _;
use std::ops::RangeInclusive;
use std::sync::OnceLock;
use std::time::Instant;
use syntect::easy::ScopeRegionIterator;
use syntect::parsing::{ParseState, Scope, ScopeStack, SyntaxReference, SyntaxSet};
use tokio::sync::OnceCell;

/// Name of the only theme
pub const THEME_NAME: &str = "contemplative";

/// Language reported for anything outside the supported set
pub const PLAIN_TEXT: &str = "text";

/// Languages the highlighter knows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    TypeScript,
    Tsx,
    JavaScript,
    Jsx,
    Json,
    Markdown,
    Css,
    Html,
    Yaml,
    Python,
    Bash,
}

impl Language {
    pub const ALL: [Language; 11] = [
        Language::TypeScript,
        Language::Tsx,
        Language::JavaScript,
        Language::Jsx,
        Language::Json,
        Language::Markdown,
        Language::Css,
        Language::Html,
        Language::Yaml,
        Language::Python,
        Language::Bash,
    ];

    /// Look up a fence language name or alias, case-insensitively
    pub fn from_name(name: &str) -> Option<Self> {
        let language = match name.trim().to_ascii_lowercase().as_str() {
            "typescript" | "ts" => Language::TypeScript,
            "tsx" => Language::Tsx,
            "javascript" | "js" | "mjs" | "cjs" => Language::JavaScript,
            "jsx" => Language::Jsx,
            "json" => Language::Json,
            "markdown" | "md" => Language::Markdown,
            "css" => Language::Css,
            "html" | "htm" => Language::Html,
            "yaml" | "yml" => Language::Yaml,
            "python" | "py" => Language::Python,
            "bash" | "sh" | "shell" => Language::Bash,
            _ => return None,
        };
        Some(language)
    }

    /// Map a file extension (without the dot) to a language
    pub fn from_extension(extension: &str) -> Option<Self> {
        let language = match extension.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "ts" | "mts" | "cts" => Language::TypeScript,
            "tsx" => Language::Tsx,
            "js" | "mjs" | "cjs" => Language::JavaScript,
            "jsx" => Language::Jsx,
            "json" => Language::Json,
            "md" | "markdown" => Language::Markdown,
            "css" => Language::Css,
            "html" | "htm" => Language::Html,
            "yaml" | "yml" => Language::Yaml,
            "py" => Language::Python,
            "sh" | "bash" => Language::Bash,
            _ => return None,
        };
        Some(language)
    }

    /// Canonical identifier used in `data-language`
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::TypeScript => "typescript",
            Language::Tsx => "tsx",
            Language::JavaScript => "javascript",
            Language::Jsx => "jsx",
            Language::Json => "json",
            Language::Markdown => "markdown",
            Language::Css => "css",
            Language::Html => "html",
            Language::Yaml => "yaml",
            Language::Python => "python",
            Language::Bash => "bash",
        }
    }

    /// Extension used to find the grammar in the syntax set.
    /// The bundled grammars have no TypeScript, so the TS family uses JavaScript.
    fn syntax_extension(&self) -> &'static str {
        match self {
            Language::TypeScript | Language::Tsx | Language::JavaScript | Language::Jsx => "js",
            Language::Json => "json",
            Language::Markdown => "md",
            Language::Css => "css",
            Language::Html => "html",
            Language::Yaml => "yaml",
            Language::Python => "py",
            Language::Bash => "sh",
        }
    }
}

/// Style applied to a token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenStyle {
    /// CSS custom property holding the color
    pub variable: &'static str,
    pub italic: bool,
    pub bold: bool,
}

impl TokenStyle {
    /// Inline style value, e.g. `color:var(--syntax-comment);font-style:italic`
    pub fn to_css(&self) -> String {
        let mut css = format!("color:var({})", self.variable);
        if self.italic {
            css.push_str(";font-style:italic");
        }
        if self.bold {
            css.push_str(";font-weight:bold");
        }
        css
    }
}

/// One theme entry: a scope selector and the style it maps to
#[derive(Debug, Clone)]
pub struct ThemeRule {
    pub selector: &'static str,
    scope: Scope,
    pub style: TokenStyle,
    /// Default value emitted by [`Theme::css_variables`]
    pub fallback: &'static str,
}

/// (selector, variable, fallback color, italic, bold), most specific first
const CONTEMPLATIVE_RULES: &[(&str, &str, &str, bool, bool)] = &[
    ("comment", "--syntax-comment", "#6a737d", true, false),
    ("string.regexp", "--syntax-string-regexp", "#22863a", false, false),
    ("string", "--syntax-string", "#032f62", false, false),
    ("constant.numeric", "--syntax-constant-numeric", "#005cc5", false, false),
    ("constant.language", "--syntax-constant-language", "#005cc5", false, false),
    ("constant.character.escape", "--syntax-constant-escape", "#22863a", false, false),
    ("constant", "--syntax-constant", "#005cc5", false, false),
    ("keyword.control", "--syntax-keyword-control", "#d73a49", false, false),
    ("keyword.operator", "--syntax-keyword-operator", "#d73a49", false, false),
    ("keyword", "--syntax-keyword", "#d73a49", false, false),
    ("storage.type", "--syntax-storage-type", "#d73a49", false, false),
    ("storage.modifier", "--syntax-storage-modifier", "#d73a49", false, false),
    ("storage", "--syntax-storage", "#d73a49", false, false),
    ("entity.name.function", "--syntax-function", "#6f42c1", false, false),
    ("support.function", "--syntax-function", "#6f42c1", false, false),
    ("entity.name.tag", "--syntax-tag", "#22863a", false, false),
    ("entity.other.attribute-name", "--syntax-attribute", "#6f42c1", false, false),
    ("entity.name", "--syntax-type", "#6f42c1", false, false),
    ("support.type", "--syntax-type", "#6f42c1", false, false),
    ("support.class", "--syntax-type", "#6f42c1", false, false),
    ("variable.parameter", "--syntax-parameter", "#e36209", false, false),
    ("variable.language", "--syntax-variable-language", "#005cc5", false, false),
    ("variable", "--syntax-variable", "#24292e", false, false),
    ("markup.heading", "--syntax-markup-heading", "#005cc5", false, true),
    ("markup.bold", "--syntax-markup-bold", "#24292e", false, true),
    ("markup.italic", "--syntax-markup-italic", "#24292e", true, false),
    ("markup.inserted", "--syntax-markup-inserted", "#22863a", false, false),
    ("markup.deleted", "--syntax-markup-deleted", "#b31d28", false, false),
    ("markup.underline.link", "--syntax-markup-link", "#032f62", false, false),
    ("markup.raw", "--syntax-markup-code", "#005cc5", false, false),
    ("invalid", "--syntax-invalid", "#b31d28", true, false),
];

/// Scope-to-variable theme
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: &'static str,
    rules: Vec<ThemeRule>,
}

impl Theme {
    /// Build the "contemplative" theme
    pub fn contemplative() -> HighlightResult<Self> {
        let rules = CONTEMPLATIVE_RULES
            .iter()
            .map(|&(selector, variable, fallback, italic, bold)| {
                let scope = Scope::new(selector).map_err(|e| HighlightError::InvalidScope {
                    scope: selector,
                    reason: format!("{:?}", e),
                })?;
                Ok(ThemeRule {
                    selector,
                    scope,
                    style: TokenStyle {
                        variable,
                        italic,
                        bold,
                    },
                    fallback,
                })
            })
            .collect::<HighlightResult<Vec<_>>>()?;

        Ok(Self {
            name: THEME_NAME,
            rules,
        })
    }

    pub fn rules(&self) -> &[ThemeRule] {
        &self.rules
    }

    /// Style for a scope stack; the innermost scope with a matching rule wins
    pub fn style_for(&self, stack: &[Scope]) -> Option<&TokenStyle> {
        stack.iter().rev().find_map(|scope| {
            self.rules
                .iter()
                .find(|rule| rule.scope.is_prefix_of(*scope))
                .map(|rule| &rule.style)
        })
    }

    /// A `:root` block declaring a default for every variable the theme uses
    pub fn css_variables(&self) -> String {
        let mut css = String::from(":root {\n");
        let mut seen = Vec::new();
        for rule in &self.rules {
            if seen.contains(&rule.style.variable) {
                continue;
            }
            seen.push(rule.style.variable);
            let _ = writeln!(css, "  {}: {};", rule.style.variable, rule.fallback);
        }
        css.push_str("}\n");
        css
    }
}

/// Authoring directives read from a fence's meta string
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FenceDirectives {
    /// Inclusive, 1-based, block-relative line ranges to highlight
    pub highlighted: Vec<RangeInclusive<usize>>,
    /// First gutter number when line numbers are shown
    pub line_numbers_start: Option<usize>,
}

fn show_line_numbers_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"showLineNumbers(?:\{(\d+)\})?").expect("valid regex"))
}

fn line_ranges_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([^}]*)\}").expect("valid regex"))
}

impl FenceDirectives {
    /// Parse `showLineNumbers`, `showLineNumbers{N}` and `{N,M-O}` directives
    pub fn parse(meta: Option<&str>) -> Self {
        let Some(meta) = meta else {
            return Self::default();
        };

        let mut directives = Self::default();
        let mut rest = meta.to_string();

        if let Some(caps) = show_line_numbers_regex().captures(meta) {
            directives.line_numbers_start = Some(
                caps.get(1)
                    .and_then(|m| m.as_str().parse().ok())
                    .unwrap_or(1),
            );
            if let Some(whole) = caps.get(0) {
                rest.replace_range(whole.range(), "");
            }
        }

        if let Some(caps) = line_ranges_regex().captures(&rest) {
            if let Some(body) = caps.get(1) {
                directives.highlighted = parse_ranges(body.as_str());
            }
        }

        directives
    }

    /// Whether the 1-based line should carry `data-highlighted-line`
    pub fn is_highlighted(&self, line: usize) -> bool {
        self.highlighted.iter().any(|range| range.contains(&line))
    }
}

/// Parse `1,3-4` into ranges, skipping malformed entries
fn parse_ranges(body: &str) -> Vec<RangeInclusive<usize>> {
    body.split(',')
        .filter_map(|part| {
            let part = part.trim();
            match part.split_once('-') {
                Some((a, b)) => {
                    let start: usize = a.trim().parse().ok()?;
                    let end: usize = b.trim().parse().ok()?;
                    (start <= end).then_some(start..=end)
                }
                None => {
                    let n: usize = part.parse().ok()?;
                    Some(n..=n)
                }
            }
        })
        .collect()
}

/// Output of [`Highlighter::highlight`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightedCode {
    pub html: String,
    pub language: String,
    pub line_count: usize,
}

/// A run of text with an optional style
#[derive(Debug, Clone, PartialEq)]
struct Token<'t> {
    text: String,
    style: Option<&'t TokenStyle>,
}

/// Shared tokenizer and theme
pub struct Highlighter {
    syntax_set: SyntaxSet,
    theme: Theme,
}

static SHARED: OnceCell<Highlighter> = OnceCell::const_new();

impl Highlighter {
    /// Load grammars and the theme, checking every supported language resolves
    pub fn build() -> HighlightResult<Self> {
        let started = Instant::now();
        let syntax_set = SyntaxSet::load_defaults_newlines();
        let theme = Theme::contemplative()?;

        for language in Language::ALL {
            if syntax_set
                .find_syntax_by_extension(language.syntax_extension())
                .is_none()
            {
                return Err(HighlightError::MissingSyntax(language.as_str()));
            }
        }

        log::debug!(
            "Highlighter built with {} grammars in {:?}",
            syntax_set.syntaxes().len(),
            started.elapsed()
        );
        Ok(Self { syntax_set, theme })
    }

    /// The process-wide highlighter.
    ///
    /// The first call starts construction on the blocking pool; concurrent
    /// callers await that same construction. A failed construction is not
    /// cached, so a later call tries again.
    pub async fn shared() -> HighlightResult<&'static Highlighter> {
        SHARED
            .get_or_try_init(|| async {
                tokio::task::spawn_blocking(Highlighter::build)
                    .await
                    .map_err(|e| HighlightError::Construction(e.to_string()))?
            })
            .await
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    fn syntax_for(&self, language: Language) -> HighlightResult<&SyntaxReference> {
        self.syntax_set
            .find_syntax_by_extension(language.syntax_extension())
            .ok_or(HighlightError::MissingSyntax(language.as_str()))
    }

    /// Split code into lines of styled tokens
    fn tokenize(&self, code: &str, language: Language) -> HighlightResult<Vec<Vec<Token<'_>>>> {
        let syntax = self.syntax_for(language)?;
        let mut state = ParseState::new(syntax);
        let mut stack = ScopeStack::new();
        let mut lines = Vec::new();

        for line in code.lines() {
            let line = format!("{}\n", line);
            let ops = state
                .parse_line(&line, &self.syntax_set)
                .map_err(|e| HighlightError::Tokenize(format!("{:?}", e)))?;

            let mut tokens: Vec<Token<'_>> = Vec::new();
            for (region, op) in ScopeRegionIterator::new(&ops, &line) {
                stack
                    .apply(op)
                    .map_err(|e| HighlightError::Tokenize(format!("{:?}", e)))?;
                let text = region.trim_end_matches('\n');
                if text.is_empty() {
                    continue;
                }
                let style = self.theme.style_for(stack.as_slice());
                match tokens.last_mut() {
                    Some(last) if last.style == style => last.text.push_str(text),
                    _ => tokens.push(Token {
                        text: text.to_string(),
                        style,
                    }),
                }
            }
            lines.push(tokens);
        }

        Ok(lines)
    }

    /// Build the `figure > pre > code > span[data-line]` tree for a block
    pub fn render_block(&self, code: &str, language: Language, directives: &FenceDirectives) -> Element {
        let lines = match self.tokenize(code, language) {
            Ok(lines) => lines,
            Err(e) => {
                log::warn!("Highlighting {} failed, using plain text: {}", language.as_str(), e);
                code.lines()
                    .map(|line| {
                        vec![Token {
                            text: line.to_string(),
                            style: None,
                        }]
                    })
                    .collect()
            }
        };

        let mut code_el = Element::new("code")
            .with_property("data-language", language.as_str())
            .with_property("data-theme", THEME_NAME);
        if let Some(start) = directives.line_numbers_start {
            let last = start.saturating_add(lines.len().saturating_sub(1));
            code_el = code_el
                .with_property("data-line-numbers", PropertyValue::String(String::new()))
                .with_property("data-line-numbers-max-digits", last.to_string().len().to_string());
        }

        let mut children = Vec::with_capacity(lines.len() * 2);
        for (index, tokens) in lines.into_iter().enumerate() {
            if index > 0 {
                children.push(Node::text("\n"));
            }
            children.push(render_line(index + 1, tokens, directives).into());
        }

        let pre = Element::new("pre")
            .with_property("data-language", language.as_str())
            .with_property("data-theme", THEME_NAME)
            .with_children(vec![code_el.with_children(children).into()]);

        Element::new("figure")
            .with_property("data-rehype-pretty-code-figure", PropertyValue::String(String::new()))
            .with_property("data-theme", THEME_NAME)
            .with_children(vec![pre.into()])
    }

    /// Highlight a whole file or snippet to an HTML string.
    ///
    /// Unknown languages come back as an escaped `<pre><code>` block that
    /// does not depend on later sanitizing.
    pub fn highlight(&self, code: &str, language: &str) -> HighlightedCode {
        match Language::from_name(language) {
            Some(lang) => {
                let figure = self.render_block(code, lang, &FenceDirectives::default());
                HighlightedCode {
                    html: super::hast::to_html(&figure.into()),
                    language: lang.as_str().to_string(),
                    line_count: line_count(code),
                }
            }
            None => HighlightedCode {
                html: plain_text_html(code),
                language: PLAIN_TEXT.to_string(),
                line_count: line_count(code),
            },
        }
    }
}

fn render_line(number: usize, tokens: Vec<Token<'_>>, directives: &FenceDirectives) -> Element {
    let mut line = Element::new("span").with_property("data-line", PropertyValue::String(String::new()));
    if let Some(start) = directives.line_numbers_start {
        line = line.with_property("data-line-number", start.saturating_add(number - 1).to_string());
    }
    if directives.is_highlighted(number) {
        line = line.with_property("data-highlighted-line", PropertyValue::String(String::new()));
    }

    let children = tokens
        .into_iter()
        .map(|token| match token.style {
            Some(style) => Element::new("span")
                .with_property("style", style.to_css())
                .with_children(vec![Node::text(token.text)])
                .into(),
            None => Node::text(token.text),
        })
        .collect();
    line.with_children(children)
}

/// Escaped fallback block for languages outside the supported set
pub fn plain_text_html(code: &str) -> String {
    format!(
        "<pre><code data-language=\"{}\">{}</code></pre>",
        PLAIN_TEXT,
        escape_html(code)
    )
}

/// Replace every `pre > code` block in the tree with its highlighted form
pub fn highlight_code_blocks(tree: &mut Node, highlighter: &Highlighter) {
    match tree {
        Node::Root(children) => highlight_children(children, highlighter),
        Node::Element(el) => highlight_children(&mut el.children, highlighter),
        _ => {}
    }
}

fn highlight_children(children: &mut [Node], highlighter: &Highlighter) {
    for child in children.iter_mut() {
        let replacement = match child {
            Node::Element(el) if el.tag_name == "pre" => code_block_parts(el)
                .map(|(language, meta, code)| highlight_block(highlighter, language, meta, &code)),
            _ => None,
        };

        match replacement {
            Some(node) => *child = node,
            None => {
                if let Node::Element(el) = child {
                    highlight_children(&mut el.children, highlighter);
                }
            }
        }
    }
}

/// Language name, meta and text of a `pre` holding a single `code`
fn code_block_parts(pre: &Element) -> Option<(Option<String>, Option<String>, String)> {
    let mut elements = pre.children.iter().filter_map(|n| match n {
        Node::Element(el) => Some(el),
        _ => None,
    });
    let code = elements.next()?;
    if code.tag_name != "code" || elements.next().is_some() {
        return None;
    }

    let language = match code.property("class") {
        Some(PropertyValue::List(classes)) => classes
            .iter()
            .find_map(|c| c.strip_prefix("language-").map(str::to_string)),
        Some(PropertyValue::String(class)) => class
            .split_whitespace()
            .find_map(|c| c.strip_prefix("language-").map(str::to_string)),
        _ => None,
    };
    let meta = code.property("data-meta").and_then(|v| v.as_str()).map(str::to_string);
    Some((language, meta, code.text_content()))
}

fn highlight_block(highlighter: &Highlighter, language: Option<String>, meta: Option<String>, code: &str) -> Node {
    match language.as_deref().and_then(Language::from_name) {
        Some(lang) => {
            let directives = FenceDirectives::parse(meta.as_deref());
            highlighter.render_block(code, lang, &directives).into()
        }
        None => {
            let code_el = Element::new("code")
                .with_property("data-language", PLAIN_TEXT)
                .with_children(vec![Node::text(code)]);
            Element::new("pre").with_children(vec![code_el.into()]).into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::hast::to_html;

    #[test]
    fn test_language_lookup() {
        assert_eq!(Language::from_name("TypeScript"), Some(Language::TypeScript));
        assert_eq!(Language::from_name("sh"), Some(Language::Bash));
        assert_eq!(Language::from_name("rust"), None);
        assert_eq!(Language::from_extension(".tsx"), Some(Language::Tsx));
        assert_eq!(Language::from_extension("yml"), Some(Language::Yaml));
        assert_eq!(Language::from_extension("rs"), None);
        assert_eq!(Language::ALL.len(), 11);
    }

    #[test]
    fn test_directives_ranges() {
        let d = FenceDirectives::parse(Some("{1,3-4}"));
        let marked: Vec<usize> = (1..=4).filter(|n| d.is_highlighted(*n)).collect();
        assert_eq!(marked, vec![1, 3, 4]);
        assert_eq!(d.line_numbers_start, None);
    }

    #[test]
    fn test_directives_line_numbers() {
        assert_eq!(
            FenceDirectives::parse(Some("showLineNumbers{5}")).line_numbers_start,
            Some(5)
        );
        let d = FenceDirectives::parse(Some("showLineNumbers {2}"));
        assert_eq!(d.line_numbers_start, Some(1));
        assert!(d.is_highlighted(2));
        assert!(!d.is_highlighted(1));
    }

    #[test]
    fn test_directives_ignore_garbage() {
        let d = FenceDirectives::parse(Some("{a, 4-2, 7}"));
        assert_eq!(d.highlighted, vec![7..=7]);
        assert_eq!(FenceDirectives::parse(None), FenceDirectives::default());
    }

    #[test]
    fn test_huge_range_is_cheap() {
        let d = FenceDirectives::parse(Some("{1-18446744073709551615}"));
        assert!(d.is_highlighted(1_000_000));
    }

    #[test]
    fn test_theme_styles_innermost_scope() {
        let theme = Theme::contemplative().unwrap();
        let stack = [
            Scope::new("source.js").unwrap(),
            Scope::new("keyword.control.flow.js").unwrap(),
        ];
        let style = theme.style_for(&stack).unwrap();
        assert_eq!(style.to_css(), "color:var(--syntax-keyword-control)");

        let comment = [Scope::new("comment.line.double-slash.js").unwrap()];
        assert_eq!(
            theme.style_for(&comment).unwrap().to_css(),
            "color:var(--syntax-comment);font-style:italic"
        );
        assert!(theme.style_for(&[Scope::new("source.js").unwrap()]).is_none());
    }

    #[test]
    fn test_css_variables_unique() {
        let css = Theme::contemplative().unwrap().css_variables();
        assert!(css.starts_with(":root {"));
        assert_eq!(css.matches("--syntax-function:").count(), 1);
    }

    #[test]
    fn test_unknown_language_fallback_is_escaped() {
        let highlighter = Highlighter::build().unwrap();
        let out = highlighter.highlight("fn main() { println!(\"<hi>\"); }", "rust");
        assert_eq!(out.language, "text");
        assert!(out.html.starts_with("<pre><code data-language=\"text\">"));
        assert!(out.html.contains("&lt;hi&gt;"));
        assert!(out.html.contains("&quot;"));
        assert_eq!(out.line_count, 1);
    }

    #[test]
    fn test_highlight_supported_language() {
        let highlighter = Highlighter::build().unwrap();
        let out = highlighter.highlight("const a = 1;\n// note\n", "typescript");
        assert_eq!(out.language, "typescript");
        assert_eq!(out.line_count, 2);
        assert!(out.html.starts_with("<figure data-rehype-pretty-code-figure=\"\" data-theme=\"contemplative\">"));
        assert_eq!(out.html.matches("data-line=\"\"").count(), 2);
        assert!(out.html.contains("style=\"color:var(--syntax-"));
        assert!(out.html.contains("font-style:italic"));
    }

    #[test]
    fn test_block_directives_applied() {
        let highlighter = Highlighter::build().unwrap();
        let directives = FenceDirectives::parse(Some("showLineNumbers{5} {1,3-4}"));
        let figure = highlighter.render_block("a\nb\nc\nd", Language::JavaScript, &directives);
        let tree: Node = figure.into();
        let lines = tree.find_all("span");
        let lines: Vec<&Element> = lines
            .into_iter()
            .filter(|s| s.property("data-line").is_some())
            .collect();
        assert_eq!(lines.len(), 4);
        let numbers: Vec<&str> = lines
            .iter()
            .filter_map(|l| l.property("data-line-number").and_then(|v| v.as_str()))
            .collect();
        assert_eq!(numbers, vec!["5", "6", "7", "8"]);
        let highlighted: Vec<usize> = lines
            .iter()
            .enumerate()
            .filter(|(_, l)| l.property("data-highlighted-line").is_some())
            .map(|(i, _)| i + 1)
            .collect();
        assert_eq!(highlighted, vec![1, 3, 4]);
        assert!(to_html(&tree).contains("data-line-numbers=\"\""));
    }

    #[test]
    fn test_line_numbers_saturate_at_max_start() {
        let highlighter = Highlighter::build().unwrap();
        let directives = FenceDirectives::parse(Some("showLineNumbers{18446744073709551615}"));
        assert_eq!(directives.line_numbers_start, Some(usize::MAX));

        let tree: Node = highlighter
            .render_block("a\nb\nc", Language::JavaScript, &directives)
            .into();
        let numbers: Vec<String> = tree
            .find_all("span")
            .into_iter()
            .filter_map(|l| l.property("data-line-number").and_then(|v| v.as_str()))
            .map(str::to_string)
            .collect();
        assert_eq!(numbers, vec![usize::MAX.to_string(); 3]);
        assert!(!numbers.contains(&"0".to_string()));
    }

    #[test]
    fn test_pipeline_fallback_for_unknown_fence() {
        let highlighter = Highlighter::build().unwrap();
        let mut tree = Node::Root(vec![Element::new("pre")
            .with_children(vec![Element::new("code")
                .with_property("class", PropertyValue::List(vec!["language-rust".into()]))
                .with_children(vec![Node::text("let x = 1 < 2;\n")])
                .into()])
            .into()]);
        highlight_code_blocks(&mut tree, &highlighter);
        assert_eq!(
            to_html(&tree),
            "<pre><code data-language=\"text\">let x = 1 &lt; 2;\n</code></pre>"
        );
    }

    #[tokio::test]
    async fn test_shared_is_built_once() {
        let (a, b) = tokio::join!(Highlighter::shared(), Highlighter::shared());
        let a = a.unwrap();
        let b = b.unwrap();
        assert!(std::ptr::eq(a, b));
        let c = Highlighter::shared().await.unwrap();
        assert!(std::ptr::eq(a, c));
    }
}
