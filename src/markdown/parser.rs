//! Markdown parsing
//!
//! Turns markdown source into an [`MdNode`] tree using pulldown-cmark with
//! the GFM extensions the site relies on: tables, task lists and
//! strikethrough. Bare URLs and emails are linked afterwards by
//! [`super::autolink`]. Parsing never fails.

use super::autolink;
use pulldown_cmark::{Alignment, CodeBlockKind, Event, HeadingLevel, LinkType, Options, Parser, Tag};

/// Table column alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

impl Align {
    pub fn as_str(&self) -> &'static str {
        match self {
            Align::Left => "left",
            Align::Center => "center",
            Align::Right => "right",
        }
    }
}

/// A node in the markdown syntax tree
#[derive(Debug, Clone, PartialEq)]
pub enum MdNode {
    Root(Vec<MdNode>),
    Heading { depth: u8, children: Vec<MdNode> },
    Paragraph(Vec<MdNode>),
    Text(String),
    Emphasis(Vec<MdNode>),
    Strong(Vec<MdNode>),
    Delete(Vec<MdNode>),
    InlineCode(String),
    Code {
        lang: Option<String>,
        meta: Option<String>,
        value: String,
    },
    Link {
        url: String,
        title: Option<String>,
        children: Vec<MdNode>,
    },
    Image {
        url: String,
        alt: String,
        title: Option<String>,
    },
    List {
        ordered: bool,
        start: Option<u64>,
        children: Vec<MdNode>,
    },
    ListItem {
        /// `Some` for task-list items, `None` for plain items
        checked: Option<bool>,
        children: Vec<MdNode>,
    },
    Table {
        align: Vec<Option<Align>>,
        children: Vec<MdNode>,
    },
    TableRow(Vec<MdNode>),
    TableCell(Vec<MdNode>),
    Blockquote(Vec<MdNode>),
    ThematicBreak,
    Break,
}

impl MdNode {
    /// Child nodes of container variants
    pub fn children(&self) -> Option<&[MdNode]> {
        match self {
            MdNode::Root(c)
            | MdNode::Paragraph(c)
            | MdNode::Emphasis(c)
            | MdNode::Strong(c)
            | MdNode::Delete(c)
            | MdNode::TableRow(c)
            | MdNode::TableCell(c)
            | MdNode::Blockquote(c) => Some(c),
            MdNode::Heading { children, .. }
            | MdNode::Link { children, .. }
            | MdNode::List { children, .. }
            | MdNode::ListItem { children, .. }
            | MdNode::Table { children, .. } => Some(children),
            MdNode::Text(_)
            | MdNode::InlineCode(_)
            | MdNode::Code { .. }
            | MdNode::Image { .. }
            | MdNode::ThematicBreak
            | MdNode::Break => None,
        }
    }

    /// Mutable child nodes of container variants
    pub fn children_mut(&mut self) -> Option<&mut Vec<MdNode>> {
        match self {
            MdNode::Root(c)
            | MdNode::Paragraph(c)
            | MdNode::Emphasis(c)
            | MdNode::Strong(c)
            | MdNode::Delete(c)
            | MdNode::TableRow(c)
            | MdNode::TableCell(c)
            | MdNode::Blockquote(c) => Some(c),
            MdNode::Heading { children, .. }
            | MdNode::Link { children, .. }
            | MdNode::List { children, .. }
            | MdNode::ListItem { children, .. }
            | MdNode::Table { children, .. } => Some(children),
            MdNode::Text(_)
            | MdNode::InlineCode(_)
            | MdNode::Code { .. }
            | MdNode::Image { .. }
            | MdNode::ThematicBreak
            | MdNode::Break => None,
        }
    }

    /// Concatenated plain text, used for image alt text
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.push_plain_text(&mut out);
        out
    }

    fn push_plain_text(&self, out: &mut String) {
        match self {
            MdNode::Text(t) | MdNode::InlineCode(t) => out.push_str(t),
            MdNode::Code { value, .. } => out.push_str(value),
            MdNode::Image { alt, .. } => out.push_str(alt),
            MdNode::Break => out.push('\n'),
            other => {
                if let Some(children) = other.children() {
                    for child in children {
                        child.push_plain_text(out);
                    }
                }
            }
        }
    }
}

/// A node under construction
#[derive(Debug)]
enum Pending {
    Root,
    Heading(u8),
    Paragraph,
    Blockquote,
    Emphasis,
    Strong,
    Delete,
    Code { lang: Option<String>, meta: Option<String> },
    Link { url: String, title: Option<String> },
    Image { url: String, title: Option<String> },
    List { ordered: bool, start: Option<u64> },
    ListItem { checked: Option<bool> },
    Table(Vec<Option<Align>>),
    TableHead,
    TableRow,
    TableCell,
    /// Containers we do not model; children are spliced into the parent
    Transparent,
}

#[derive(Debug)]
struct Frame {
    pending: Pending,
    children: Vec<MdNode>,
}

impl Frame {
    fn new(pending: Pending) -> Self {
        Self {
            pending,
            children: Vec::new(),
        }
    }

    /// Append text, merging with a preceding text node
    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(MdNode::Text(last)) = self.children.last_mut() {
            last.push_str(text);
        } else {
            self.children.push(MdNode::Text(text.to_string()));
        }
    }

    fn push(&mut self, node: MdNode) {
        match node {
            MdNode::Text(t) => self.push_text(&t),
            other => self.children.push(other),
        }
    }

    fn finish(self) -> Vec<MdNode> {
        let children = self.children;
        let node = match self.pending {
            Pending::Root => MdNode::Root(children),
            Pending::Heading(depth) => MdNode::Heading { depth, children },
            Pending::Paragraph => MdNode::Paragraph(children),
            Pending::Blockquote => MdNode::Blockquote(children),
            Pending::Emphasis => MdNode::Emphasis(children),
            Pending::Strong => MdNode::Strong(children),
            Pending::Delete => MdNode::Delete(children),
            Pending::Code { lang, meta } => {
                let mut value: String = children.iter().map(MdNode::plain_text).collect();
                if value.ends_with('\n') {
                    value.pop();
                }
                MdNode::Code { lang, meta, value }
            }
            Pending::Link { url, title } => MdNode::Link { url, title, children },
            Pending::Image { url, title } => {
                let alt = children.iter().map(MdNode::plain_text).collect();
                MdNode::Image { url, alt, title }
            }
            Pending::List { ordered, start } => MdNode::List {
                ordered,
                start,
                children,
            },
            Pending::ListItem { checked } => MdNode::ListItem { checked, children },
            Pending::Table(align) => MdNode::Table { align, children },
            Pending::TableHead | Pending::TableRow => MdNode::TableRow(children),
            Pending::TableCell => MdNode::TableCell(children),
            Pending::Transparent => return children,
        };
        vec![node]
    }
}

/// Markdown parser with the site's extension set
pub struct MarkdownParser {
    options: Options,
}

impl MarkdownParser {
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);

        Self { options }
    }

    /// Parse markdown into a tree rooted at [`MdNode::Root`]
    pub fn parse(&self, source: &str) -> MdNode {
        let parser = Parser::new_ext(source, self.options);
        let mut stack = vec![Frame::new(Pending::Root)];

        for event in parser {
            match event {
                Event::Start(tag) => stack.push(Frame::new(pending_for(tag))),
                Event::End(_) => {
                    // The root frame is never closed by an event
                    if stack.len() > 1 {
                        if let Some(frame) = stack.pop() {
                            let nodes = frame.finish();
                            if let Some(parent) = stack.last_mut() {
                                for node in nodes {
                                    parent.push(node);
                                }
                            }
                        }
                    }
                }
                Event::Text(text) => top(&mut stack).push_text(&text),
                Event::Code(code) => top(&mut stack).push(MdNode::InlineCode(code.to_string())),
                Event::SoftBreak => top(&mut stack).push_text("\n"),
                Event::HardBreak => top(&mut stack).push(MdNode::Break),
                Event::Rule => top(&mut stack).push(MdNode::ThematicBreak),
                // Raw HTML never reaches the output tree
                Event::Html(_) => {}
                Event::FootnoteReference(label) => {
                    top(&mut stack).push_text(&format!("[^{}]", label));
                }
                Event::TaskListMarker(checked) => {
                    if let Some(frame) = stack
                        .iter_mut()
                        .rev()
                        .find(|f| matches!(f.pending, Pending::ListItem { .. }))
                    {
                        frame.pending = Pending::ListItem {
                            checked: Some(checked),
                        };
                    }
                }
            }
        }

        // Unbalanced input cannot happen with pulldown-cmark, but fold any
        // open frames so the result is always a single root
        while stack.len() > 1 {
            if let Some(frame) = stack.pop() {
                let nodes = frame.finish();
                if let Some(parent) = stack.last_mut() {
                    for node in nodes {
                        parent.push(node);
                    }
                }
            }
        }

        let mut root = stack
            .pop()
            .map(|frame| MdNode::Root(frame.children))
            .unwrap_or_else(|| MdNode::Root(Vec::new()));
        autolink::linkify_tree(&mut root);
        root
    }
}

impl Default for MarkdownParser {
    fn default() -> Self {
        Self::new()
    }
}

fn top(stack: &mut Vec<Frame>) -> &mut Frame {
    if stack.is_empty() {
        stack.push(Frame::new(Pending::Root));
    }
    let last = stack.len() - 1;
    &mut stack[last]
}

fn pending_for(tag: Tag<'_>) -> Pending {
    match tag {
        Tag::Paragraph => Pending::Paragraph,
        Tag::Heading(level, _id, _classes) => Pending::Heading(heading_depth(level)),
        Tag::BlockQuote => Pending::Blockquote,
        Tag::CodeBlock(kind) => {
            let (lang, meta) = match kind {
                CodeBlockKind::Fenced(info) => split_fence_info(&info),
                CodeBlockKind::Indented => (None, None),
            };
            Pending::Code { lang, meta }
        }
        Tag::List(start) => Pending::List {
            ordered: start.is_some(),
            start,
        },
        Tag::Item => Pending::ListItem { checked: None },
        Tag::Table(alignments) => Pending::Table(alignments.iter().map(convert_alignment).collect()),
        Tag::TableHead => Pending::TableHead,
        Tag::TableRow => Pending::TableRow,
        Tag::TableCell => Pending::TableCell,
        Tag::Emphasis => Pending::Emphasis,
        Tag::Strong => Pending::Strong,
        Tag::Strikethrough => Pending::Delete,
        Tag::Link(link_type, dest_url, title) => {
            let url = match link_type {
                LinkType::Email if !dest_url.starts_with("mailto:") => {
                    format!("mailto:{}", dest_url)
                }
                _ => dest_url.to_string(),
            };
            Pending::Link {
                url,
                title: non_empty(&title),
            }
        }
        Tag::Image(_link_type, dest_url, title) => Pending::Image {
            url: dest_url.to_string(),
            title: non_empty(&title),
        },
        Tag::FootnoteDefinition(_) => Pending::Transparent,
    }
}

fn heading_depth(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn convert_alignment(alignment: &Alignment) -> Option<Align> {
    match alignment {
        Alignment::None => None,
        Alignment::Left => Some(Align::Left),
        Alignment::Center => Some(Align::Center),
        Alignment::Right => Some(Align::Right),
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Split a fence info string into language and meta.
///
/// The language is the first word, cut short at `{` so that
/// `ts{1,3}` still yields `ts`. Everything after it is meta.
pub fn split_fence_info(info: &str) -> (Option<String>, Option<String>) {
    let info = info.trim();
    if info.is_empty() {
        return (None, None);
    }

    let word_end = info.find(char::is_whitespace).unwrap_or(info.len());
    let lang_end = info[..word_end].find('{').unwrap_or(word_end);
    let lang = non_empty(&info[..lang_end]);
    let meta = non_empty(info[lang_end..].trim());
    (lang, meta)
}

/// Parse markdown with the default extension set
pub fn parse(source: &str) -> MdNode {
    MarkdownParser::new().parse(source)
}
