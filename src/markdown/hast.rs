//! Generic HTML syntax tree
//!
//! The tree produced by AST conversion, annotated by the highlighter and the
//! link annotator, and finally filtered by the sanitizer. Property names are
//! plain HTML attribute names (`class`, `data-line`, `href`).

use crate::utils::text::escape_html;
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Element properties keyed by attribute name
pub type Properties = BTreeMap<String, PropertyValue>;

/// A single property value
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    String(String),
    /// Space-separated token list, e.g. `class` or `rel`
    List(Vec<String>),
    /// `true` renders as a bare attribute, `false` omits it
    Bool(bool),
    Number(f64),
}

impl PropertyValue {
    /// The value as it would appear in serialized HTML.
    /// Returns `None` for `Bool(false)`.
    pub fn to_attr_string(&self) -> Option<String> {
        match self {
            PropertyValue::String(s) => Some(s.clone()),
            PropertyValue::List(items) => Some(items.join(" ")),
            PropertyValue::Bool(true) => Some(String::new()),
            PropertyValue::Bool(false) => None,
            PropertyValue::Number(n) => Some(format_number(*n)),
        }
    }

    /// Borrow the value if it is a plain string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<u64> for PropertyValue {
    fn from(value: u64) -> Self {
        PropertyValue::Number(value as f64)
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// An HTML element
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag_name: String,
    pub properties: Properties,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            properties: Properties::new(),
            children: Vec::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(value) => out.push_str(value),
            Node::Element(el) => collect_text(&el.children, out),
            Node::Root(children) => collect_text(children, out),
            Node::Comment(_) | Node::Doctype => {}
        }
    }
}

/// A node in the HTML tree
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Root(Vec<Node>),
    Element(Element),
    Text(String),
    Comment(String),
    Doctype,
}

impl Node {
    pub fn text(value: impl Into<String>) -> Self {
        Node::Text(value.into())
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Root(children) => children,
            Node::Element(el) => &el.children,
            _ => &[],
        }
    }

    /// Depth-first visit of every element, parents before children
    pub fn walk_elements_mut<F: FnMut(&mut Element)>(&mut self, f: &mut F) {
        match self {
            Node::Root(children) => {
                for child in children {
                    child.walk_elements_mut(f);
                }
            }
            Node::Element(el) => {
                f(el);
                for child in &mut el.children {
                    child.walk_elements_mut(f);
                }
            }
            _ => {}
        }
    }

    /// Depth-first search for elements with the given tag
    pub fn find_all<'a>(&'a self, tag_name: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        find_into(self, tag_name, &mut found);
        found
    }
}

fn find_into<'a>(node: &'a Node, tag_name: &str, found: &mut Vec<&'a Element>) {
    if let Node::Element(el) = node {
        if el.tag_name == tag_name {
            found.push(el);
        }
    }
    for child in node.children() {
        find_into(child, tag_name, found);
    }
}

impl From<Element> for Node {
    fn from(el: Element) -> Self {
        Node::Element(el)
    }
}

/// Elements that never have children or a closing tag
pub fn is_void_element(tag_name: &str) -> bool {
    matches!(
        tag_name,
        "area" | "base" | "br" | "col" | "embed" | "hr" | "img" | "input" | "link" | "meta"
            | "source" | "track" | "wbr"
    )
}

/// Serialize a tree to an HTML string
pub fn to_html(node: &Node) -> String {
    let mut out = String::new();
    write_node(node, &mut out);
    out
}

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Root(children) => {
            for child in children {
                write_node(child, out);
            }
        }
        Node::Text(value) => out.push_str(&escape_html(value)),
        Node::Comment(value) => {
            let _ = write!(out, "<!--{}-->", value.replace("--", "- -"));
        }
        Node::Doctype => out.push_str("<!doctype html>"),
        Node::Element(el) => {
            out.push('<');
            out.push_str(&el.tag_name);
            write_properties(&el.properties, out);
            out.push('>');
            if is_void_element(&el.tag_name) {
                return;
            }
            for child in &el.children {
                write_node(child, out);
            }
            let _ = write!(out, "</{}>", el.tag_name);
        }
    }
}

/// Write ` name="value"` pairs for every property that renders
pub(crate) fn write_properties(properties: &Properties, out: &mut String) {
    for (name, value) in properties {
        match value {
            PropertyValue::Bool(true) => {
                out.push(' ');
                out.push_str(name);
            }
            other => {
                if let Some(v) = other.to_attr_string() {
                    let _ = write!(out, " {}=\"{}\"", name, escape_html(&v));
                }
            }
        }
    }
}
