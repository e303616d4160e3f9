//! Allow-list sanitizer for HTML trees
//!
//! Filtering is driven entirely by a [`Schema`]: tags, attributes and URL
//! schemes that the schema does not name are removed. The default schema is
//! built once and describes exactly what the rendering pipeline emits.
//!
//! - Comments and doctypes are always dropped.
//! - Tags in [`Schema::strip`] are dropped together with their content.
//! - Other disallowed tags, and allowed tags outside their required
//!   ancestors, are unwrapped: the element goes, its sanitized children stay.

use super::hast::{Element, Node, Properties, PropertyValue};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

/// How an attribute name is matched for a tag
#[derive(Debug, Clone)]
pub enum AttributeRule {
    /// Exact attribute name
    Name(String),
    /// Any attribute starting with the prefix, e.g. `data-`
    Prefix(String),
    /// Exact name whose string value must match the pattern
    Pattern { name: String, pattern: Regex },
}

impl AttributeRule {
    fn matches(&self, name: &str, value: &PropertyValue) -> bool {
        match self {
            AttributeRule::Name(n) => n == name,
            AttributeRule::Prefix(prefix) => {
                name.len() > prefix.len() && name.starts_with(prefix.as_str())
            }
            AttributeRule::Pattern { name: n, pattern } => {
                n == name
                    && value
                        .to_attr_string()
                        .map(|v| pattern.is_match(&v))
                        .unwrap_or(false)
            }
        }
    }
}

/// Declarative sanitizer configuration
#[derive(Debug, Clone)]
pub struct Schema {
    /// Elements that may appear in the output
    pub tag_names: HashSet<String>,
    /// Attribute rules per tag; `*` applies to every tag
    pub attributes: HashMap<String, Vec<AttributeRule>>,
    /// Allowed schemes per URL attribute. Relative URLs always pass.
    pub protocols: HashMap<String, Vec<String>>,
    /// Elements dropped together with everything inside them
    pub strip: HashSet<String>,
    /// Elements only valid below one of the listed ancestors
    pub ancestors: HashMap<String, Vec<String>>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn names(items: &[&str]) -> Vec<AttributeRule> {
    items.iter().map(|s| AttributeRule::Name(s.to_string())).collect()
}

/// Inline styles the highlighter produces and nothing else
fn token_style_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?:color:var\(--[a-z0-9-]+\)|font-style:italic|font-weight:bold)(?:;(?:color:var\(--[a-z0-9-]+\)|font-style:italic|font-weight:bold))*$",
        )
        .expect("valid regex")
    })
}

fn attribute_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z][a-z0-9\-_.]*$").expect("valid regex"))
}

/// Whitespace and control characters browsers ignore inside URL schemes
fn uri_whitespace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[\u{0000}-\u{0020}\u{007F}-\u{009F}\u{00A0}\u{1680}\u{180E}\u{2000}-\u{2029}\u{205F}\u{3000}\u{FEFF}]")
            .expect("valid regex")
    })
}

impl Schema {
    /// The schema for rendered site content
    pub fn site_default() -> Self {
        let tag_names = [
            "p", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "li", "blockquote", "pre", "code",
            "em", "strong", "a", "br", "hr", "table", "thead", "tbody", "tr", "th", "td", "del",
            "span", "figure", "figcaption", "img",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let mut attributes: HashMap<String, Vec<AttributeRule>> = HashMap::new();
        attributes.insert("a".into(), names(&["href", "title", "rel", "target"]));
        attributes.insert("img".into(), names(&["src", "alt", "title"]));
        for tag in ["code", "pre", "span", "figure", "figcaption"] {
            attributes.insert(
                tag.into(),
                vec![
                    AttributeRule::Name("class".into()),
                    AttributeRule::Prefix("data-".into()),
                ],
            );
        }
        if let Some(span) = attributes.get_mut("span") {
            span.push(AttributeRule::Pattern {
                name: "style".into(),
                pattern: token_style_regex().clone(),
            });
        }
        attributes.insert("th".into(), names(&["align"]));
        attributes.insert("td".into(), names(&["align"]));
        attributes.insert("ol".into(), names(&["start", "class"]));
        attributes.insert("ul".into(), names(&["class"]));
        attributes.insert("li".into(), names(&["class", "data-checked"]));

        let mut protocols = HashMap::new();
        protocols.insert("href".into(), strings(&["http", "https", "mailto"]));

        let strip = ["script", "iframe", "object", "embed", "form", "input", "style"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let mut ancestors = HashMap::new();
        ancestors.insert("li".into(), strings(&["ol", "ul"]));
        ancestors.insert("th".into(), strings(&["tr"]));
        ancestors.insert("td".into(), strings(&["tr"]));
        ancestors.insert("tr".into(), strings(&["table"]));
        ancestors.insert("thead".into(), strings(&["table"]));
        ancestors.insert("tbody".into(), strings(&["table"]));

        Self {
            tag_names,
            attributes,
            protocols,
            strip,
            ancestors,
        }
    }

    fn allows_attribute(&self, tag: &str, name: &str, value: &PropertyValue) -> bool {
        if !attribute_name_regex().is_match(name) {
            return false;
        }
        let matched = [tag, "*"]
            .iter()
            .filter_map(|key| self.attributes.get(*key))
            .flatten()
            .any(|rule| rule.matches(name, value));
        if !matched {
            return false;
        }

        match self.protocols.get(name) {
            Some(allowed) => match value {
                PropertyValue::String(url) => has_allowed_protocol(url, allowed),
                PropertyValue::List(urls) => urls.iter().all(|u| has_allowed_protocol(u, allowed)),
                _ => false,
            },
            None => true,
        }
    }

    fn ancestors_satisfied(&self, tag: &str, stack: &[String]) -> bool {
        match self.ancestors.get(tag) {
            Some(required) => stack.iter().any(|open| required.contains(open)),
            None => true,
        }
    }
}

/// The shared default schema
pub fn default_schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(Schema::site_default)
}

/// Decode the entity forms that hide a scheme separator or whitespace
fn decode_attr_html_entities(input: &str) -> String {
    fn colon_entity_regex() -> &'static Regex {
        static RE: OnceLock<Regex> = OnceLock::new();
        RE.get_or_init(|| Regex::new(r"(?i)&colon;?").expect("valid regex"))
    }

    fn newline_entity_regex() -> &'static Regex {
        static RE: OnceLock<Regex> = OnceLock::new();
        RE.get_or_init(|| Regex::new(r"(?i)&newline;?").expect("valid regex"))
    }

    fn tab_entity_regex() -> &'static Regex {
        static RE: OnceLock<Regex> = OnceLock::new();
        RE.get_or_init(|| Regex::new(r"(?i)&tab;?").expect("valid regex"))
    }

    // Numeric references may omit the trailing semicolon
    fn numeric_entity_regex() -> &'static Regex {
        static RE: OnceLock<Regex> = OnceLock::new();
        RE.get_or_init(|| Regex::new(r"(?i)&#(?:x([0-9a-f]{1,6})|([0-9]{1,7}));?").expect("valid regex"))
    }

    let numeric = numeric_entity_regex().replace_all(input, |caps: &regex::Captures<'_>| {
        let code = match (caps.get(1), caps.get(2)) {
            (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
            (None, Some(dec)) => dec.as_str().parse().ok(),
            _ => None,
        };
        code.and_then(char::from_u32)
            .unwrap_or(char::REPLACEMENT_CHARACTER)
            .to_string()
    });

    let unescaped = htmlize::unescape(numeric.as_ref()).into_owned();
    let mut out = colon_entity_regex().replace_all(&unescaped, ":").into_owned();
    out = newline_entity_regex().replace_all(&out, "\n").into_owned();
    out = tab_entity_regex().replace_all(&out, "\t").into_owned();
    out
}

/// Whether the scheme (if any) of a URL is in the allowed list
fn scheme_allowed(url: &str, allowed: &[String]) -> bool {
    let Some(colon) = url.find(':') else {
        return true;
    };
    let scheme = &url[..colon];
    // A path, query or fragment before the colon means there is no scheme
    if scheme.contains(['/', '?', '#']) {
        return true;
    }
    allowed.iter().any(|p| scheme.eq_ignore_ascii_case(p))
}

/// Check both the raw and the entity-decoded value, ignoring whitespace and
/// control characters a browser would skip
pub fn has_allowed_protocol(url: &str, allowed: &[String]) -> bool {
    [url.to_string(), decode_attr_html_entities(url)]
        .iter()
        .all(|candidate| {
            let cleaned = uri_whitespace_regex().replace_all(candidate, "");
            scheme_allowed(&cleaned, allowed)
        })
}

/// Sanitize a tree against a schema. The result is always a root node.
pub fn sanitize(node: &Node, schema: &Schema) -> Node {
    let mut stack = Vec::new();
    let mut out = Vec::new();
    sanitize_into(node, schema, &mut stack, &mut out);
    Node::Root(out)
}

fn sanitize_into(node: &Node, schema: &Schema, stack: &mut Vec<String>, out: &mut Vec<Node>) {
    match node {
        Node::Root(children) => {
            for child in children {
                sanitize_into(child, schema, stack, out);
            }
        }
        Node::Text(value) => out.push(Node::Text(value.clone())),
        Node::Comment(_) | Node::Doctype => {}
        Node::Element(el) => {
            let tag = el.tag_name.to_ascii_lowercase();
            if schema.strip.contains(&tag) {
                return;
            }

            let allowed = schema.tag_names.contains(&tag) && schema.ancestors_satisfied(&tag, stack);
            if !allowed {
                for child in &el.children {
                    sanitize_into(child, schema, stack, out);
                }
                return;
            }

            let properties = sanitize_properties(&tag, &el.properties, schema);
            stack.push(tag.clone());
            let mut children = Vec::with_capacity(el.children.len());
            for child in &el.children {
                sanitize_into(child, schema, stack, &mut children);
            }
            stack.pop();

            out.push(Node::Element(Element {
                tag_name: tag,
                properties,
                children,
            }));
        }
    }
}

fn sanitize_properties(tag: &str, properties: &Properties, schema: &Schema) -> Properties {
    properties
        .iter()
        .filter_map(|(name, value)| {
            let name = name.to_ascii_lowercase();
            schema
                .allows_attribute(tag, &name, value)
                .then(|| (name, value.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::hast::to_html;

    fn clean(node: Node) -> Node {
        sanitize(&node, default_schema())
    }

    fn link(href: &str) -> Node {
        Element::new("a")
            .with_property("href", href)
            .with_children(vec![Node::text("x")])
            .into()
    }

    fn href_of(tree: &Node) -> Option<String> {
        tree.find_all("a")
            .first()
            .and_then(|a| a.property("href"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }

    #[test]
    fn test_strip_tags_removed_with_content() {
        for tag in ["script", "iframe", "object", "embed", "form", "input", "style"] {
            let tree = clean(Node::Root(vec![Element::new("p")
                .with_children(vec![
                    Node::text("ok"),
                    Element::new(tag).with_children(vec![Node::text("bad")]).into(),
                ])
                .into()]));
            let html = to_html(&tree);
            assert_eq!(html, "<p>ok</p>", "tag {}", tag);
        }
    }

    #[test]
    fn test_svg_nested_script() {
        let tree = clean(Node::Root(vec![Element::new("div")
            .with_children(vec![Element::new("svg")
                .with_property("onload", "alert(1)")
                .with_children(vec![
                    Element::new("SCRIPT").with_children(vec![Node::text("alert(1)")]).into(),
                    Element::new("text").with_children(vec![Node::text("label")]).into(),
                ])
                .into()])
            .into()]));
        assert_eq!(to_html(&tree), "label");
        assert!(tree.find_all("script").is_empty());
        assert!(tree.find_all("svg").is_empty());
    }

    #[test]
    fn test_event_handlers_and_unknown_attributes_removed() {
        let tree = clean(
            Element::new("img")
                .with_property("src", "/a.png")
                .with_property("onerror", "alert(1)")
                .with_property("alt", "a")
                .into(),
        );
        assert_eq!(to_html(&tree), "<img alt=\"a\" src=\"/a.png\">");
    }

    #[test]
    fn test_dangerous_schemes_removed() {
        let vectors = [
            "javascript:alert(1)",
            "JaVaScRiPt:alert(1)",
            "  javascript:alert(1)",
            "java\tscript:alert(1)",
            "java\nscript:alert(1)",
            "&#106;avascript:alert(1)",
            "&#x6A;avascript:alert(1)",
            "&#x6a&#x61&#x76&#x61&#x73&#x63&#x72&#x69&#x70&#x74&#x3a;alert(1)",
            "javascript&colon;alert(1)",
            "javascript&#58;alert(1)",
            "jav&#x09;ascript:alert(1)",
            "vbscript:msgbox(1)",
            "VBScript:msgbox(1)",
            "data:text/html;base64,PHNjcmlwdD5hbGVydCgxKTwvc2NyaXB0Pg==",
            "DATA:text/html,<script>alert(1)</script>",
        ];
        for vector in vectors {
            let tree = clean(link(vector));
            assert_eq!(href_of(&tree), None, "href kept for {:?}", vector);
            // The anchor itself survives
            assert_eq!(tree.find_all("a").len(), 1);
        }
    }

    #[test]
    fn test_safe_schemes_kept() {
        for href in [
            "https://example.com",
            "http://example.com",
            "mailto:me@example.com",
            "/about",
            "#top",
            "notes/today",
            "?q=a:b",
            "/path:with:colons",
        ] {
            assert_eq!(href_of(&clean(link(href))).as_deref(), Some(href));
        }
    }

    #[test]
    fn test_img_src_not_scheme_restricted() {
        let tree = clean(
            Element::new("img")
                .with_property("src", "data:image/png;base64,AAAA")
                .into(),
        );
        assert_eq!(tree.find_all("img")[0].property("src").and_then(|v| v.as_str()), Some("data:image/png;base64,AAAA"));
    }

    #[test]
    fn test_ancestor_constraints() {
        let tree = clean(Node::Root(vec![
            Element::new("li").with_children(vec![Node::text("orphan")]).into(),
            Element::new("td").with_children(vec![Node::text("cell")]).into(),
            Element::new("ul")
                .with_children(vec![Element::new("li").with_children(vec![Node::text("ok")]).into()])
                .into(),
        ]));
        assert_eq!(to_html(&tree), "orphancell<ul><li>ok</li></ul>");
    }

    #[test]
    fn test_comments_and_doctype_removed() {
        let tree = clean(Node::Root(vec![
            Node::Doctype,
            Node::Comment("secret".into()),
            Element::new("p").with_children(vec![Node::text("hi")]).into(),
        ]));
        assert_eq!(to_html(&tree), "<p>hi</p>");
    }

    #[test]
    fn test_span_style_restricted_to_theme_values() {
        let good = clean(
            Element::new("span")
                .with_property("style", "color:var(--syntax-keyword);font-style:italic")
                .into(),
        );
        assert!(good.find_all("span")[0].property("style").is_some());

        let bad = clean(
            Element::new("span")
                .with_property("style", "background:url(javascript:alert(1))")
                .into(),
        );
        assert!(bad.find_all("span")[0].property("style").is_none());

        let on_p = clean(
            Element::new("p")
                .with_property("style", "color:var(--syntax-keyword)")
                .into(),
        );
        assert!(on_p.find_all("p")[0].properties.is_empty());
    }

    #[test]
    fn test_malformed_attribute_names_removed() {
        let tree = clean(
            Element::new("code")
                .with_property("data-x\" onclick=\"alert(1)", "y")
                .with_property("data-", "empty")
                .with_property("data-language", "js")
                .into(),
        );
        let code = tree.find_all("code")[0];
        assert_eq!(code.properties.len(), 1);
        assert!(code.property("data-language").is_some());
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let tree = Node::Root(vec![
            Element::new("DIV")
                .with_children(vec![
                    Element::new("h1").with_property("id", "x").with_children(vec![Node::text("T")]).into(),
                    link("javascript:alert(1)"),
                    link("https://example.com"),
                    Element::new("tr").with_children(vec![Node::text("row")]).into(),
                    Node::Comment("c".into()),
                ])
                .into(),
            Element::new("table")
                .with_children(vec![Element::new("tbody")
                    .with_children(vec![Element::new("tr")
                        .with_children(vec![Element::new("td")
                            .with_property("align", "left")
                            .with_property("style", "x")
                            .into()])
                        .into()])
                    .into()])
                .into(),
        ]);
        let once = clean(tree);
        let twice = clean(once.clone());
        assert_eq!(once, twice);
    }
}
