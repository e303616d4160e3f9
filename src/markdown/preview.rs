//! Rendering sanitized trees into UI elements
//!
//! This is the last step of the prose path. Internal anchors become
//! client-side navigation links, external anchors stay plain anchors with
//! their `rel`/`target`, and everything else (including `pre` with its
//! highlighter attributes) passes through unchanged.

use super::hast::{is_void_element, Node};
use super::links::SiteOrigin;
use crate::utils::text::escape_html;
use std::fmt::Write as _;

/// A node in the rendered UI tree
#[derive(Debug, Clone, PartialEq)]
pub enum UiElement {
    /// Sibling elements without a wrapper
    Fragment(Vec<UiElement>),
    /// A plain HTML element
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
        children: Vec<UiElement>,
    },
    /// A link handled by client-side navigation
    NavLink {
        href: String,
        title: Option<String>,
        children: Vec<UiElement>,
    },
    Text(String),
    /// Accessible placeholder shown when rendering failed
    Alert { message: String },
}

impl UiElement {
    pub fn alert(message: impl Into<String>) -> Self {
        UiElement::Alert {
            message: message.into(),
        }
    }

    pub fn is_alert(&self) -> bool {
        matches!(self, UiElement::Alert { .. })
    }

    /// Every navigation link in the tree, in document order
    pub fn nav_links(&self) -> Vec<&str> {
        let mut links = Vec::new();
        self.collect_nav_links(&mut links);
        links
    }

    fn collect_nav_links<'a>(&'a self, links: &mut Vec<&'a str>) {
        match self {
            UiElement::NavLink { href, children, .. } => {
                links.push(href);
                for child in children {
                    child.collect_nav_links(links);
                }
            }
            UiElement::Fragment(children) | UiElement::Element { children, .. } => {
                for child in children {
                    child.collect_nav_links(links);
                }
            }
            UiElement::Text(_) | UiElement::Alert { .. } => {}
        }
    }

    /// Serialize for server-side output
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        match self {
            UiElement::Fragment(children) => {
                for child in children {
                    child.write_html(out);
                }
            }
            UiElement::Text(text) => out.push_str(&escape_html(text)),
            UiElement::Element {
                tag,
                attributes,
                children,
            } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attributes {
                    let _ = write!(out, " {}=\"{}\"", name, escape_html(value));
                }
                out.push('>');
                if is_void_element(tag) {
                    return;
                }
                for child in children {
                    child.write_html(out);
                }
                let _ = write!(out, "</{}>", tag);
            }
            UiElement::NavLink {
                href,
                title,
                children,
            } => {
                let _ = write!(out, "<a href=\"{}\" data-nav-link=\"\"", escape_html(href));
                if let Some(title) = title {
                    let _ = write!(out, " title=\"{}\"", escape_html(title));
                }
                out.push('>');
                for child in children {
                    child.write_html(out);
                }
                out.push_str("</a>");
            }
            UiElement::Alert { message } => {
                let _ = write!(
                    out,
                    "<div role=\"alert\" class=\"markdown-error\"><p>{}</p></div>",
                    escape_html(message)
                );
            }
        }
    }
}

/// Convert a sanitized tree into UI elements
pub fn render_to_ui(node: &Node, site: &SiteOrigin) -> UiElement {
    match node {
        Node::Root(children) => UiElement::Fragment(render_children(children, site)),
        Node::Text(value) => UiElement::Text(value.clone()),
        Node::Comment(_) | Node::Doctype => UiElement::Fragment(Vec::new()),
        Node::Element(el) => {
            let children = render_children(&el.children, site);

            if el.tag_name == "a" {
                let href = el.property("href").and_then(|v| v.as_str());
                if let Some(href) = href.filter(|h| site.is_internal(h)) {
                    return UiElement::NavLink {
                        href: href.to_string(),
                        title: el
                            .property("title")
                            .and_then(|v| v.to_attr_string()),
                        children,
                    };
                }
            }

            let attributes = el
                .properties
                .iter()
                .filter_map(|(name, value)| value.to_attr_string().map(|v| (name.clone(), v)))
                .collect();
            UiElement::Element {
                tag: el.tag_name.clone(),
                attributes,
                children,
            }
        }
    }
}

fn render_children(children: &[Node], site: &SiteOrigin) -> Vec<UiElement> {
    children.iter().map(|child| render_to_ui(child, site)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::hast::{Element, PropertyValue};

    fn site() -> SiteOrigin {
        SiteOrigin::parse("https://example.com").unwrap()
    }

    #[test]
    fn test_internal_links_become_nav_links() {
        let tree = Node::Root(vec![
            Element::new("a")
                .with_property("href", "/about")
                .with_children(vec![Node::text("About")])
                .into(),
            Element::new("a")
                .with_property("href", "https://example.com/essays")
                .into(),
        ]);
        let ui = render_to_ui(&tree, &site());
        assert_eq!(ui.nav_links(), vec!["/about", "https://example.com/essays"]);
        assert_eq!(
            ui.to_html(),
            "<a href=\"/about\" data-nav-link=\"\">About</a><a href=\"https://example.com/essays\" data-nav-link=\"\"></a>"
        );
    }

    #[test]
    fn test_backslash_host_is_not_a_nav_link() {
        let tree: Node = Element::new("a").with_property("href", "/\\evil.com").into();
        let ui = render_to_ui(&tree, &site());
        assert!(ui.nav_links().is_empty());
    }

    #[test]
    fn test_external_links_keep_rel_and_target() {
        let tree: Node = Element::new("a")
            .with_property("href", "https://other.org")
            .with_property(
                "rel",
                PropertyValue::List(vec!["noopener".into(), "noreferrer".into()]),
            )
            .with_property("target", "_blank")
            .into();
        let ui = render_to_ui(&tree, &site());
        assert!(ui.nav_links().is_empty());
        match ui {
            UiElement::Element { tag, attributes, .. } => {
                assert_eq!(tag, "a");
                assert!(attributes.contains(&("rel".to_string(), "noopener noreferrer".to_string())));
                assert!(attributes.contains(&("target".to_string(), "_blank".to_string())));
            }
            other => panic!("expected plain anchor, got {:?}", other),
        }
    }

    #[test]
    fn test_pre_attributes_pass_through() {
        let tree: Node = Element::new("pre")
            .with_property("data-language", "typescript")
            .with_property("data-theme", "contemplative")
            .into();
        let ui = render_to_ui(&tree, &site());
        assert_eq!(
            ui.to_html(),
            "<pre data-language=\"typescript\" data-theme=\"contemplative\"></pre>"
        );
    }

    #[test]
    fn test_alert_markup() {
        let ui = UiElement::alert("Could not <render>");
        assert!(ui.is_alert());
        assert_eq!(
            ui.to_html(),
            "<div role=\"alert\" class=\"markdown-error\"><p>Could not &lt;render&gt;</p></div>"
        );
    }
}
