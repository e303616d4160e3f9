//! Markdown tree to HTML tree conversion
//!
//! Pure shape mapping from [`MdNode`] to [`hast::Node`]. Nothing here decides
//! what is safe; that is the sanitizer's job.

use super::hast::{self, Element, Node, PropertyValue};
use super::parser::{Align, MdNode};

/// Convert a markdown tree into an HTML tree
pub fn to_hast(node: &MdNode) -> Node {
    match node {
        MdNode::Root(children) => Node::Root(wrap(convert_all(children), false)),
        other => {
            let mut nodes = convert(other);
            if nodes.len() == 1 {
                nodes.remove(0)
            } else {
                Node::Root(nodes)
            }
        }
    }
}

fn convert_all(nodes: &[MdNode]) -> Vec<Node> {
    nodes.iter().flat_map(convert).collect()
}

fn element(tag: &str, children: Vec<Node>) -> Node {
    Element::new(tag).with_children(children).into()
}

/// Join block-level nodes with newline text, optionally padding both ends
fn wrap(nodes: Vec<Node>, loose: bool) -> Vec<Node> {
    let mut out = Vec::with_capacity(nodes.len() * 2 + 1);
    if loose {
        out.push(Node::text("\n"));
    }
    for (i, node) in nodes.into_iter().enumerate() {
        if i > 0 {
            out.push(Node::text("\n"));
        }
        out.push(node);
    }
    if loose && out.len() > 1 {
        out.push(Node::text("\n"));
    }
    out
}

fn is_block(node: &MdNode) -> bool {
    matches!(
        node,
        MdNode::Paragraph(_)
            | MdNode::Heading { .. }
            | MdNode::Code { .. }
            | MdNode::List { .. }
            | MdNode::Blockquote(_)
            | MdNode::Table { .. }
            | MdNode::ThematicBreak
    )
}

fn convert(node: &MdNode) -> Vec<Node> {
    let converted = match node {
        MdNode::Root(children) => Node::Root(wrap(convert_all(children), false)),
        MdNode::Heading { depth, children } => {
            let depth = (*depth).clamp(1, 6);
            element(&format!("h{}", depth), convert_all(children))
        }
        MdNode::Paragraph(children) => element("p", convert_all(children)),
        MdNode::Text(value) => Node::text(value.clone()),
        MdNode::Emphasis(children) => element("em", convert_all(children)),
        MdNode::Strong(children) => element("strong", convert_all(children)),
        MdNode::Delete(children) => element("del", convert_all(children)),
        MdNode::InlineCode(value) => element("code", vec![Node::text(value.clone())]),
        MdNode::Code { lang, meta, value } => convert_code(lang.as_deref(), meta.as_deref(), value),
        MdNode::Link { url, title, children } => {
            let mut a = Element::new("a").with_property("href", url.as_str());
            if let Some(title) = title {
                a = a.with_property("title", title.as_str());
            }
            a.with_children(convert_all(children)).into()
        }
        MdNode::Image { url, alt, title } => {
            let mut img = Element::new("img")
                .with_property("src", url.as_str())
                .with_property("alt", alt.as_str());
            if let Some(title) = title {
                img = img.with_property("title", title.as_str());
            }
            img.into()
        }
        MdNode::List {
            ordered,
            start,
            children,
        } => convert_list(*ordered, *start, children),
        MdNode::ListItem { checked, children } => convert_list_item(*checked, children),
        MdNode::Table { align, children } => convert_table(align, children),
        // Rows and cells only make sense inside a table; keep their content
        MdNode::TableRow(children) | MdNode::TableCell(children) => {
            return convert_all(children);
        }
        MdNode::Blockquote(children) => element("blockquote", wrap(convert_all(children), true)),
        MdNode::ThematicBreak => Element::new("hr").into(),
        MdNode::Break => return vec![Element::new("br").into(), Node::text("\n")],
    };
    vec![converted]
}

fn convert_code(lang: Option<&str>, meta: Option<&str>, value: &str) -> Node {
    let mut code = Element::new("code");
    if let Some(lang) = lang {
        code = code.with_property(
            "class",
            PropertyValue::List(vec![format!("language-{}", lang)]),
        );
    }
    if let Some(meta) = meta {
        code = code.with_property("data-meta", meta);
    }

    let text = if value.is_empty() {
        String::new()
    } else {
        format!("{}\n", value)
    };
    let code = code.with_children(vec![Node::text(text)]);
    element("pre", vec![code.into()])
}

fn convert_list(ordered: bool, start: Option<u64>, items: &[MdNode]) -> Node {
    let mut list = Element::new(if ordered { "ol" } else { "ul" });
    if ordered {
        if let Some(start) = start.filter(|s| *s != 1) {
            list = list.with_property("start", start);
        }
    }
    let has_tasks = items
        .iter()
        .any(|item| matches!(item, MdNode::ListItem { checked: Some(_), .. }));
    if has_tasks {
        list = list.with_property(
            "class",
            PropertyValue::List(vec!["contains-task-list".to_string()]),
        );
    }
    list.with_children(wrap(convert_all(items), true)).into()
}

fn convert_list_item(checked: Option<bool>, children: &[MdNode]) -> Node {
    let mut li = Element::new("li");
    if let Some(checked) = checked {
        li = li
            .with_property(
                "class",
                PropertyValue::List(vec!["task-list-item".to_string()]),
            )
            .with_property("data-checked", if checked { "true" } else { "false" });
    }

    let mut out = Vec::new();
    let mut prev: Option<&MdNode> = None;
    for child in children {
        let boundary = match prev {
            None => is_block(child),
            Some(p) => is_block(p) || is_block(child),
        };
        if boundary {
            out.push(Node::text("\n"));
        }
        out.extend(convert(child));
        prev = Some(child);
    }
    if prev.map(is_block).unwrap_or(false) {
        out.push(Node::text("\n"));
    }

    li.with_children(out).into()
}

fn convert_table(align: &[Option<Align>], rows: &[MdNode]) -> Node {
    let mut sections = Vec::new();

    if let Some((head, body)) = rows.split_first() {
        let head_row = convert_row(head, align, "th");
        sections.push(element("thead", wrap(vec![head_row], true)));

        if !body.is_empty() {
            let body_rows = body.iter().map(|row| convert_row(row, align, "td")).collect();
            sections.push(element("tbody", wrap(body_rows, true)));
        }
    }

    element("table", wrap(sections, true))
}

fn convert_row(row: &MdNode, align: &[Option<Align>], cell_tag: &str) -> Node {
    let cells = match row {
        MdNode::TableRow(cells) => cells.as_slice(),
        _ => &[],
    };

    let converted = cells
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let mut el = Element::new(cell_tag);
            if let Some(Some(a)) = align.get(i) {
                el = el.with_property("align", a.as_str());
            }
            let content = match cell {
                MdNode::TableCell(children) => convert_all(children),
                other => convert(other),
            };
            el.with_children(content).into()
        })
        .collect();

    element("tr", wrap(converted, true))
}

/// Convert and serialize without any further processing
pub fn to_html_unprocessed(node: &MdNode) -> String {
    hast::to_html(&to_hast(node))
}
