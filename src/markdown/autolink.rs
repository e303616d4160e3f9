//! Bare URL and email autolinking
//!
//! pulldown-cmark only links `<...>` autolinks, so literal `https://...`,
//! `www....` and `name@host.tld` runs in text are found here and turned into
//! link nodes after the tree is built. Text inside links, images and code is
//! never touched.

use super::parser::MdNode;
use std::ops::Range;

/// A link found in a run of text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundLink {
    /// Byte range of the link text in the source string
    pub range: Range<usize>,
    /// Destination URL with its scheme filled in
    pub url: String,
}

/// Find every autolink in a run of plain text. Linear in the input length.
pub fn find_links(text: &str) -> Vec<FoundLink> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let byte_at = |i: usize| chars.get(i).map(|(b, _)| *b).unwrap_or(text.len());
    let mut links = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        if let Some(prefix_len) = url_prefix_len(&chars, pos) {
            if let Some(end) = find_url_end(&chars, pos, prefix_len) {
                let literal = &text[byte_at(pos)..byte_at(end)];
                let url = if prefix_len == 4 {
                    format!("http://{}", literal)
                } else {
                    literal.to_string()
                };
                links.push(FoundLink {
                    range: byte_at(pos)..byte_at(end),
                    url,
                });
                pos = end;
                continue;
            }
        }

        if is_email_start(&chars, pos) {
            match find_email_end(&chars, pos) {
                Some(end) => {
                    let literal = &text[byte_at(pos)..byte_at(end)];
                    links.push(FoundLink {
                        range: byte_at(pos)..byte_at(end),
                        url: format!("mailto:{}", literal),
                    });
                    pos = end;
                    continue;
                }
                None => {
                    // Skip the rest of this word so each run is scanned once
                    while pos < chars.len() && is_email_local_char(chars[pos].1) {
                        pos += 1;
                    }
                    continue;
                }
            }
        }

        pos += 1;
    }

    links
}

/// Length of `http://`, `https://` or `www.` at `pos` if it may start a link here
fn url_prefix_len(chars: &[(usize, char)], pos: usize) -> Option<usize> {
    if pos > 0 {
        let prev = chars[pos - 1].1;
        if !(prev.is_whitespace() || matches!(prev, '*' | '_' | '~' | '(' | '"' | '\'')) {
            return None;
        }
    }

    for prefix in ["https://", "http://", "www."] {
        if starts_with_ignore_case(chars, pos, prefix) {
            return Some(prefix.len());
        }
    }
    None
}

fn starts_with_ignore_case(chars: &[(usize, char)], pos: usize, prefix: &str) -> bool {
    let mut i = pos;
    for expected in prefix.chars() {
        match chars.get(i) {
            Some((_, c)) if c.to_ascii_lowercase() == expected => i += 1,
            _ => return false,
        }
    }
    true
}

/// Find the end of a URL, trimming trailing punctuation and unbalanced parens
fn find_url_end(chars: &[(usize, char)], start: usize, prefix_len: usize) -> Option<usize> {
    let mut pos = start;
    let mut open = 0usize;
    let mut close = 0usize;
    while pos < chars.len() {
        match chars[pos].1 {
            c if c.is_whitespace() || c == '<' || c == '>' => break,
            '(' => open += 1,
            ')' => close += 1,
            _ => {}
        }
        pos += 1;
    }

    // Paren counts are kept in step with `pos` so trimming stays linear
    while pos > start + prefix_len {
        match chars[pos - 1].1 {
            '?' | '!' | '.' | ',' | ':' | ';' | '*' | '_' | '~' | '\'' | '"' => pos -= 1,
            ')' if close > open => {
                close -= 1;
                pos -= 1;
            }
            _ => break,
        }
    }

    // Require a domain label right after the prefix
    let host_start = start + prefix_len;
    let has_host = chars[host_start..pos]
        .first()
        .map(|(_, c)| c.is_alphanumeric())
        .unwrap_or(false);
    if has_host {
        Some(pos)
    } else {
        None
    }
}

fn is_email_local_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '+' | '_' | '-')
}

fn is_email_domain_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

fn is_email_start(chars: &[(usize, char)], pos: usize) -> bool {
    let c = chars[pos].1;
    if !is_email_local_char(c) {
        return false;
    }
    pos == 0 || !is_email_local_char(chars[pos - 1].1) && chars[pos - 1].1 != '/'
}

fn find_email_end(chars: &[(usize, char)], start: usize) -> Option<usize> {
    let mut pos = start;
    while pos < chars.len() && is_email_local_char(chars[pos].1) {
        pos += 1;
    }
    if pos == start || chars.get(pos).map(|(_, c)| *c) != Some('@') {
        return None;
    }
    pos += 1;

    let domain_start = pos;
    while pos < chars.len() && is_email_domain_char(chars[pos].1) {
        pos += 1;
    }
    while pos > domain_start && chars[pos - 1].1 == '.' {
        pos -= 1;
    }
    if pos == domain_start {
        return None;
    }

    let domain = &chars[domain_start..pos];
    let last = domain[domain.len() - 1].1;
    if last == '-' || last == '_' || !domain.iter().any(|(_, c)| *c == '.') {
        return None;
    }
    // Dots must separate non-empty labels
    if domain[0].1 == '.' || domain.windows(2).any(|w| w[0].1 == '.' && w[1].1 == '.') {
        return None;
    }
    Some(pos)
}

/// Split a text value into text and link nodes
pub fn linkify(text: &str) -> Vec<MdNode> {
    let links = find_links(text);
    if links.is_empty() {
        return vec![MdNode::Text(text.to_string())];
    }

    let mut nodes = Vec::with_capacity(links.len() * 2 + 1);
    let mut last = 0;
    for link in links {
        if link.range.start > last {
            nodes.push(MdNode::Text(text[last..link.range.start].to_string()));
        }
        nodes.push(MdNode::Link {
            url: link.url,
            title: None,
            children: vec![MdNode::Text(text[link.range.clone()].to_string())],
        });
        last = link.range.end;
    }
    if last < text.len() {
        nodes.push(MdNode::Text(text[last..].to_string()));
    }
    nodes
}

/// Apply [`linkify`] to every text node outside links, images and code
pub fn linkify_tree(node: &mut MdNode) {
    // Code and image nodes carry plain strings, so they have no children here
    let Some(children) = node.children_mut() else {
        return;
    };

    let mut rewritten = Vec::with_capacity(children.len());
    for mut child in std::mem::take(children) {
        match child {
            MdNode::Text(ref value) => rewritten.extend(linkify(value)),
            MdNode::Link { .. } => rewritten.push(child),
            _ => {
                linkify_tree(&mut child);
                rewritten.push(child);
            }
        }
    }
    *children = rewritten;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(text: &str) -> Vec<String> {
        find_links(text).into_iter().map(|l| l.url).collect()
    }

    #[test]
    fn test_bare_urls() {
        assert_eq!(urls("see https://example.com now"), vec!["https://example.com"]);
        assert_eq!(urls("http://a.io/x?y=1"), vec!["http://a.io/x?y=1"]);
    }

    #[test]
    fn test_www_gets_scheme() {
        assert_eq!(urls("visit www.example.com."), vec!["http://www.example.com"]);
    }

    #[test]
    fn test_trailing_punctuation_trimmed() {
        assert_eq!(urls("(https://example.com/a)"), vec!["https://example.com/a"]);
        assert_eq!(
            urls("https://en.wikipedia.org/wiki/Rust_(language)!"),
            vec!["https://en.wikipedia.org/wiki/Rust_(language)"]
        );
    }

    #[test]
    fn test_long_paren_run_is_trimmed_in_linear_time() {
        let text = format!("http://a.io/{}", ")".repeat(200_000));
        let started = std::time::Instant::now();
        let links = find_links(&text);
        assert!(started.elapsed() < std::time::Duration::from_secs(2));
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "http://a.io/");

        // Balanced parens inside the run are kept
        let text = format!("http://a.io/{}{}", "(".repeat(3), ")".repeat(10));
        assert_eq!(urls(&text), vec![format!("http://a.io/{}", "((()))")]);
    }

    #[test]
    fn test_emails_become_mailto() {
        assert_eq!(urls("mail me@example.org."), vec!["mailto:me@example.org"]);
        assert!(urls("not@an-address").is_empty());
        assert!(urls("user@host_").is_empty());
    }

    #[test]
    fn test_url_needs_boundary() {
        assert!(urls("xhttps://example.com").is_empty());
        assert!(urls("https://").is_empty());
    }

    #[test]
    fn test_linkify_splits_text() {
        let nodes = linkify("a www.x.com b");
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0], MdNode::Text("a ".into()));
        assert!(matches!(&nodes[1], MdNode::Link { url, .. } if url == "http://www.x.com"));
        assert_eq!(nodes[2], MdNode::Text(" b".into()));
    }
}
