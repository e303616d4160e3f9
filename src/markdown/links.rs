//! Link classification and external-link annotation

use super::hast::{Node, PropertyValue};
use crate::config::SiteConfig;
use crate::error::{ConfigError, ConfigResult};
use url::Url;

/// Where a link leads relative to the site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// Same site: root-relative, fragment, relative path or same origin
    Internal,
    /// Anything else
    External,
}

/// The site's own origin, used to tell internal links from external ones
#[derive(Debug, Clone, Default)]
pub struct SiteOrigin {
    origin: Option<Url>,
}

impl SiteOrigin {
    /// A site with no known origin; only relative links count as internal
    pub fn unknown() -> Self {
        Self { origin: None }
    }

    pub fn parse(origin: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            origin: Some(Url::parse(origin)?),
        })
    }

    pub fn from_config(site: &SiteConfig) -> ConfigResult<Self> {
        match &site.origin {
            Some(origin) => Self::parse(origin).map_err(|e| ConfigError::InvalidValue {
                key: "site.origin".to_string(),
                reason: e.to_string(),
            }),
            None => Ok(Self::unknown()),
        }
    }

    pub fn url(&self) -> Option<&Url> {
        self.origin.as_ref()
    }

    /// Classify an `href`
    pub fn classify(&self, href: &str) -> LinkKind {
        let href = href.trim();

        if let Some(rest) = protocol_relative_rest(href) {
            // Protocol-relative: compare by host against the site
            return match &self.origin {
                Some(site) => match site.join(&format!("//{}", rest)) {
                    Ok(url) if url.origin() == site.origin() => LinkKind::Internal,
                    _ => LinkKind::External,
                },
                None => LinkKind::External,
            };
        }

        if href.is_empty() || href.starts_with('/') || href.starts_with('#') {
            return LinkKind::Internal;
        }

        match Url::parse(href) {
            Ok(url) => match &self.origin {
                Some(site) if url.origin() == site.origin() => LinkKind::Internal,
                _ => LinkKind::External,
            },
            // `about`, `./notes`, `?page=2`
            Err(url::ParseError::RelativeUrlWithoutBase) => LinkKind::Internal,
            Err(_) => LinkKind::External,
        }
    }

    pub fn is_internal(&self, href: &str) -> bool {
        self.classify(href) == LinkKind::Internal
    }
}

/// Host part of `//host`, where browsers read `\\` the same as `/`
fn protocol_relative_rest(href: &str) -> Option<&str> {
    let mut chars = href.chars();
    let is_slash = |c: Option<char>| matches!(c, Some('/' | '\\'));
    if is_slash(chars.next()) && is_slash(chars.next()) {
        Some(chars.as_str())
    } else {
        None
    }
}

/// Add `rel="noopener noreferrer"` and `target="_blank"` to external anchors
pub fn annotate_external_links(tree: &mut Node, site: &SiteOrigin) {
    tree.walk_elements_mut(&mut |el| {
        if el.tag_name != "a" {
            return;
        }
        let external = match el.property("href").and_then(PropertyValue::as_str) {
            Some(href) => site.classify(href) == LinkKind::External,
            None => false,
        };
        if external {
            el.properties.insert(
                "rel".to_string(),
                PropertyValue::List(vec!["noopener".to_string(), "noreferrer".to_string()]),
            );
            el.properties
                .insert("target".to_string(), PropertyValue::String("_blank".to_string()));
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::hast::{to_html, Element};

    fn site() -> SiteOrigin {
        SiteOrigin::parse("https://example.com").unwrap()
    }

    #[test]
    fn test_classify_relative_links() {
        let site = site();
        assert_eq!(site.classify("/about"), LinkKind::Internal);
        assert_eq!(site.classify("#top"), LinkKind::Internal);
        assert_eq!(site.classify("notes/today"), LinkKind::Internal);
        assert_eq!(site.classify("?page=2"), LinkKind::Internal);
    }

    #[test]
    fn test_classify_absolute_links() {
        let site = site();
        assert_eq!(site.classify("https://example.com/essays"), LinkKind::Internal);
        assert_eq!(site.classify("http://example.com/essays"), LinkKind::External);
        assert_eq!(site.classify("https://other.org"), LinkKind::External);
        assert_eq!(site.classify("mailto:me@example.com"), LinkKind::External);
    }

    #[test]
    fn test_classify_protocol_relative() {
        let site = site();
        assert_eq!(site.classify("//example.com/x"), LinkKind::Internal);
        assert_eq!(site.classify("//evil.com/x"), LinkKind::External);
        assert_eq!(SiteOrigin::unknown().classify("//example.com"), LinkKind::External);
    }

    #[test]
    fn test_classify_backslash_protocol_relative() {
        let site = site();
        assert_eq!(site.classify("/\\evil.com"), LinkKind::External);
        assert_eq!(site.classify("\\\\evil.com/x"), LinkKind::External);
        assert_eq!(site.classify("\\/evil.com"), LinkKind::External);
        assert_eq!(site.classify("/\\example.com/x"), LinkKind::Internal);

        let mut tree = Node::Root(vec![Element::new("a").with_property("href", "/\\evil.com").into()]);
        annotate_external_links(&mut tree, &site);
        assert!(to_html(&tree).contains("target=\"_blank\""));
    }

    #[test]
    fn test_unknown_origin_treats_absolute_as_external() {
        let site = SiteOrigin::unknown();
        assert_eq!(site.classify("https://example.com"), LinkKind::External);
        assert_eq!(site.classify("/about"), LinkKind::Internal);
    }

    #[test]
    fn test_annotate_only_external() {
        let mut tree = Node::Root(vec![
            Element::new("a").with_property("href", "/about").into(),
            Element::new("a").with_property("href", "https://other.org").into(),
            Element::new("a").into(),
        ]);
        annotate_external_links(&mut tree, &site());
        assert_eq!(
            to_html(&tree),
            "<a href=\"/about\"></a><a href=\"https://other.org\" rel=\"noopener noreferrer\" target=\"_blank\"></a><a></a>"
        );
    }

    #[test]
    fn test_from_config() {
        let config = SiteConfig {
            origin: Some("not a url".to_string()),
        };
        assert!(SiteOrigin::from_config(&config).is_err());
        assert!(SiteOrigin::from_config(&SiteConfig::default())
            .unwrap()
            .url()
            .is_none());
    }
}
