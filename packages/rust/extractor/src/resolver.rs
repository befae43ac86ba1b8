//! Company metadata resolution from homepage HTML.
//!
//! Each field is resolved independently from an ordered list of rules; the
//! first rule yielding a non-empty value wins. `url` is resolved before
//! `name` because the `og:site_name` cleaning step needs the canonical host.

use scraper::{Html, Selector};
use url::Url;

use enricher_shared::{DomainKey, title_case};

/// Metadata fields resolved from one homepage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompanyMeta {
    pub name: String,
    pub url: Option<String>,
    pub description: Option<String>,
    pub twitter: Option<String>,
}

/// Read `attr` from the first element matching `selector`.
#[derive(Debug, Clone, Copy)]
pub struct AttrRule {
    pub selector: &'static str,
    pub attr: &'static str,
}

const fn meta_name(selector: &'static str) -> AttrRule {
    AttrRule {
        selector,
        attr: "content",
    }
}

/// Canonical URL, `og:url` first.
pub const URL_RULES: &[AttrRule] = &[
    meta_name(r#"meta[property="og:url"]"#),
    AttrRule {
        selector: r#"link[rel~="canonical"]"#,
        attr: "href",
    },
];

/// Twitter handle, `twitter:site` first.
pub const TWITTER_RULES: &[AttrRule] = &[
    meta_name(r#"meta[name="twitter:site"]"#),
    meta_name(r#"meta[name="twitter:creator"]"#),
];

/// Description, `og:description` first.
pub const DESCRIPTION_RULES: &[AttrRule] = &[
    meta_name(r#"meta[property="og:description"]"#),
    meta_name(r#"meta[name="description"]"#),
];

const APPLICATION_NAME: AttrRule = meta_name(r#"meta[name="application-name"]"#);
const OG_SITE_NAME: AttrRule = meta_name(r#"meta[property="og:site_name"]"#);

/// Inputs shared by the name rules.
struct NameContext<'a> {
    domain: &'a DomainKey,
    url: Option<&'a str>,
}

type NameRule = fn(&Html, &NameContext<'_>) -> Option<String>;

/// Name rules in priority order. The domain label is the final fallback.
const NAME_RULES: &[NameRule] = &[application_name, og_site_name];

/// Whether a body carries anything worth parsing.
pub fn is_extractable(html: &str) -> bool {
    let trimmed = html.trim();
    !trimmed.is_empty() && trimmed.contains('<')
}

/// Resolve all metadata fields from a homepage.
pub fn resolve(html: &str, domain: &DomainKey) -> CompanyMeta {
    let doc = Html::parse_document(html);
    resolve_document(&doc, domain)
}

/// Resolve all metadata fields from an already-parsed document.
pub fn resolve_document(doc: &Html, domain: &DomainKey) -> CompanyMeta {
    let url = first_attr(doc, URL_RULES);
    let twitter = first_attr(doc, TWITTER_RULES);
    let description = first_attr(doc, DESCRIPTION_RULES);

    let ctx = NameContext {
        domain,
        url: url.as_deref(),
    };
    let name = NAME_RULES
        .iter()
        .find_map(|rule| rule(doc, &ctx))
        .unwrap_or_else(|| title_case(domain.base_label()));

    CompanyMeta {
        name,
        url,
        description,
        twitter,
    }
}

/// Apply `rules` in order, returning the first non-empty trimmed value.
pub fn first_attr(doc: &Html, rules: &[AttrRule]) -> Option<String> {
    rules.iter().find_map(|rule| attr_value(doc, rule))
}

fn attr_value(doc: &Html, rule: &AttrRule) -> Option<String> {
    let selector = Selector::parse(rule.selector).ok()?;
    doc.select(&selector)
        .filter_map(|el| el.value().attr(rule.attr))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(String::from)
}

fn application_name(doc: &Html, _ctx: &NameContext<'_>) -> Option<String> {
    attr_value(doc, &APPLICATION_NAME)
}

/// An `og:site_name` that cleans down to nothing falls through to the next rule.
fn og_site_name(doc: &Html, ctx: &NameContext<'_>) -> Option<String> {
    let site_name = attr_value(doc, &OG_SITE_NAME)?;
    let base = ctx
        .url
        .and_then(|u| url_host_label(u, ctx.domain))
        .unwrap_or_else(|| ctx.domain.first_label().to_string());
    let cleaned = clean_company_name(&site_name, &base);
    (!cleaned.is_empty()).then_some(cleaned)
}

/// First label of a declared URL's host, lowercased.
/// Relative URLs are resolved against the domain's homepage.
fn url_host_label(declared: &str, domain: &DomainKey) -> Option<String> {
    let parsed = Url::parse(&format!("https://{domain}/"))
        .and_then(|base| base.join(declared))
        .or_else(|_| Url::parse(declared))
        .ok()?;
    let host = parsed.host_str()?.to_lowercase();
    let label = host.split('.').next().unwrap_or_default();
    (!label.is_empty()).then(|| label.to_string())
}

/// Strip taglines from an `og:site_name` value.
///
/// If `base_label` occurs in the value (case-insensitively), keep only the
/// text before the first `-` or `(`, which may be empty. Otherwise return
/// the value trimmed.
pub fn clean_company_name(content: &str, base_label: &str) -> String {
    let trimmed = content.trim();
    if base_label.is_empty() || !trimmed.to_lowercase().contains(&base_label.to_lowercase()) {
        return trimmed.to_string();
    }

    match trimmed.find(['-', '(']) {
        Some(idx) => trimmed[..idx].trim().to_string(),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> DomainKey {
        DomainKey::normalize(s)
    }

    fn load_fixture(name: &str) -> String {
        let path = format!("../../../fixtures/html/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }

    fn page(head: &str) -> String {
        format!("<!DOCTYPE html><html><head>{head}</head><body><h1>Hi</h1></body></html>")
    }

    // -----------------------------------------------------------------------
    // name
    // -----------------------------------------------------------------------

    #[test]
    fn application_name_wins() {
        let html = page(
            r#"<meta name="application-name" content="Acme App">
               <meta property="og:site_name" content="Acme Inc - Home">"#,
        );
        assert_eq!(resolve(&html, &key("acme.com")).name, "Acme App");
    }

    #[test]
    fn og_site_name_is_cleaned_when_label_matches() {
        let html = page(r#"<meta property="og:site_name" content="Example Co - Blog">"#);
        assert_eq!(resolve(&html, &key("example.com")).name, "Example Co");
    }

    #[test]
    fn og_site_name_kept_verbatim_without_label() {
        let html = page(r#"<meta property="og:site_name" content=" Globex (Holdings) - News ">"#);
        assert_eq!(
            resolve(&html, &key("initech.com")).name,
            "Globex (Holdings) - News"
        );
    }

    #[test]
    fn og_site_name_uses_declared_url_host() {
        let html = page(
            r#"<meta property="og:site_name" content="Widgets (by Brandco)">
               <meta property="og:url" content="https://brandco.io/">"#,
        );
        // Served from a different domain, but the canonical host is brandco.
        assert_eq!(resolve(&html, &key("widgets.example")).name, "Widgets");
    }

    #[test]
    fn www_host_label_is_not_stripped() {
        let html = page(
            r#"<meta property="og:site_name" content="Foo - Blog">
               <meta property="og:url" content="https://www.foo.com/">"#,
        );
        // The host's first label is "www", which the site name does not contain.
        assert_eq!(resolve(&html, &key("foo.com")).name, "Foo - Blog");
    }

    #[test]
    fn site_name_cleaned_to_nothing_falls_through() {
        let html = page(r#"<meta property="og:site_name" content="- Example (home)">"#);
        assert_eq!(resolve(&html, &key("example.com")).name, "Example");
    }

    #[test]
    fn relative_canonical_falls_back_to_domain_host() {
        let html = page(
            r#"<meta property="og:site_name" content="Example - Docs">
               <link rel="canonical" href="/">"#,
        );
        let meta = resolve(&html, &key("example.com"));
        assert_eq!(meta.name, "Example");
        assert_eq!(meta.url.as_deref(), Some("/"));
    }

    #[test]
    fn empty_application_name_falls_through() {
        let html = page(
            r#"<meta name="application-name" content="  ">
               <meta property="og:site_name" content="Initech">"#,
        );
        assert_eq!(resolve(&html, &key("initech.com")).name, "Initech");
    }

    #[test]
    fn domain_label_is_last_resort() {
        let html = page("<title>Welcome</title>");
        assert_eq!(resolve(&html, &key("www.my-shop.com")).name, "My-Shop");
    }

    // -----------------------------------------------------------------------
    // url / twitter / description
    // -----------------------------------------------------------------------

    #[test]
    fn og_url_beats_canonical() {
        let html = page(
            r#"<link rel="canonical" href="https://example.com/canonical">
               <meta property="og:url" content="https://example.com/og">"#,
        );
        assert_eq!(
            resolve(&html, &key("example.com")).url.as_deref(),
            Some("https://example.com/og")
        );
    }

    #[test]
    fn canonical_link_with_multiple_rel_tokens() {
        let html = page(r#"<link rel="canonical alternate" href="https://example.com/">"#);
        assert_eq!(
            resolve(&html, &key("example.com")).url.as_deref(),
            Some("https://example.com/")
        );
    }

    #[test]
    fn twitter_site_beats_creator() {
        let html = page(
            r#"<meta name="twitter:creator" content="@founder">
               <meta name="twitter:site" content="@company">"#,
        );
        assert_eq!(
            resolve(&html, &key("example.com")).twitter.as_deref(),
            Some("@company")
        );

        let html = page(r#"<meta name="twitter:creator" content="@founder">"#);
        assert_eq!(
            resolve(&html, &key("example.com")).twitter.as_deref(),
            Some("@founder")
        );
    }

    #[test]
    fn og_description_beats_description() {
        let html = page(
            r#"<meta name="description" content="generic">
               <meta property="og:description" content="open graph">"#,
        );
        assert_eq!(
            resolve(&html, &key("example.com")).description.as_deref(),
            Some("open graph")
        );
    }

    #[test]
    fn missing_tags_are_absent() {
        let meta = resolve(&page(""), &key("example.com"));
        assert_eq!(
            meta,
            CompanyMeta {
                name: "Example".into(),
                url: None,
                description: None,
                twitter: None,
            }
        );
    }

    // -----------------------------------------------------------------------
    // helpers and fixtures
    // -----------------------------------------------------------------------

    #[test]
    fn clean_company_name_rules() {
        assert_eq!(clean_company_name("Example Co - Blog", "example"), "Example Co");
        assert_eq!(clean_company_name("EXAMPLE (Official)", "example"), "EXAMPLE");
        assert_eq!(clean_company_name("Other - Blog", "example"), "Other - Blog");
        assert_eq!(clean_company_name("- example", "example"), "");
        assert_eq!(clean_company_name(" Plain ", ""), "Plain");
    }

    #[test]
    fn extractable_bodies() {
        assert!(is_extractable("<html></html>"));
        assert!(!is_extractable(""));
        assert!(!is_extractable("   \n"));
        assert!(!is_extractable("plain text, no markup"));
    }

    #[test]
    fn full_company_homepage_fixture() {
        let html = load_fixture("company-full.html");
        let meta = resolve(&html, &key("northwind.com"));
        // og:url host label is "www", so the tagline stays.
        assert_eq!(meta.name, "Northwind Traders - Specialty Foods");
        assert_eq!(meta.url.as_deref(), Some("https://www.northwind.com/"));
        assert_eq!(
            meta.description.as_deref(),
            Some("Specialty foods, shipped worldwide since 1998.")
        );
        assert_eq!(meta.twitter.as_deref(), Some("@northwind"));
    }

    #[test]
    fn sparse_homepage_fixture() {
        let html = load_fixture("company-sparse.html");
        let meta = resolve(&html, &key("https://www.contoso.org/en"));
        assert_eq!(meta.name, "Contoso");
        assert_eq!(
            meta.url.as_deref(),
            Some("https://www.contoso.org/en/")
        );
        assert_eq!(meta.description.as_deref(), Some("Contoso builds things."));
        assert!(meta.twitter.is_none());
    }
}
