//! Navigation discovery: school candidates, sidebar membership, and
//! labeled-link resolution.
//!
//! Discovery is two-phase on purpose. Enumerating anchors under the year
//! root produces false positives (footer links, cross-references), so
//! candidates are kept only when the page's side navigation also links to
//! them — the sidebar is the structural signal for "part of this
//! catalog's tree".

use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::config::CrawlConfig;
use crate::fetch::PageFetcher;
use crate::urls;

/// Sidebar locations tried in priority order: by identifier, then by
/// class, then by role. First match wins.
static SIDEBAR_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    [
        "div#sidebar",
        "nav#sidebar",
        "aside#sidebar",
        "div.sidebar",
        "nav.sidebar",
        r#"div[role="navigation"]"#,
    ]
    .iter()
    .map(|s| Selector::parse(s).unwrap())
    .collect()
});

static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());
static UL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("ul").unwrap());

static UNDERGRAD_SECTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/undergraduate/[^/]+/?$").unwrap());
static ANY_SECTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(?:undergraduate|graduate)/[^/]+/?$").unwrap());

/// A sidebar navigation entry: visible text plus normalized target.
#[derive(Debug, Clone, PartialEq)]
pub struct NavLink {
    pub text: String,
    pub url: String,
}

/// Visible text of an element, whitespace-collapsed.
pub fn element_text(el: &ElementRef) -> String {
    let joined: String = el.text().collect();
    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn find_sidebar<'a>(doc: &'a Html) -> Option<ElementRef<'a>> {
    SIDEBAR_SELECTORS
        .iter()
        .find_map(|sel| doc.select(sel).next())
}

/// All anchors under the page's year root whose path looks like a
/// top-level section page, normalized, deduplicated, and sorted.
pub fn candidate_schools_in(html: &str, page_url: &Url, include_graduate: bool) -> Vec<String> {
    let doc = Html::parse_document(html);
    let year_root = urls::year_root(page_url);
    let section_re: &Regex = if include_graduate {
        &ANY_SECTION_RE
    } else {
        &UNDERGRAD_SECTION_RE
    };

    let mut candidates = BTreeSet::new();
    for a in doc.select(&ANCHOR) {
        let Some(href) = a.value().attr("href") else { continue };
        let Ok(abs) = page_url.join(href) else { continue };
        if !abs.as_str().starts_with(&year_root) {
            continue;
        }
        if section_re.is_match(abs.path()) {
            candidates.insert(urls::normalize_url(abs.as_str(), page_url));
        }
    }

    candidates.into_iter().collect()
}

pub async fn discover_candidate_schools(
    fetcher: &PageFetcher,
    root_url: &Url,
    config: &CrawlConfig,
) -> Vec<String> {
    let Some(html) = fetcher.fetch(root_url.as_str()).await else {
        return Vec::new();
    };
    candidate_schools_in(&html, root_url, config.include_graduate)
}

/// Normalized targets of every anchor inside the page's sidebar. Empty
/// when no sidebar region is found.
pub fn sidebar_links_in(html: &str, page_url: &Url) -> HashSet<String> {
    let doc = Html::parse_document(html);
    let Some(sidebar) = find_sidebar(&doc) else {
        return HashSet::new();
    };

    sidebar
        .select(&ANCHOR)
        .filter_map(|a| a.value().attr("href"))
        .map(|href| urls::normalize_url(href, page_url))
        .collect()
}

pub async fn sidebar_links(fetcher: &PageFetcher, page_url: &str) -> HashSet<String> {
    let Ok(base) = Url::parse(page_url) else {
        return HashSet::new();
    };
    let Some(html) = fetcher.fetch(page_url).await else {
        return HashSet::new();
    };
    sidebar_links_in(&html, &base)
}

/// Keep only candidates the sidebar itself links to.
pub fn filter_by_sidebar(candidates: &[String], sidebar: &HashSet<String>) -> Vec<String> {
    candidates
        .iter()
        .filter(|u| sidebar.contains(*u))
        .cloned()
        .collect()
}

/// Entries of the sidebar's first `ul`, direct `li` children only — on a
/// school page these are the program navigation links.
pub fn sidebar_program_links_in(html: &str, page_url: &Url) -> Vec<NavLink> {
    let doc = Html::parse_document(html);
    let Some(sidebar) = find_sidebar(&doc) else {
        return Vec::new();
    };
    let Some(ul) = sidebar.select(&UL).next() else {
        return Vec::new();
    };

    let mut links = Vec::new();
    for li in ul.children().filter_map(ElementRef::wrap) {
        if li.value().name() != "li" {
            continue;
        }
        let Some(a) = li.select(&ANCHOR).next() else { continue };
        let Some(href) = a.value().attr("href") else { continue };
        links.push(NavLink {
            text: element_text(&a),
            url: urls::normalize_url(href, page_url),
        });
    }
    links
}

pub async fn sidebar_program_links(fetcher: &PageFetcher, page_url: &str) -> Vec<NavLink> {
    let Ok(base) = Url::parse(page_url) else {
        return Vec::new();
    };
    let Some(html) = fetcher.fetch(page_url).await else {
        return Vec::new();
    };
    sidebar_program_links_in(&html, &base)
}

/// First anchor whose visible text contains `needle` case-insensitively.
/// When several anchors match, document order decides; the markup carries
/// no better signal.
pub fn find_link_in(html: &str, page_url: &Url, needle: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let needle = needle.to_lowercase();
    for a in doc.select(&ANCHOR) {
        if element_text(&a).to_lowercase().contains(&needle) {
            let href = a.value().attr("href")?;
            return page_url.join(href).ok().map(String::from);
        }
    }
    None
}

pub async fn find_link(fetcher: &PageFetcher, page_url: &str, needle: &str) -> Option<String> {
    let base = Url::parse(page_url).ok()?;
    let html = fetcher.fetch(page_url).await?;
    find_link_in(&html, &base, needle)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://catalog.example.edu/2025-2026/").unwrap()
    }

    const ROOT_PAGE: &str = r#"
        <html><body>
        <div id="sidebar">
          <ul>
            <li><a href="/2025-2026/undergraduate/arts-sciences/">Arts and Sciences</a></li>
            <li><a href="/2025-2026/undergraduate/nursing/">Nursing</a></li>
          </ul>
        </div>
        <main>
          <a href="/2025-2026/undergraduate/arts-sciences/">School of Arts and Sciences</a>
          <a href="/2025-2026/undergraduate/nursing/">Wegmans School of Nursing</a>
          <a href="/2025-2026/graduate/education/">Graduate Education</a>
          <a href="/2025-2026/undergraduate/arts-sciences/biology/">Biology</a>
          <a href="https://other.example.com/2025-2026/undergraduate/fake/">Elsewhere</a>
        </main>
        <footer><a href="/2025-2026/undergraduate/accessibility/">Accessibility</a></footer>
        </body></html>
    "#;

    #[test]
    fn candidates_match_section_pattern_under_year_root() {
        let got = candidate_schools_in(ROOT_PAGE, &base(), false);
        assert_eq!(
            got,
            vec![
                "https://catalog.example.edu/2025-2026/undergraduate/accessibility/".to_string(),
                "https://catalog.example.edu/2025-2026/undergraduate/arts-sciences/".to_string(),
                "https://catalog.example.edu/2025-2026/undergraduate/nursing/".to_string(),
            ]
        );
    }

    #[test]
    fn graduate_sections_included_on_request() {
        let got = candidate_schools_in(ROOT_PAGE, &base(), true);
        assert!(got.contains(&"https://catalog.example.edu/2025-2026/graduate/education/".to_string()));
    }

    #[test]
    fn sidebar_filter_drops_footer_noise() {
        let candidates = candidate_schools_in(ROOT_PAGE, &base(), false);
        let sidebar = sidebar_links_in(ROOT_PAGE, &base());
        let kept = filter_by_sidebar(&candidates, &sidebar);
        assert_eq!(
            kept,
            vec![
                "https://catalog.example.edu/2025-2026/undergraduate/arts-sciences/".to_string(),
                "https://catalog.example.edu/2025-2026/undergraduate/nursing/".to_string(),
            ]
        );
    }

    #[test]
    fn sidebar_selector_chain_falls_back() {
        let by_class = r#"<nav class="sidebar"><a href="/2025-2026/x/">X</a></nav>"#;
        let links = sidebar_links_in(by_class, &base());
        assert!(links.contains("https://catalog.example.edu/2025-2026/x/"));

        let by_role = r#"<div role="navigation"><a href="/2025-2026/y/">Y</a></div>"#;
        let links = sidebar_links_in(by_role, &base());
        assert!(links.contains("https://catalog.example.edu/2025-2026/y/"));

        let none = "<div class=\"content\"><a href=\"/z/\">Z</a></div>";
        assert!(sidebar_links_in(none, &base()).is_empty());
    }

    #[test]
    fn program_links_come_from_first_sidebar_list() {
        let html = r#"
            <div id="sidebar">
              <ul>
                <li><a href="chemistry/">Chemistry</a></li>
                <li><a href="biology/">Biology <span>(B.S.)</span></a></li>
                <li>no anchor here</li>
              </ul>
              <ul><li><a href="ignored/">Ignored</a></li></ul>
            </div>
        "#;
        let links = sidebar_program_links_in(html, &base());
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].text, "Chemistry");
        assert_eq!(links[0].url, "https://catalog.example.edu/2025-2026/chemistry/");
        assert_eq!(links[1].text, "Biology (B.S.)");
    }

    #[test]
    fn find_link_matches_substring_case_insensitively() {
        let html = r#"
            <a href="/about/">About</a>
            <a href="/2025-2026/chem/requirements/">Program Requirements</a>
            <a href="/2025-2026/chem/courses/">Chemistry Courses</a>
        "#;
        assert_eq!(
            find_link_in(html, &base(), "program requirements"),
            Some("https://catalog.example.edu/2025-2026/chem/requirements/".to_string())
        );
        // Document order decides: "Chemistry Courses" is the first anchor
        // containing "courses".
        assert_eq!(
            find_link_in(html, &base(), "Courses"),
            Some("https://catalog.example.edu/2025-2026/chem/courses/".to_string())
        );
        assert_eq!(find_link_in(html, &base(), "Faculty"), None);
    }
}
