//! Course page parsing: one `RawCourse` per course-title heading.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::warn;

use crate::config::CrawlConfig;
use crate::fetch::PageFetcher;
use crate::nav::element_text;

static PAREN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\([^()]*\)").unwrap());
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static PREREQ_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)pre-requisites?").unwrap());
static PREREQ_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)pre-requisites?:?\s*").unwrap());
static SPAN: LazyLock<Selector> = LazyLock::new(|| Selector::parse("span").unwrap());

/// One course as extracted from a courses page, prerequisites still raw text.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCourse {
    pub course_id: String,
    pub course_title: String,
    pub prerequisites: Option<String>,
}

/// Strip parenthetical spans (nested included, innermost first) and
/// collapse whitespace.
pub fn remove_parenthetical(text: &str) -> String {
    let mut text = text.to_string();
    while text.contains('(') {
        let stripped = PAREN_RE.replace_all(&text, "").into_owned();
        if stripped == text {
            // Unbalanced '(' — nothing left to strip.
            break;
        }
        text = stripped;
    }
    WS_RE.replace_all(&text, " ").trim().to_string()
}

/// Extract every course from a courses-listing page. One finite pass per
/// call; callers re-invoke per page.
pub fn parse_course_page(html: &str, config: &CrawlConfig) -> Vec<RawCourse> {
    let heading_sel = match Selector::parse(&config.course_heading_selector) {
        Ok(sel) => sel,
        Err(e) => {
            warn!(
                selector = %config.course_heading_selector,
                error = %e,
                "invalid course heading selector"
            );
            return Vec::new();
        }
    };

    let doc = Html::parse_document(html);
    let mut courses = Vec::new();

    for heading in doc.select(&heading_sel) {
        let title = element_text(&heading);
        if title.is_empty() {
            continue;
        }
        let cleaned = remove_parenthetical(&title);
        if cleaned.is_empty() {
            continue;
        }

        let (course_id, course_title) = match cleaned.split_once(' ') {
            Some((id, rest)) => (id.trim().to_string(), rest.trim().to_string()),
            None => (cleaned, String::new()),
        };

        let prerequisites = enclosing_list_item(&heading).and_then(prerequisite_text);

        courses.push(RawCourse {
            course_id,
            course_title,
            prerequisites,
        });
    }

    courses
}

pub async fn extract_courses(
    fetcher: &PageFetcher,
    courses_url: &str,
    config: &CrawlConfig,
) -> Vec<RawCourse> {
    let Some(html) = fetcher.fetch(courses_url).await else {
        return Vec::new();
    };
    parse_course_page(&html, config)
}

fn enclosing_list_item<'a>(el: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "li")
}

/// Prerequisite text for one course: the "Pre-requisite(s)" label's next
/// text sibling, else the remainder of the label's parent text after the
/// label, first line only.
fn prerequisite_text(li: ElementRef) -> Option<String> {
    let label = li
        .select(&SPAN)
        .find(|span| PREREQ_LABEL_RE.is_match(&element_text(span)))?;

    if let Some(sibling) = label.next_sibling() {
        if let Some(text) = sibling.value().as_text() {
            let text = text.trim();
            if !text.is_empty() {
                return Some(text.to_string());
            }
        }
    }

    let parent = label.parent().and_then(ElementRef::wrap)?;
    let parent_text: String = parent.text().collect();
    let after_label = PREREQ_SPLIT_RE.splitn(&parent_text, 2).nth(1)?;
    let first_line = after_label.lines().next().unwrap_or("").trim();
    if first_line.is_empty() {
        None
    } else {
        Some(first_line.to_string())
    }
}

// ── Tests ──
