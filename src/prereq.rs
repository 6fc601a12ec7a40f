//! Resolution of free-text prerequisite references into canonical course
//! identifiers.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;

use crate::dictionary::CourseDictionary;

/// Course-code shape: 3-4 letters, optional separator, 3 digits, optional
/// trailing letter (CHEM-104L, CHEM 104, BIOL201).
static COURSE_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z]{3,4}[-\s]?\d{3}[A-Z]?)\b").unwrap());

/// Outcome of one resolution pass. Unmatched tokens are dropped from the
/// result but counted, so runs can report how much prerequisite structure
/// the dictionary failed to cover.
#[derive(Debug, Default, PartialEq)]
pub struct Resolution {
    pub course_ids: Vec<String>,
    pub unmatched: usize,
}

fn normalize_code(code: &str) -> String {
    code.chars()
        .filter(|c| *c != ' ' && *c != '-')
        .collect::<String>()
        .to_uppercase()
}

/// Precomputed map from normalized identifier to canonical dictionary key,
/// so each candidate token is one hash lookup instead of a scan over every
/// key. The dictionary iterates in sorted order, so the smallest key wins
/// when two keys normalize identically.
pub struct CourseIndex {
    by_normalized: HashMap<String, String>,
}

impl CourseIndex {
    pub fn new(dict: &CourseDictionary) -> Self {
        let mut by_normalized = HashMap::with_capacity(dict.len());
        for key in dict.keys() {
            by_normalized
                .entry(normalize_code(key))
                .or_insert_with(|| key.clone());
        }
        Self { by_normalized }
    }

    /// Resolve every course-code token in `text`, in order of appearance,
    /// duplicates kept.
    pub fn resolve(&self, text: &str) -> Resolution {
        let upper = text.to_uppercase();
        let mut resolution = Resolution::default();
        for caps in COURSE_CODE_RE.captures_iter(&upper) {
            match self.by_normalized.get(&normalize_code(&caps[1])) {
                Some(key) => resolution.course_ids.push(key.clone()),
                None => resolution.unmatched += 1,
            }
        }
        resolution
    }

    /// Same scan keeping only first-seen unique matches — used over the
    /// full text of a Program Requirements page.
    pub fn resolve_unique(&self, text: &str) -> Resolution {
        let mut resolution = self.resolve(text);
        let mut seen = HashSet::new();
        resolution.course_ids.retain(|id| seen.insert(id.clone()));
        resolution
    }
}

/// Full visible text of a page, for requirement-course scans.
pub fn page_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    doc.root_element().text().collect::<Vec<_>>().join(" ")
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn index(entries: &[(&str, &str)]) -> CourseIndex {
        let dict: CourseDictionary = entries
            .iter()
            .map(|(id, title)| (id.to_string(), title.to_string()))
            .collect();
        CourseIndex::new(&dict)
    }

    #[test]
    fn resolves_spaced_token_to_hyphenated_key() {
        let idx = index(&[("CHEM-104L", "General Chemistry")]);
        let res = idx.resolve("Prerequisite: CHEM 104L or permission");
        assert_eq!(res.course_ids, vec!["CHEM-104L".to_string()]);
        assert_eq!(res.unmatched, 0);
    }

    #[test]
    fn unmatched_tokens_dropped_but_counted() {
        let idx = index(&[("BIOL-201", "Cell Biology")]);
        let res = idx.resolve("BIOL-201, CHEM-104L, and MATH 120");
        assert_eq!(res.course_ids, vec!["BIOL-201".to_string()]);
        assert_eq!(res.unmatched, 2);
    }

    #[test]
    fn order_follows_appearance_duplicates_kept() {
        let idx = index(&[("MATH-120", "Calculus"), ("PHYS-101", "Mechanics")]);
        let res = idx.resolve("PHYS 101 then MATH-120 then PHYS-101 again");
        assert_eq!(
            res.course_ids,
            vec!["PHYS-101".to_string(), "MATH-120".to_string(), "PHYS-101".to_string()]
        );
    }

    #[test]
    fn unique_resolution_keeps_first_sighting() {
        let idx = index(&[("MATH-120", "Calculus"), ("PHYS-101", "Mechanics")]);
        let res = idx.resolve_unique("MATH-120 PHYS-101 MATH 120 PHYS 101");
        assert_eq!(res.course_ids, vec!["MATH-120".to_string(), "PHYS-101".to_string()]);
    }

    #[test]
    fn lowercase_text_still_matches() {
        let idx = index(&[("CHEM-104L", "General Chemistry")]);
        let res = idx.resolve("prerequisite: chem-104l");
        assert_eq!(res.course_ids, vec!["CHEM-104L".to_string()]);
    }

    #[test]
    fn no_tokens_resolves_to_empty() {
        let idx = index(&[("CHEM-104L", "General Chemistry")]);
        let res = idx.resolve("Instructor permission only.");
        assert_eq!(res, Resolution::default());
    }

    #[test]
    fn page_text_strips_markup() {
        let text = page_text("<html><body><p>Take <b>CHEM-104L</b> first.</p></body></html>");
        let idx = index(&[("CHEM-104L", "General Chemistry")]);
        assert_eq!(idx.resolve(&text).course_ids, vec!["CHEM-104L".to_string()]);
    }
}
