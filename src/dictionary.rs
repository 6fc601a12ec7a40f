//! The persisted course dictionary: identifier → title, built once per
//! catalog root and reused across runs.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::courses::RawCourse;

/// Sorted keys keep the persisted JSON and the identifier index
/// deterministic.
pub type CourseDictionary = BTreeMap<String, String>;

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    saved_at: DateTime<Utc>,
    courses: CourseDictionary,
}

/// Build a dictionary from crawl extractions. Later entries overwrite
/// duplicates.
pub fn build<'a, I>(courses: I) -> CourseDictionary
where
    I: IntoIterator<Item = &'a RawCourse>,
{
    let mut dict = CourseDictionary::new();
    for course in courses {
        dict.insert(course.course_id.clone(), course.course_title.clone());
    }
    dict
}

pub fn save(dict: &CourseDictionary, path: &Path) -> Result<()> {
    let cache = CacheFile {
        saved_at: Utc::now(),
        courses: dict.clone(),
    };
    let json = serde_json::to_string_pretty(&cache)?;
    fs::write(path, json)
        .with_context(|| format!("write course dictionary: {}", path.display()))?;
    info!(path = %path.display(), courses = dict.len(), "saved course dictionary");
    Ok(())
}

pub fn load(path: &Path) -> Result<CourseDictionary> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read course dictionary: {}", path.display()))?;
    let cache: CacheFile = serde_json::from_str(&raw)
        .with_context(|| format!("parse course dictionary: {}", path.display()))?;
    info!(path = %path.display(), courses = cache.courses.len(), "loaded course dictionary");
    Ok(cache.courses)
}

/// `None` when no cache file exists. A present but unreadable cache is an
/// error: components that require a prebuilt dictionary must not rebuild
/// over a corrupt file.
pub fn load_if_present(path: &Path) -> Result<Option<CourseDictionary>> {
    if !path.exists() {
        return Ok(None);
    }
    load(path).map(Some)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: &str, title: &str) -> RawCourse {
        RawCourse {
            course_id: id.to_string(),
            course_title: title.to_string(),
            prerequisites: None,
        }
    }

    #[test]
    fn later_entries_overwrite_duplicates() {
        let extracted = [
            raw("CHEM-104L", "General Chemistry Lab"),
            raw("BIOL-201", "Cell Biology"),
            raw("CHEM-104L", "General Chemistry Laboratory"),
        ];
        let dict = build(&extracted);
        assert_eq!(dict.len(), 2);
        assert_eq!(dict["CHEM-104L"], "General Chemistry Laboratory");
    }

    #[test]
    fn save_load_round_trips() {
        let dir = std::env::temp_dir().join(format!("catalog_dict_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("round_trip.json");

        let dict = build(&[raw("CHEM-104L", "General Chemistry Lab"), raw("MATH-120", "Calculus")]);
        save(&dict, &path).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded, dict);

        // Saving what we loaded produces an identical mapping again.
        save(&loaded, &path).unwrap();
        assert_eq!(load(&path).unwrap(), dict);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_file_is_none_corrupt_file_is_error() {
        let dir = std::env::temp_dir().join(format!("catalog_dict_err_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        assert!(load_if_present(&dir.join("absent.json")).unwrap().is_none());

        let corrupt = dir.join("corrupt.json");
        fs::write(&corrupt, "{ not json").unwrap();
        assert!(load_if_present(&corrupt).is_err());

        fs::remove_dir_all(&dir).ok();
    }
}
