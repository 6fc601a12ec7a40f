//! The crawl pipeline and the aggregate catalog structure.

use std::collections::HashMap;
use std::sync::LazyLock;

use indicatif::{ProgressBar, ProgressStyle};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::config::CrawlConfig;
use crate::courses::{self, RawCourse};
use crate::dictionary::CourseDictionary;
use crate::fetch::PageFetcher;
use crate::nav::{self, element_text};
use crate::prereq::{self, CourseIndex};

static H1: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").unwrap());
static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());

/// A resolved, denormalized reference into the course dictionary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseRef {
    pub course_id: String,
    pub course_title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseRecord {
    pub course_id: String,
    pub course_title: String,
    pub prerequisites: Vec<CourseRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramRecord {
    pub program_name: String,
    pub program_requirements_url: String,
    pub courses_url: String,
    pub requirement_courses: Vec<CourseRef>,
    pub program_courses: Vec<CourseRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchoolRecord {
    pub school_name: String,
    pub school_url: String,
    pub programs: Vec<ProgramRecord>,
}

/// The sole output artifact of the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSummary {
    pub catalog_url: String,
    pub total_courses: usize,
    pub schools: Vec<SchoolRecord>,
}

/// One raw course extraction with its crawl context. The dictionary build
/// and the summary build both fold over the same extraction stream, so the
/// two walks of the site agree.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub school_url: String,
    pub program_name: String,
    pub program_requirements_url: String,
    pub courses_url: String,
    pub raw: RawCourse,
}

/// Walk the catalog: root → sidebar-confirmed schools → program nav links
/// → requirement/courses links → per-course extractions. Every fetch is
/// sequential behind the fetcher's rate gate.
pub async fn collect_extractions(
    fetcher: &PageFetcher,
    root_url: &Url,
    config: &CrawlConfig,
) -> Vec<Extraction> {
    let candidates = nav::discover_candidate_schools(fetcher, root_url, config).await;
    let sidebar = nav::sidebar_links(fetcher, root_url.as_str()).await;
    let schools = nav::filter_by_sidebar(&candidates, &sidebar);
    info!(
        candidates = candidates.len(),
        in_sidebar = schools.len(),
        "discovered school pages"
    );

    let pb = ProgressBar::new(schools.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} schools")
            .unwrap()
            .progress_chars("=> "),
    );

    let mut extractions = Vec::new();
    for school_url in &schools {
        debug!(school = %school_url, "crawling school");
        for nav_link in nav::sidebar_program_links(fetcher, school_url).await {
            let Some(requirements_url) =
                nav::find_link(fetcher, &nav_link.url, "Program Requirements").await
            else {
                continue;
            };
            let Some(courses_url) = nav::find_link(fetcher, &nav_link.url, "Courses").await else {
                continue;
            };

            for raw in courses::extract_courses(fetcher, &courses_url, config).await {
                extractions.push(Extraction {
                    school_url: school_url.clone(),
                    program_name: nav_link.text.clone(),
                    program_requirements_url: requirements_url.clone(),
                    courses_url: courses_url.clone(),
                    raw,
                });
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    extractions
}

/// Fold extractions into the nested summary. Schools and programs are
/// created on first sighting, preserving crawl order; `total_courses`
/// counts raw extractions, not deduplicated dictionary entries.
pub async fn summarize(
    fetcher: &PageFetcher,
    root_url: &Url,
    dictionary: &CourseDictionary,
    extractions: Vec<Extraction>,
) -> CatalogSummary {
    let index = CourseIndex::new(dictionary);
    let total_courses = extractions.len();
    let mut unmatched_total = 0usize;

    let mut schools: Vec<SchoolRecord> = Vec::new();
    let mut school_pos: HashMap<String, usize> = HashMap::new();

    for extraction in extractions {
        let school_idx = match school_pos.get(&extraction.school_url) {
            Some(&idx) => idx,
            None => {
                let name = school_name(fetcher, &extraction.school_url).await;
                schools.push(SchoolRecord {
                    school_name: name,
                    school_url: extraction.school_url.clone(),
                    programs: Vec::new(),
                });
                school_pos.insert(extraction.school_url.clone(), schools.len() - 1);
                schools.len() - 1
            }
        };

        let program_idx = match schools[school_idx]
            .programs
            .iter()
            .position(|p| p.program_name == extraction.program_name)
        {
            Some(idx) => idx,
            None => {
                // Requirement courses are computed once per program, even
                // when the page yields zero recognized tokens.
                let requirement_courses = match fetcher
                    .fetch(&extraction.program_requirements_url)
                    .await
                {
                    Some(html) => {
                        let resolution = index.resolve_unique(&prereq::page_text(&html));
                        unmatched_total += resolution.unmatched;
                        course_refs(&resolution.course_ids, dictionary)
                    }
                    None => Vec::new(),
                };
                schools[school_idx].programs.push(ProgramRecord {
                    program_name: extraction.program_name.clone(),
                    program_requirements_url: extraction.program_requirements_url.clone(),
                    courses_url: extraction.courses_url.clone(),
                    requirement_courses,
                    program_courses: Vec::new(),
                });
                schools[school_idx].programs.len() - 1
            }
        };

        let prerequisites = match &extraction.raw.prerequisites {
            Some(text) => {
                let resolution = index.resolve(text);
                unmatched_total += resolution.unmatched;
                course_refs(&resolution.course_ids, dictionary)
            }
            None => Vec::new(),
        };

        schools[school_idx].programs[program_idx]
            .program_courses
            .push(CourseRecord {
                course_id: extraction.raw.course_id,
                course_title: extraction.raw.course_title,
                prerequisites,
            });
    }

    if unmatched_total > 0 {
        info!(
            unmatched = unmatched_total,
            "course-code tokens not found in the dictionary were dropped"
        );
    }

    CatalogSummary {
        catalog_url: root_url.to_string(),
        total_courses,
        schools,
    }
}

/// Full pipeline: crawl, then aggregate with the given dictionary.
pub async fn crawl_catalog(
    fetcher: &PageFetcher,
    root_url: &Url,
    dictionary: &CourseDictionary,
    config: &CrawlConfig,
) -> CatalogSummary {
    let extractions = collect_extractions(fetcher, root_url, config).await;
    summarize(fetcher, root_url, dictionary, extractions).await
}

fn course_refs(ids: &[String], dictionary: &CourseDictionary) -> Vec<CourseRef> {
    ids.iter()
        .map(|id| CourseRef {
            course_id: id.clone(),
            course_title: dictionary.get(id).cloned().unwrap_or_else(|| "Unknown".to_string()),
        })
        .collect()
}

/// Display name for a school page: first `h1`, else the page title
/// trimmed at `|`, else a fixed fallback.
pub fn school_name_in(html: &str) -> String {
    let doc = Html::parse_document(html);

    if let Some(h1) = doc.select(&H1).next() {
        let text = element_text(&h1);
        if !text.is_empty() {
            return text;
        }
    }
    if let Some(title) = doc.select(&TITLE).next() {
        let text = element_text(&title);
        let trimmed = text.split('|').next().unwrap_or("").trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    "Unknown School".to_string()
}

async fn school_name(fetcher: &PageFetcher, school_url: &str) -> String {
    match fetcher.fetch(school_url).await {
        Some(html) => school_name_in(&html),
        None => "Unknown School".to_string(),
    }
}

// ── Tests ──
