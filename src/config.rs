use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::urls;

/// Crawl configuration, passed explicitly into every component.
///
/// The defaults mirror the conventions of the catalog sites this was
/// written against: a 20 s request timeout, a 500 ms politeness delay,
/// undergraduate programs only, and `h3.maryann_course_title` as the
/// course-heading marker.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub user_agent: String,
    pub timeout: Duration,
    /// Minimum interval between any two page fetches.
    pub fetch_delay: Duration,
    /// Also treat `/{year}/graduate/<slug>/` links as school candidates.
    pub include_graduate: bool,
    /// Selector marking a course-title heading on a courses page.
    pub course_heading_selector: String,
    /// Override for the course-dictionary cache location.
    pub dictionary_override: Option<PathBuf>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (compatible; CatalogScraper/0.1)".to_string(),
            timeout: Duration::from_secs(20),
            fetch_delay: Duration::from_millis(500),
            include_graduate: false,
            course_heading_selector: "h3.maryann_course_title".to_string(),
            dictionary_override: None,
        }
    }
}

impl CrawlConfig {
    /// Effective cache path for a catalog root: the override if set,
    /// otherwise a filename derived from the root URL's path.
    pub fn dictionary_path(&self, root: &Url) -> PathBuf {
        self.dictionary_override
            .clone()
            .unwrap_or_else(|| PathBuf::from(urls::dictionary_filename(root)))
    }
}
