//! URL normalization and catalog-root path conventions.
//!
//! Catalog pages are compared by normalized form everywhere: lowercase
//! scheme and host, no query or fragment, and a trailing slash on any path
//! whose last segment has no extension. Path segment case is preserved.

use url::Url;

/// Resolve `raw` against `base` and normalize the result. Falls back to
/// the trimmed input when it cannot be parsed even against the base.
pub fn normalize_url(raw: &str, base: &Url) -> String {
    let trimmed = raw.trim();
    match base.join(trimmed) {
        Ok(url) => normalize_parsed(url),
        Err(_) => trimmed.to_string(),
    }
}

/// Normalize an already-absolute URL string, best effort.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    match Url::parse(trimmed) {
        Ok(url) => normalize_parsed(url),
        Err(_) => trimmed.to_string(),
    }
}

fn normalize_parsed(mut url: Url) -> String {
    url.set_query(None);
    url.set_fragment(None);

    let path = url.path().to_string();
    if !path.ends_with('/') {
        let last = path.rsplit('/').next().unwrap_or("");
        // Segments with a dot are treated as filenames and left alone.
        if !last.contains('.') {
            url.set_path(&format!("{path}/"));
        }
    }

    url.to_string()
}

/// The catalog year root, e.g. `https://catalog.example.edu/2025-2026/`.
pub fn year_root(url: &Url) -> String {
    let origin = origin_of(url);
    match path_segments(url).first() {
        Some(year) => format!("{origin}/{year}/"),
        None => format!("{origin}/"),
    }
}

/// Base filename for per-catalog artifacts: the first two path segments
/// joined by `_` (e.g. `2025-2026_undergraduate`).
pub fn base_filename(url: &Url) -> String {
    let segments = path_segments(url);
    match segments.as_slice() {
        [first, second, ..] => format!("{first}_{second}"),
        [only] => only.to_string(),
        [] => "catalog_summary".to_string(),
    }
}

pub fn dictionary_filename(url: &Url) -> String {
    format!("{}_dictionary.json", base_filename(url))
}

pub fn summary_filename(url: &Url) -> String {
    format!("{}_summary.json", base_filename(url))
}

fn origin_of(url: &Url) -> String {
    let host = url.host_str().unwrap_or("");
    match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    }
}

fn path_segments(url: &Url) -> Vec<&str> {
    url.path_segments()
        .map(|segs| segs.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}

// ── Tests ──
