use std::sync::OnceLock;

use regex::Regex;

const DRIVE_VIEW_PREFIX: &str = "https://drive.google.com/uc?export=view&id=";

// Tried in order; the first pattern with a non-empty capture wins.
const FILE_ID_PATTERNS: [&str; 3] = [r"/d/(.*?)/view", r"id=(.*?)(&|$)", r"/file/d/(.*?)(\?|$)"];

static FILE_ID_MATCHERS: OnceLock<Vec<Regex>> = OnceLock::new();

fn matchers() -> &'static [Regex] {
    FILE_ID_MATCHERS.get_or_init(|| {
        FILE_ID_PATTERNS
            .iter()
            .map(|p| Regex::new(p).expect("drive file id pattern must compile"))
            .collect()
    })
}

pub fn extract_file_id(url: &str) -> Option<&str> {
    matchers().iter().find_map(|re| {
        re.captures(url)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .filter(|id| !id.is_empty())
    })
}

/// Rewrites share links (`/file/d/<id>/view`, `open?id=<id>`, ...) into a
/// direct-view URL. Anything without a recognizable file id is returned as-is.
pub fn normalize_image_url(url: &str) -> String {
    match extract_file_id(url) {
        Some(id) => format!("{DRIVE_VIEW_PREFIX}{id}"),
        None => url.to_string(),
    }
}
