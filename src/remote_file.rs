use chrono::{DateTime, FixedOffset};
use reqwest::header::{HeaderMap, CONTENT_LENGTH, LAST_MODIFIED};
use reqwest::Url;

/// What the server told us about the body before it was streamed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteFileInfo {
    pub content_length: Option<u64>,
    pub last_modified: Option<DateTime<FixedOffset>>,
}

impl RemoteFileInfo {
    pub fn new(head_map: &HeaderMap) -> Self {
        let mut content_length = None;
        let mut last_modified = None;
        if let Some(value) = head_map.get(CONTENT_LENGTH) {
            if let Ok(value_str) = value.to_str() {
                content_length = value_str.trim().parse().ok();
            }
        }
        if let Some(value) = head_map.get(LAST_MODIFIED) {
            if let Ok(value_str) = value.to_str() {
                last_modified = DateTime::parse_from_rfc2822(value_str).ok();
            }
        }

        Self {
            content_length,
            last_modified,
        }
    }
}

/// Final non-empty path segment of `url`, percent-encoding left as is.
pub fn file_name_from_url(url: &str) -> Option<String> {
    match Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|segments| segments.filter(|segment| !segment.is_empty()).last())
            .map(|segment| segment.to_string()),
        Err(_) => {
            let path = url.split(['?', '#']).next().unwrap_or_default();
            path.rsplit('/')
                .find(|segment| !segment.is_empty())
                .map(|segment| segment.to_string())
        }
    }
}
