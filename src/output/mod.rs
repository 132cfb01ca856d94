pub mod pages;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;

use crate::model::Costume;
use crate::pipeline::{self, Query, QueryParams};

/// Everything but unreserved characters is escaped inside a path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Site-wide settings the render surfaces need.
#[derive(Clone, Debug)]
pub struct SiteOptions {
    pub title: String,
    pub booking_url: String,
}

impl Default for SiteOptions {
    fn default() -> Self {
        Self {
            title: "Costume Gallery".to_string(),
            booking_url: "https://docs.google.com/forms/".to_string(),
        }
    }
}

pub fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// `/costumes/<id>` with the id percent-encoded as one path segment.
/// Ids made only of dots are fully escaped so they are not read as
/// `.`/`..` path segments.
pub fn detail_href(id: &str) -> String {
    if matches!(id, "." | "..") {
        return format!("/costumes/{}", id.replace('.', "%2E"));
    }
    format!("/costumes/{}", utf8_percent_encode(id, PATH_SEGMENT))
}

/// Payload of `GET /api/costumes`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiListing<'a> {
    pub query: QueryParams,
    pub categories: Vec<String>,
    pub total: usize,
    pub count: usize,
    pub costumes: Vec<&'a Costume>,
}

impl<'a> ApiListing<'a> {
    pub fn build(all: &'a [Costume], query: &Query) -> Self {
        let costumes = pipeline::apply(all, query);
        Self {
            query: query.to_params(),
            categories: pipeline::categories(all),
            total: all.len(),
            count: costumes.len(),
            costumes,
        }
    }
}

pub fn render_json<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut body = serde_json::to_vec_pretty(value)?;
    body.push(b'\n');
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::CategoryFilter;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn detail_href_encodes_segment() {
        assert_eq!(detail_href("c-1"), "/costumes/c-1");
        assert_eq!(detail_href("a/b c"), "/costumes/a%2Fb%20c");
        assert_eq!(detail_href("衣装"), "/costumes/%E8%A1%A3%E8%A3%85");
    }

    #[test]
    fn detail_href_keeps_dot_ids_as_their_own_segment() {
        assert_eq!(detail_href("."), "/costumes/%2E");
        assert_eq!(detail_href(".."), "/costumes/%2E%2E");
        assert_eq!(detail_href("v1.2"), "/costumes/v1.2");
    }

    #[test]
    fn api_listing_counts_filtered_and_total() {
        let all = vec![
            Costume {
                id: "1".to_string(),
                category: "A".to_string(),
                ..Default::default()
            },
            Costume {
                id: "2".to_string(),
                category: "B".to_string(),
                ..Default::default()
            },
        ];
        let query = Query {
            category: CategoryFilter::Only("B".to_string()),
            ..Default::default()
        };
        let listing = ApiListing::build(&all, &query);
        assert_eq!(listing.total, 2);
        assert_eq!(listing.count, 1);
        assert_eq!(listing.categories, vec!["all", "A", "B"]);

        let body = render_json(&listing).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["costumes"][0]["id"], "2");
        assert_eq!(json["query"]["category"], "B");
    }

    #[test]
    fn render_json_reports_unserializable_values() {
        let mut bad = std::collections::HashMap::new();
        bad.insert(vec![1u8], "non-string map key");
        assert!(render_json(&bad).is_err());
    }
}
