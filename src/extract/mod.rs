//! Site-specific image URL extraction.
//!
//! Every extractor is pure over the fetched document and returns URLs in first-seen order
//! with duplicates removed (except the generic fallback, which keeps the page as-is).

mod gallery;
mod generic;
mod naver;
mod sbs;
mod sbskpop;

use crate::classify::SiteKind;
use crate::document::ParsedDocument;
use serde::Serialize;
use std::collections::HashSet;

pub use gallery::{extract_berriz_images, extract_weverse_images};
pub use generic::extract_generic_images;
pub use naver::extract_naver_images;
pub use sbs::extract_sbs_program_images;
pub use sbskpop::extract_sbskpop_images;

/// An image URL plus the content id used to recognize other size variants of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    pub url: String,
    pub dedup_key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Extraction {
    pub urls: Vec<String>,
    /// One-line count summary, e.g. "Found 3 Weverse images".
    pub summary: String,
    /// Intermediate counts worth showing the user, in the order they were observed.
    pub notes: Vec<String>,
}

pub fn extract_images(kind: SiteKind, document: &ParsedDocument, page_url: &str) -> Extraction {
    match kind {
        SiteKind::NaverBlog | SiteKind::NaverPost => extract_naver_images(document),
        SiteKind::Sbskpop => extract_sbskpop_images(document),
        SiteKind::SbsProgram => extract_sbs_program_images(document, page_url),
        SiteKind::Weverse => extract_weverse_images(document),
        SiteKind::Berriz => extract_berriz_images(document),
        SiteKind::Unknown => extract_generic_images(document),
    }
}

/// Ordered, de-duplicated image list. A record is dropped when its dedup key or its URL
/// was already accepted.
#[derive(Debug, Default)]
struct ImageSet {
    records: Vec<ImageRecord>,
    seen_urls: HashSet<String>,
    seen_keys: HashSet<String>,
}

impl ImageSet {
    fn push_url(&mut self, url: impl Into<String>) -> bool {
        self.push(ImageRecord {
            url: url.into(),
            dedup_key: None,
        })
    }

    fn push(&mut self, record: ImageRecord) -> bool {
        if let Some(key) = &record.dedup_key {
            if !self.seen_keys.insert(key.clone()) {
                return false;
            }
        }
        if !self.seen_urls.insert(record.url.clone()) {
            return false;
        }
        self.records.push(record);
        true
    }

    fn len(&self) -> usize {
        self.records.len()
    }

    fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn into_urls(self) -> Vec<String> {
        self.records.into_iter().map(|r| r.url).collect()
    }
}

/// URL with everything from the first `?` dropped.
fn strip_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_set_keeps_first_occurrence_order() {
        let mut set = ImageSet::default();
        assert!(set.push_url("https://a/1.jpg"));
        assert!(set.push_url("https://a/2.jpg"));
        assert!(!set.push_url("https://a/1.jpg"));
        assert_eq!(set.into_urls(), vec!["https://a/1.jpg", "https://a/2.jpg"]);
    }

    #[test]
    fn image_set_rejects_seen_keys_with_new_urls() {
        let mut set = ImageSet::default();
        assert!(set.push(ImageRecord {
            url: "https://cdn/x/123.jpg".to_string(),
            dedup_key: Some("123".to_string()),
        }));
        assert!(!set.push(ImageRecord {
            url: "https://cdn/y/123.jpg".to_string(),
            dedup_key: Some("123".to_string()),
        }));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn dispatch_routes_unknown_to_generic() {
        let doc = ParsedDocument::parse(r#"<img src="https://x/a.png"><img src="https://x/a.png">"#);
        let out = extract_images(SiteKind::Unknown, &doc, "https://x/");
        assert_eq!(out.urls.len(), 2);
    }

    #[test]
    fn strip_query_handles_missing_query() {
        assert_eq!(strip_query("https://a/b.jpg?type=w966"), "https://a/b.jpg");
        assert_eq!(strip_query("https://a/b.jpg"), "https://a/b.jpg");
    }
}
