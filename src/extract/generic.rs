use super::Extraction;
use crate::document::{attr, ParsedDocument};

/// Last resort for unrecognized sites: every `img` source on the page, as written.
pub fn extract_generic_images(document: &ParsedDocument) -> Extraction {
    let urls: Vec<String> = document
        .images()
        .iter()
        .filter_map(|img| attr(img, "src"))
        .filter(|src| !src.starts_with("data:"))
        .map(str::to_string)
        .collect();

    Extraction {
        summary: format!("Found {} images", urls.len()),
        urls,
        notes: vec!["Unknown URL format, trying generic extraction".to_string()],
    }
}
