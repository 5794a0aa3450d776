use super::Extraction;
use crate::document::ParsedDocument;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Priority of an unsuffixed (original upload) URL. Resize widths are assumed to stay below it.
const FULL_RESOLUTION_PRIORITY: u64 = 10_000;
const UNPARSED_RESIZE_PRIORITY: u64 = 500;
const OTHER_VARIANT_PRIORITY: u64 = 50;
const CROP_MARKERS: &[&str] = &["_carw_", "_rwc_"];

fn portfolio_image_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"https://cdn\.myportfolio\.com/[a-f0-9-]+/([a-f0-9-]+)(_[^.]+)?(\.(jpg|png))\?h=[a-f0-9]+",
        )
        .expect("portfolio image regex")
    })
}

fn resize_width_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"_rw_(\d+)").expect("resize width regex"))
}

/// sbskpop.kr galleries are hosted on Adobe Portfolio, which publishes each upload in several
/// sizes. Keeps the largest non-cropped variant per image, in first-seen order.
pub fn extract_sbskpop_images(document: &ParsedDocument) -> Extraction {
    let mut order: Vec<String> = Vec::new();
    let mut best: HashMap<String, (u64, String)> = HashMap::new();

    for caps in portfolio_image_re().captures_iter(document.text()) {
        let (Some(full), Some(id)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let suffix = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        if CROP_MARKERS.iter().any(|marker| suffix.contains(marker)) {
            continue;
        }

        let priority = variant_priority(suffix);
        let id = id.as_str();
        match best.get_mut(id) {
            Some(current) => {
                if priority > current.0 {
                    *current = (priority, full.as_str().to_string());
                }
            }
            None => {
                order.push(id.to_string());
                best.insert(id.to_string(), (priority, full.as_str().to_string()));
            }
        }
    }

    let full_res = best
        .values()
        .filter(|(priority, _)| *priority >= FULL_RESOLUTION_PRIORITY)
        .count();
    let resized = best.len() - full_res;
    let urls: Vec<String> = order
        .iter()
        .filter_map(|id| best.remove(id).map(|(_, url)| url))
        .collect();

    Extraction {
        summary: format!(
            "Found {full_res} full-resolution + {resized} resized = {} total images",
            urls.len()
        ),
        urls,
        notes: Vec::new(),
    }
}

fn variant_priority(suffix: &str) -> u64 {
    if suffix.is_empty() {
        return FULL_RESOLUTION_PRIORITY;
    }
    if suffix.starts_with("_rw_") {
        return resize_width_re()
            .captures(suffix)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(UNPARSED_RESIZE_PRIORITY);
    }
    OTHER_VARIANT_PRIORITY
}
