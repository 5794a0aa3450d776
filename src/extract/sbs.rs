use super::{strip_query, Extraction, ImageSet};
use crate::document::{first_attr, ParsedDocument};
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

fn content_image_url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)(https?://[^\s"'<>]+/([a-f0-9]{24})-p\.(jpg|png))"#)
            .expect("sbs content url regex")
    })
}

fn content_filename_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^[a-f0-9]{24}-p\.(jpg|png)$").expect("sbs content filename regex")
    })
}

/// SBS program visual boards name uploaded photos `<24 hex>-p.jpg`; everything else on the page
/// (logos, banners, related-program thumbnails) is ignored.
pub fn extract_sbs_program_images(document: &ParsedDocument, page_url: &str) -> Extraction {
    let mut images = ImageSet::default();

    for caps in content_image_url_re().captures_iter(document.text()) {
        if let Some(m) = caps.get(1) {
            images.push_url(m.as_str());
        }
    }

    let origin = Url::parse(page_url).ok();
    for img in document.images() {
        let Some(src) = first_attr(&img, &["src", "data-src"]) else {
            continue;
        };
        if src.starts_with("data:") {
            continue;
        }
        let filename = strip_query(src.rsplit('/').next().unwrap_or(src));
        if !content_filename_re().is_match(filename) {
            continue;
        }
        images.push_url(absolutize(src, origin.as_ref()));
    }

    Extraction {
        summary: format!("Found {} content images (hex-p pattern)", images.len()),
        urls: images.into_urls(),
        notes: Vec::new(),
    }
}

/// Resolves protocol-relative and root-relative sources against the page's scheme and host.
fn absolutize(src: &str, origin: Option<&Url>) -> String {
    let Some(origin) = origin else {
        return src.to_string();
    };
    if let Some(rest) = src.strip_prefix("//") {
        return format!("{}://{rest}", origin.scheme());
    }
    if src.starts_with('/') {
        if let Some(host) = origin.host_str() {
            let port = origin.port().map(|p| format!(":{p}")).unwrap_or_default();
            return format!("{}://{host}{port}{src}", origin.scheme());
        }
    }
    src.to_string()
}
