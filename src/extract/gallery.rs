use super::{strip_query, Extraction, ImageRecord, ImageSet};
use crate::document::{first_attr, images_within, ParsedDocument};
use regex::Regex;
use std::sync::OnceLock;

/// Layout of a fan-community media post: which containers hold the post's photos, which CDN
/// serves them, and how to tell two size variants of one photo apart.
struct MediaGallery {
    name: &'static str,
    container_class: &'static str,
    cdn_marker: &'static str,
    /// Captures the content id from the filename.
    id_pattern: &'static str,
    /// Full-document pattern used when no container yields an image.
    fallback_pattern: &'static str,
    strip_query: bool,
}

const WEVERSE: MediaGallery = MediaGallery {
    name: "Weverse",
    container_class: r"media-image-simple-list",
    cdn_marker: "phinf.wevpstatic.net",
    id_pattern: r"(?i)/([a-f0-9-]+)\.(jpeg|jpg|png|webp)$",
    fallback_pattern: r#"(?i)https://phinf\.wevpstatic\.net/[^"\s<>]+\.(?:jpeg|jpg|png|webp)"#,
    strip_query: true,
};

const BERRIZ: MediaGallery = MediaGallery {
    name: "Berriz",
    container_class: r"xl:w-\[880px\]",
    cdn_marker: "statics.berriz.in/cdn/partner",
    id_pattern: r"(?i)/(\d+)\.(jpg|jpeg|png|webp)$",
    fallback_pattern: r#"(?i)https://statics\.berriz\.in/cdn/partner/image/[^\s"<>]+\.(jpg|jpeg|png|webp)"#,
    strip_query: false,
};

struct CompiledGallery {
    container: Regex,
    id: Regex,
    fallback: Regex,
}

impl MediaGallery {
    fn compile(&self) -> CompiledGallery {
        CompiledGallery {
            container: Regex::new(self.container_class).expect("gallery container regex"),
            id: Regex::new(self.id_pattern).expect("gallery id regex"),
            fallback: Regex::new(self.fallback_pattern).expect("gallery fallback regex"),
        }
    }

    fn record(&self, compiled: &CompiledGallery, raw: &str) -> ImageRecord {
        let url = if self.strip_query {
            strip_query(raw)
        } else {
            raw
        };
        let dedup_key = compiled
            .id
            .captures(url)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string());
        ImageRecord {
            url: url.to_string(),
            dedup_key,
        }
    }

    fn extract(&self, compiled: &CompiledGallery, document: &ParsedDocument) -> Extraction {
        let mut images = ImageSet::default();

        for container in document.elements_with_class_matching(&compiled.container) {
            for img in images_within(container) {
                let Some(src) = first_attr(&img, &["src", "data-src"]) else {
                    continue;
                };
                if !src.contains(self.cdn_marker) {
                    continue;
                }
                images.push(self.record(compiled, src));
            }
        }

        let mut notes = Vec::new();
        if images.is_empty() {
            notes.push(format!(
                "No {} gallery images in page layout, scanning page text",
                self.name
            ));
            for m in compiled.fallback.find_iter(document.text()) {
                images.push(self.record(compiled, m.as_str()));
            }
        }

        Extraction {
            summary: format!("Found {} {} images", images.len(), self.name),
            urls: images.into_urls(),
            notes,
        }
    }
}

fn weverse() -> &'static CompiledGallery {
    static COMPILED: OnceLock<CompiledGallery> = OnceLock::new();
    COMPILED.get_or_init(|| WEVERSE.compile())
}

fn berriz() -> &'static CompiledGallery {
    static COMPILED: OnceLock<CompiledGallery> = OnceLock::new();
    COMPILED.get_or_init(|| BERRIZ.compile())
}

pub fn extract_weverse_images(document: &ParsedDocument) -> Extraction {
    WEVERSE.extract(weverse(), document)
}

pub fn extract_berriz_images(document: &ParsedDocument) -> Extraction {
    BERRIZ.extract(berriz(), document)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weverse_container_images_dedup_by_file_id() {
        let doc = ParsedDocument::parse(
            r#"<html><body>
              <div class="media-image-simple-list-_container">
                <img src="https://phinf.wevpstatic.net/MjAy/0a1b-2c3d.jpeg?type=w670" />
                <img src="https://phinf.wevpstatic.net/MjAy/0a1b-2c3d.jpeg?type=w1414" />
                <img src="https://phinf.wevpstatic.net/MjAz/ffee.png" />
                <img src="https://cdn-v2pstatic.weverse.io/avatar.png" />
              </div>
              <img src="https://phinf.wevpstatic.net/outside/1234.jpg" />
            </body></html>"#,
        );
        let out = extract_weverse_images(&doc);
        assert_eq!(
            out.urls,
            vec![
                "https://phinf.wevpstatic.net/MjAy/0a1b-2c3d.jpeg",
                "https://phinf.wevpstatic.net/MjAz/ffee.png",
            ]
        );
        assert!(out.notes.is_empty());
        assert_eq!(out.summary, "Found 2 Weverse images");
    }

    #[test]
    fn weverse_falls_back_to_text_scan() {
        let doc = ParsedDocument::parse(
            r#"<html><body><script>
              window.__DATA__ = {"photos":["https://phinf.wevpstatic.net/MjAy/abc123.jpg?type=w1414",
                                           "https://phinf.wevpstatic.net/MjAy/abc123.jpg",
                                           "https://phinf.wevpstatic.net/MjAy/def456.webp"]};
            </script></body></html>"#,
        );
        let out = extract_weverse_images(&doc);
        assert_eq!(
            out.urls,
            vec![
                "https://phinf.wevpstatic.net/MjAy/abc123.jpg",
                "https://phinf.wevpstatic.net/MjAy/def456.webp",
            ]
        );
        assert_eq!(out.notes.len(), 1);
    }

    #[test]
    fn berriz_container_images_keep_query_and_dedup_by_number() {
        let doc = ParsedDocument::parse(
            r#"<html><body>
              <div class="flex flex-col xl:w-[880px]">
                <img src="https://statics.berriz.in/cdn/partner/image/a/991.jpg" />
                <img data-src="https://statics.berriz.in/cdn/partner/image/b/991.jpg" />
                <img src="https://statics.berriz.in/cdn/partner/image/c/992.webp?w=1080" />
                <img src="https://statics.berriz.in/cdn/partner/image/c/992.webp?w=1080" />
                <img src="https://statics.berriz.in/cdn/profile/7.jpg" />
              </div>
            </body></html>"#,
        );
        let out = extract_berriz_images(&doc);
        assert_eq!(
            out.urls,
            vec![
                "https://statics.berriz.in/cdn/partner/image/a/991.jpg",
                "https://statics.berriz.in/cdn/partner/image/c/992.webp?w=1080",
            ]
        );
    }

    #[test]
    fn berriz_text_scan_fallback() {
        let doc = ParsedDocument::parse(
            r#"<html><body><div class="w-full">
              <script>self.__next_f.push("https://statics.berriz.in/cdn/partner/image/x/55.png")</script>
              <script>self.__next_f.push("https://statics.berriz.in/cdn/partner/image/y/55.png")</script>
            </div></body></html>"#,
        );
        let out = extract_berriz_images(&doc);
        assert_eq!(
            out.urls,
            vec!["https://statics.berriz.in/cdn/partner/image/x/55.png"]
        );
    }

    #[test]
    fn empty_page_yields_nothing() {
        let doc = ParsedDocument::parse("<html></html>");
        assert!(extract_weverse_images(&doc).urls.is_empty());
        assert!(extract_berriz_images(&doc).urls.is_empty());
    }
}
