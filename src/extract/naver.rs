use super::{strip_query, Extraction, ImageSet};
use crate::document::{attr, first_attr, ParsedDocument};

const THUMBNAIL_CDN_HOST: &str = "postfiles.pstatic.net";
const FULL_SIZE_CDN_HOST: &str = "blogfiles.naver.net";

const SMART_EDITOR_CLASSES: &[&str] = &["se-image-resource"];
const SMART_EDITOR_ATTRS: &[&str] = &["data-lazy-src", "data-src", "src"];
const ATTACHED_FILE_CLASSES: &[&str] = &["img_attachedfile", "thumb"];
const MEDIA_IMAGE_CLASSES: &[&str] = &["se_mediaImage", "__se_img_el"];

/// Naver blog / post images.
///
/// Three editor generations are tried newest first. The first one whose markup is present
/// on the page decides the result, even when none of its elements carries a usable URL.
pub fn extract_naver_images(document: &ParsedDocument) -> Extraction {
    let mut notes = Vec::new();

    let smart_editor = document.elements_with_classes(SMART_EDITOR_CLASSES);
    notes.push(format!("Found {} SmartEditor images", smart_editor.len()));
    if !smart_editor.is_empty() {
        let mut images = ImageSet::default();
        for el in &smart_editor {
            if let Some(src) = first_attr(el, SMART_EDITOR_ATTRS) {
                images.push_url(to_full_size(src));
            }
        }
        return finish(images, notes);
    }

    for (classes, label) in [
        (ATTACHED_FILE_CLASSES, ".img_attachedfile.thumb"),
        (MEDIA_IMAGE_CLASSES, ".se_mediaImage.__se_img_el"),
    ] {
        let legacy = document.elements_with_classes(classes);
        notes.push(format!("Found {} legacy format images ({label})", legacy.len()));
        if legacy.is_empty() {
            continue;
        }
        let mut images = ImageSet::default();
        for el in &legacy {
            if let Some(src) = attr(el, "src") {
                images.push_url(strip_query(src));
            }
        }
        return finish(images, notes);
    }

    finish(ImageSet::default(), notes)
}

/// Thumbnail URL to the original upload: no resize query, full-size CDN host.
fn to_full_size(url: &str) -> String {
    strip_query(url).replace(THUMBNAIL_CDN_HOST, FULL_SIZE_CDN_HOST)
}

fn finish(images: ImageSet, notes: Vec<String>) -> Extraction {
    Extraction {
        summary: format!("Found {} Naver images", images.len()),
        urls: images.into_urls(),
        notes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smart_editor_prefers_lazy_src_and_upgrades_host() {
        let doc = ParsedDocument::parse(
            r#"<div>
              <img class="se-image-resource" src="https://postfiles.pstatic.net/low.jpg?type=w80_blur"
                   data-lazy-src="https://postfiles.pstatic.net/MjAy/photo1.jpg?type=w966" />
              <img class="se-image-resource" data-src="https://postfiles.pstatic.net/MjAy/photo2.jpg?type=w966" />
              <img class="se-image-resource" src="https://postfiles.pstatic.net/MjAy/photo1.jpg?type=w773" />
            </div>"#,
        );
        let out = extract_naver_images(&doc);
        assert_eq!(
            out.urls,
            vec![
                "https://blogfiles.naver.net/MjAy/photo1.jpg",
                "https://blogfiles.naver.net/MjAy/photo2.jpg",
            ]
        );
        assert_eq!(out.notes.len(), 1);
    }

    #[test]
    fn smart_editor_match_stops_cascade_even_without_urls() {
        let doc = ParsedDocument::parse(
            r#"<div>
              <span class="se-image-resource"></span>
              <img class="img_attachedfile thumb" src="https://blogfiles.naver.net/legacy.jpg" />
            </div>"#,
        );
        let out = extract_naver_images(&doc);
        assert!(out.urls.is_empty());
        assert_eq!(out.notes, vec!["Found 1 SmartEditor images"]);
    }

    #[test]
    fn legacy_attachment_wins_over_media_image() {
        let doc = ParsedDocument::parse(
            r#"<div>
              <img class="img_attachedfile thumb" src="https://postfiles.pstatic.net/a.jpg?type=w2" />
              <img class="se_mediaImage __se_img_el" src="https://postfiles.pstatic.net/b.jpg?type=w2" />
            </div>"#,
        );
        let out = extract_naver_images(&doc);
        // Legacy strategies strip the query but keep the host.
        assert_eq!(out.urls, vec!["https://postfiles.pstatic.net/a.jpg"]);
        assert_eq!(out.notes.len(), 2);
    }

    #[test]
    fn legacy_attachment_result_returned_even_if_empty() {
        let doc = ParsedDocument::parse(
            r#"<div>
              <img class="img_attachedfile thumb" />
              <img class="se_mediaImage __se_img_el" src="https://postfiles.pstatic.net/b.jpg" />
            </div>"#,
        );
        let out = extract_naver_images(&doc);
        assert!(out.urls.is_empty());
        assert_eq!(out.notes.len(), 2);
    }

    #[test]
    fn media_image_used_as_last_resort() {
        let doc = ParsedDocument::parse(
            r#"<div>
              <img class="se_mediaImage __se_img_el" src="https://postfiles.pstatic.net/b.jpg?type=w1" />
              <img class="se_mediaImage __se_img_el" src="https://postfiles.pstatic.net/b.jpg?type=w2" />
            </div>"#,
        );
        let out = extract_naver_images(&doc);
        assert_eq!(out.urls, vec!["https://postfiles.pstatic.net/b.jpg"]);
        assert_eq!(out.notes.len(), 3);
        assert_eq!(out.summary, "Found 1 Naver images");
    }

    #[test]
    fn nothing_matches() {
        let doc = ParsedDocument::parse("<p>text only</p>");
        let out = extract_naver_images(&doc);
        assert!(out.urls.is_empty());
        assert_eq!(out.notes.len(), 3);
    }
}
