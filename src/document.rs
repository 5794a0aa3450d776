use regex::Regex;
use scraper::{ElementRef, Html, Selector};

/// A fetched page: the raw markup for text scans plus the parsed tree for element queries.
pub struct ParsedDocument {
    source: String,
    html: Html,
}

impl ParsedDocument {
    pub fn parse(source: impl Into<String>) -> Self {
        let source = source.into();
        let html = Html::parse_document(&source);
        Self { source, html }
    }

    /// Whole document as text, for regex scanning.
    pub fn text(&self) -> &str {
        &self.source
    }

    /// Elements carrying every one of `classes`.
    pub fn elements_with_classes(&self, classes: &[&str]) -> Vec<ElementRef<'_>> {
        let selector = Selector::parse("[class]").expect("class selector");
        self.html
            .select(&selector)
            .filter(|el| {
                classes
                    .iter()
                    .all(|wanted| el.value().classes().any(|class| class == *wanted))
            })
            .collect()
    }

    /// Elements with at least one class token matched by `pattern`.
    pub fn elements_with_class_matching(&self, pattern: &Regex) -> Vec<ElementRef<'_>> {
        let selector = Selector::parse("[class]").expect("class selector");
        self.html
            .select(&selector)
            .filter(|el| el.value().classes().any(|class| pattern.is_match(class)))
            .collect()
    }

    pub fn images(&self) -> Vec<ElementRef<'_>> {
        let selector = Selector::parse("img").expect("img selector");
        self.html.select(&selector).collect()
    }
}

/// `img` descendants of `container`.
pub fn images_within<'a>(container: ElementRef<'a>) -> Vec<ElementRef<'a>> {
    let selector = Selector::parse("img").expect("img selector");
    container.select(&selector).collect()
}

/// Attribute value, treating an empty value as absent.
pub fn attr<'a>(el: &ElementRef<'a>, name: &str) -> Option<&'a str> {
    el.value().attr(name).filter(|v| !v.is_empty())
}

/// First non-empty attribute among `names`, in order.
pub fn first_attr<'a>(el: &ElementRef<'a>, names: &[&str]) -> Option<&'a str> {
    names.iter().find_map(|name| attr(el, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
    <html><body>
      <div class="se-main-container">
        <img class="img_attachedfile thumb" src="/a.jpg" />
        <img class="img_attachedfile" src="/b.jpg" />
        <img class="thumb" data-src="/c.jpg" src="" />
      </div>
      <div class="flex xl:w-[880px] mx-auto"><img src="/d.jpg" /></div>
    </body></html>
    "#;

    #[test]
    fn class_query_requires_every_class() {
        let doc = ParsedDocument::parse(PAGE);
        let found = doc.elements_with_classes(&["img_attachedfile", "thumb"]);
        assert_eq!(found.len(), 1);
        assert_eq!(attr(&found[0], "src"), Some("/a.jpg"));
    }

    #[test]
    fn class_pattern_matches_single_tokens() {
        let doc = ParsedDocument::parse(PAGE);
        let pattern = Regex::new(r"xl:w-\[880px\]").expect("regex");
        let containers = doc.elements_with_class_matching(&pattern);
        assert_eq!(containers.len(), 1);
        let imgs = images_within(containers[0]);
        assert_eq!(imgs.len(), 1);
        assert_eq!(attr(&imgs[0], "src"), Some("/d.jpg"));
    }

    #[test]
    fn first_attr_skips_empty_values() {
        let doc = ParsedDocument::parse(PAGE);
        let imgs = doc.images();
        assert_eq!(imgs.len(), 4);
        assert_eq!(first_attr(&imgs[2], &["src", "data-src"]), Some("/c.jpg"));
        assert_eq!(first_attr(&imgs[2], &["data-lazy-src"]), None);
    }

    #[test]
    fn text_is_the_raw_source() {
        let doc = ParsedDocument::parse(PAGE);
        assert!(doc.text().contains("xl:w-[880px]"));
    }
}
