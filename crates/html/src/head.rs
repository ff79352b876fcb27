use crate::Node;
use crate::traverse::find_head;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadMetadata {
    pub title: Option<String>,
    pub base_href: Option<String>,
}

pub fn extract_head_metadata(dom: &Node) -> HeadMetadata {
    let mut meta = HeadMetadata::default();
    let Some(head) = find_head(dom) else {
        return meta;
    };

    for child in head.children() {
        // First <title> and first <base href> win, matching document.title / baseURI.
        if child.is_element("title") && meta.title.is_none() {
            let text = child.text_content();
            let trimmed = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if !trimmed.is_empty() {
                meta.title = Some(trimmed);
            }
        }
        if child.is_element("base") && meta.base_href.is_none() {
            if let Some(href) = child.attr("href").map(str::trim).filter(|h| !h.is_empty()) {
                meta.base_href = Some(href.to_string());
            }
        }
    }
    meta
}
