use html::head::{HeadMetadata, extract_head_metadata};
use html::traverse::{assign_node_ids, find_body, find_head, find_node_by_id};
use html::{Id, Node, parse_document, to_html};
use url::{Origin, Url};

/// The live document plus the URL it is shown under.
pub struct PageState {
    pub url: Url,
    pub dom: Node,
    next_id: u32,
}

impl PageState {
    pub fn new(url: Url, mut dom: Node) -> Self {
        let mut next_id = 1;
        assign_node_ids(&mut dom, &mut next_id);
        Self { url, dom, next_id }
    }

    pub fn parse(url: Url, markup: &str) -> Self {
        Self::new(url, parse_document(markup))
    }

    /// Numbers nodes inserted since the last call. Existing ids are untouched.
    pub fn assign_new_ids(&mut self) {
        assign_node_ids(&mut self.dom, &mut self.next_id);
    }

    pub fn origin(&self) -> Origin {
        self.url.origin()
    }

    pub fn head_metadata(&self) -> HeadMetadata {
        extract_head_metadata(&self.dom)
    }

    pub fn title(&self) -> Option<String> {
        self.head_metadata().title
    }

    /// Base URL for resolving links: the first `<base href>` if it parses, else the page URL.
    pub fn base_url(&self) -> Url {
        match self.head_metadata().base_href {
            Some(href) => self.url.join(&href).unwrap_or_else(|err| {
                log::warn!(target: "router.page", "ignoring bad <base href={href:?}>: {err}");
                self.url.clone()
            }),
            None => self.url.clone(),
        }
    }

    pub fn resolve(&self, href: &str) -> Result<Url, url::ParseError> {
        self.base_url().join(href.trim())
    }

    pub fn node(&self, id: Id) -> Option<&Node> {
        find_node_by_id(&self.dom, id)
    }

    pub fn head(&self) -> Option<&Node> {
        find_head(&self.dom)
    }

    pub fn body(&self) -> Option<&Node> {
        find_body(&self.dom)
    }

    pub fn to_html(&self) -> String {
        to_html(&self.dom)
    }
}
