use crate::tokenizer::tokenize;
use crate::types::{Attribute, Id, Node, Token};

/// Elements that belong in `<head>` when they appear before any body content.
fn is_metadata_element(name: &str) -> bool {
    matches!(
        name,
        "base" | "link" | "meta" | "noscript" | "script" | "style" | "template" | "title"
    )
}

/// Start tags that implicitly close an open element of the listed names.
fn implied_closes(name: &str) -> &'static [&'static str] {
    match name {
        "li" => &["li"],
        "option" => &["option"],
        "dt" | "dd" => &["dt", "dd"],
        "tr" => &["tr", "td", "th"],
        "td" | "th" => &["td", "th"],
        "p" | "div" | "ul" | "ol" | "table" | "form" | "section" | "article" | "header"
        | "footer" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "pre" | "blockquote" => &["p"],
        _ => &[],
    }
}

struct Frame {
    name: String,
    attributes: Vec<Attribute>,
    children: Vec<Node>,
}

impl Frame {
    fn into_node(self) -> Node {
        Node::Element {
            id: Id::UNASSIGNED,
            name: self.name,
            attributes: self.attributes,
            children: self.children,
        }
    }
}

/// Builds a raw tree from tokens: a `Document` whose children are whatever the markup
/// contained, without `html`/`head`/`body` normalization.
pub fn build_dom(tokens: Vec<Token>) -> Node {
    let mut doctype = None;
    let mut root: Vec<Node> = Vec::new();
    let mut open: Vec<Frame> = Vec::new();

    fn append(open: &mut [Frame], root: &mut Vec<Node>, node: Node) {
        match open.last_mut() {
            Some(frame) => frame.children.push(node),
            None => root.push(node),
        }
    }

    fn close_top(open: &mut Vec<Frame>, root: &mut Vec<Node>) {
        if let Some(frame) = open.pop() {
            append(open, root, frame.into_node());
        }
    }

    for token in tokens {
        match token {
            Token::Doctype(d) => {
                if doctype.is_none() {
                    doctype = Some(d);
                }
            }
            Token::Comment(text) => append(
                &mut open,
                &mut root,
                Node::Comment {
                    id: Id::UNASSIGNED,
                    text,
                },
            ),
            Token::Text(text) => {
                if let Some(Node::Text { text: prev, .. }) = match open.last_mut() {
                    Some(frame) => frame.children.last_mut(),
                    None => root.last_mut(),
                } {
                    prev.push_str(&text);
                } else {
                    append(&mut open, &mut root, Node::text(text));
                }
            }
            Token::StartTag {
                name,
                attributes,
                self_closing,
            } => {
                let closes = implied_closes(&name);
                if open
                    .last()
                    .is_some_and(|frame| closes.contains(&frame.name.as_str()))
                {
                    close_top(&mut open, &mut root);
                }
                let frame = Frame {
                    name,
                    attributes,
                    children: Vec::new(),
                };
                if self_closing {
                    append(&mut open, &mut root, frame.into_node());
                } else {
                    open.push(frame);
                }
            }
            Token::EndTag(name) => {
                // Stray end tags (nothing open with that name) are dropped.
                if let Some(depth) = open.iter().rposition(|frame| frame.name == name) {
                    while open.len() > depth {
                        close_top(&mut open, &mut root);
                    }
                }
            }
        }
    }
    while !open.is_empty() {
        close_top(&mut open, &mut root);
    }

    Node::Document {
        id: Id::UNASSIGNED,
        doctype,
        children: root,
    }
}

fn is_inter_element_whitespace(node: &Node) -> bool {
    matches!(node, Node::Text { text, .. } if text.trim().is_empty())
}

/// Rewrites a raw tree into `Document > html > (head, body)`.
///
/// Loose metadata before any body content moves into `head`; everything else lands in
/// `body`, keeping document order relative to an explicit `<body>`.
pub fn normalize_document(raw: Node) -> Node {
    let Node::Document {
        doctype, children, ..
    } = raw
    else {
        return normalize_document(Node::Document {
            id: Id::UNASSIGNED,
            doctype: None,
            children: vec![raw],
        });
    };

    let mut doc_comments = Vec::new();
    let mut html_attributes = Vec::new();
    let mut content = Vec::new();
    for child in children {
        if child.is_element("html") {
            if let Node::Element {
                attributes,
                children,
                ..
            } = child
            {
                if html_attributes.is_empty() {
                    html_attributes = attributes;
                }
                content.extend(children);
            }
        } else if matches!(child, Node::Comment { .. }) && content.is_empty() {
            doc_comments.push(child);
        } else {
            content.push(child);
        }
    }

    let mut head: Option<Node> = None;
    let mut body: Option<Node> = None;
    let mut head_extra = Vec::new();
    let mut body_before = Vec::new();
    let mut body_after = Vec::new();
    let mut seen_body_content = false;

    for node in content {
        let tag = node.tag().map(str::to_owned);
        match tag.as_deref() {
            Some("head") if head.is_none() && !seen_body_content => head = Some(node),
            Some("body") if body.is_none() => {
                seen_body_content = true;
                body = Some(node);
            }
            Some(name) if !seen_body_content && is_metadata_element(name) => head_extra.push(node),
            _ if is_inter_element_whitespace(&node) && !seen_body_content => {}
            _ => {
                if matches!(node, Node::Element { .. } | Node::Text { .. }) {
                    seen_body_content = true;
                }
                if body.is_some() {
                    body_after.push(node);
                } else {
                    body_before.push(node);
                }
            }
        }
    }

    let mut head = head.unwrap_or_else(|| Node::element("head", Vec::new(), Vec::new()));
    if let Some(children) = head.children_mut() {
        children.extend(head_extra);
    }
    let mut body = body.unwrap_or_else(|| Node::element("body", Vec::new(), Vec::new()));
    if let Some(children) = body.children_mut() {
        let explicit = std::mem::take(children);
        children.extend(body_before);
        children.extend(explicit);
        children.extend(body_after);
    }

    let html = Node::Element {
        id: Id::UNASSIGNED,
        name: "html".to_string(),
        attributes: html_attributes,
        children: vec![head, body],
    };
    doc_comments.push(html);
    Node::Document {
        id: Id::UNASSIGNED,
        doctype,
        children: doc_comments,
    }
}

/// Parses a full HTML document into a detached, normalized tree with unassigned ids.
pub fn parse_document(input: &str) -> Node {
    normalize_document(build_dom(tokenize(input)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::to_html;
    use crate::traverse::{find_body, find_head};

    #[test]
    fn parse_document_wraps_fragment_in_html_head_body() {
        let doc = parse_document("<title>T</title><p>hello</p>");
        let head = find_head(&doc).expect("head");
        let body = find_body(&doc).expect("body");
        assert_eq!(to_html(head), "<head><title>T</title></head>");
        assert_eq!(to_html(body), "<body><p>hello</p></body>");
    }

    #[test]
    fn parse_document_keeps_explicit_structure_and_doctype() {
        let doc = parse_document(
            "<!DOCTYPE html>\n<html lang=en>\n<head><meta charset=utf-8></head>\n<body class=x><main>m</main></body>\n</html>",
        );
        let Node::Document { doctype, .. } = &doc else {
            panic!("expected document");
        };
        assert_eq!(doctype.as_deref(), Some("DOCTYPE html"));
        let body = find_body(&doc).expect("body");
        assert_eq!(body.attr("class"), Some("x"));
        assert_eq!(body.children()[0].tag(), Some("main"));
    }

    #[test]
    fn metadata_after_body_content_stays_in_body() {
        let doc = parse_document("<p>a</p><script src=/x.js></script>");
        let head = find_head(&doc).expect("head");
        assert!(head.children().is_empty());
        let body = find_body(&doc).expect("body");
        assert_eq!(body.children().len(), 2);
        assert_eq!(body.children()[1].tag(), Some("script"));
    }

    #[test]
    fn builder_applies_implied_end_tags() {
        let doc = build_dom(tokenize("<ul><li>a<li>b</ul><p>one<p>two"));
        assert_eq!(
            to_html(&doc),
            "<ul><li>a</li><li>b</li></ul><p>one</p><p>two</p>"
        );
    }

    #[test]
    fn builder_drops_stray_end_tags() {
        let doc = build_dom(tokenize("<div>a</span>b</div>"));
        assert_eq!(to_html(&doc), "<div>ab</div>");
    }
}
