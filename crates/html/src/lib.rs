pub mod head;
pub mod morph;
pub mod serialize;
pub mod traverse;

mod dom_builder;
mod entities;
mod tokenizer;
mod types;

use memchr::{memchr, memchr2};

/// True when a `Content-Type` value names an HTML document.
pub fn is_html(ct: &Option<String>) -> bool {
    let Some(value) = ct.as_deref() else {
        return false;
    };
    contains_ignore_ascii_case(value, b"text/html")
        || contains_ignore_ascii_case(value, b"application/xhtml")
}

fn contains_ignore_ascii_case(haystack: &str, needle: &[u8]) -> bool {
    let hay = haystack.as_bytes();
    let n = needle.len();
    if n == 0 {
        return true;
    }
    if hay.len() < n {
        return false;
    }
    let first = needle[0];
    let (a, b) = (first.to_ascii_lowercase(), first.to_ascii_uppercase());
    let mut i = 0;
    while i + n <= hay.len() {
        let rel = if a == b {
            memchr(a, &hay[i..])
        } else {
            memchr2(a, b, &hay[i..])
        };
        let Some(rel) = rel else {
            return false;
        };
        let pos = i + rel;
        if pos + n <= hay.len() && hay[pos..pos + n].eq_ignore_ascii_case(needle) {
            return true;
        }
        i = pos + 1;
    }
    false
}

pub use crate::dom_builder::{build_dom, normalize_document, parse_document};
pub use crate::morph::{MorphError, MorphStats, morph};
pub use crate::serialize::to_html;
pub use crate::tokenizer::{Tokenizer, tokenize};
pub use crate::types::{Attribute, Id, Node, NodeId, Token};
