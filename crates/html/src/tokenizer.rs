//! Forgiving HTML tokenizer.
//!
//! This is not the HTML5 tokenizer state machine. It handles the markup servers actually
//! emit for page swaps: tags with quoted/unquoted/valueless attributes, comments, doctypes,
//! character references, and rawtext bodies for `<script>`/`<style>`.
//!
//! Known limitations (intentional):
//! - Tag/attribute names are restricted to ASCII `[A-Za-z0-9:_-]` (plus `@`, `.` in attributes).
//! - No parse-error recovery beyond "skip the offending byte".
//! - Rawtext close-tag scanning accepts only ASCII whitespace before `>`.
use crate::entities::decode_entities;
use crate::types::{Attribute, Token};
use memchr::memchr;

const COMMENT_START: &str = "<!--";
const COMMENT_END: &str = "-->";
const SCRIPT_CLOSE_TAG: &[u8] = b"</script";
const STYLE_CLOSE_TAG: &[u8] = b"</style";

pub(crate) fn is_void_element(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

fn is_tag_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':'
}

/// Non-ASCII bytes are always accepted, so a scan never stops inside a UTF-8 sequence.
fn is_attr_name_byte(b: u8) -> bool {
    !b.is_ascii() || is_tag_name_byte(b) || b == b'@' || b == b'.'
}

fn starts_with_ignore_ascii_case_at(haystack: &[u8], start: usize, needle: &[u8]) -> bool {
    haystack.len() >= start + needle.len()
        && haystack[start..start + needle.len()].eq_ignore_ascii_case(needle)
}

/// Finds `</script>`-style close tags; returns `(start, end_after_gt)`.
// `<` never appears inside a UTF-8 continuation byte, so byte scanning is boundary-safe.
fn find_rawtext_close_tag(haystack: &str, close_tag: &[u8]) -> Option<(usize, usize)> {
    let bytes = haystack.as_bytes();
    let len = bytes.len();
    let n = close_tag.len();
    let mut i = 0;
    while i + n <= len {
        i += memchr(b'<', &bytes[i..])?;
        if i + n > len {
            return None;
        }
        if starts_with_ignore_ascii_case_at(bytes, i, close_tag) {
            let mut k = i + n;
            while k < len && bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            if k < len && bytes[k] == b'>' {
                return Some((i, k + 1));
            }
        }
        i += 1;
    }
    None
}

pub struct Tokenizer<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
    out: Vec<Token>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
            out: Vec::new(),
        }
    }

    pub fn run(mut self) -> Vec<Token> {
        while self.pos < self.bytes.len() {
            if self.bytes[self.pos] != b'<' {
                self.text();
                continue;
            }
            if self.input[self.pos..].starts_with(COMMENT_START) {
                self.comment();
            } else if starts_with_ignore_ascii_case_at(self.bytes, self.pos, b"<!doctype") {
                self.doctype();
            } else if self.peek(1) == Some(b'/') {
                self.end_tag();
            } else if self.peek(1).is_some_and(|b| b.is_ascii_alphabetic()) {
                self.start_tag();
            } else {
                // A lone `<` is text.
                self.push_text("<");
                self.pos += 1;
            }
        }
        self.out
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Token::Text(prev)) = self.out.last_mut() {
            prev.push_str(text);
        } else {
            self.out.push(Token::Text(text.to_string()));
        }
    }

    fn text(&mut self) {
        let start = self.pos;
        let end = memchr(b'<', &self.bytes[start..]).map_or(self.bytes.len(), |rel| start + rel);
        let decoded = decode_entities(&self.input[start..end]);
        self.push_text(&decoded);
        self.pos = end;
    }

    fn comment(&mut self) {
        let body_start = self.pos + COMMENT_START.len();
        match self.input[body_start..].find(COMMENT_END) {
            Some(rel) => {
                let body = &self.input[body_start..body_start + rel];
                self.out.push(Token::Comment(body.to_string()));
                self.pos = body_start + rel + COMMENT_END.len();
            }
            None => {
                self.out
                    .push(Token::Comment(self.input[body_start..].to_string()));
                self.pos = self.bytes.len();
            }
        }
    }

    fn doctype(&mut self) {
        let body_start = self.pos + 2;
        match memchr(b'>', &self.bytes[body_start..]) {
            Some(rel) => {
                let doctype = self.input[body_start..body_start + rel].trim();
                self.out.push(Token::Doctype(doctype.to_string()));
                self.pos = body_start + rel + 1;
            }
            None => self.pos = self.bytes.len(),
        }
    }

    fn scan_name(&mut self, accept: fn(u8) -> bool) -> String {
        let start = self.pos;
        while self.pos < self.bytes.len() && accept(self.bytes[self.pos]) {
            self.pos += 1;
        }
        self.input[start..self.pos].to_ascii_lowercase()
    }

    fn skip_char(&mut self) {
        self.pos += self.input[self.pos..].chars().next().map_or(1, char::len_utf8);
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn end_tag(&mut self) {
        self.pos += 2;
        let name = self.scan_name(is_tag_name_byte);
        self.pos = memchr(b'>', &self.bytes[self.pos..])
            .map_or(self.bytes.len(), |rel| self.pos + rel + 1);
        if !name.is_empty() {
            self.out.push(Token::EndTag(name));
        }
    }

    fn start_tag(&mut self) {
        self.pos += 1;
        let name = self.scan_name(is_tag_name_byte);
        let mut attributes: Vec<Attribute> = Vec::new();
        let mut self_closing = false;

        loop {
            self.skip_whitespace();
            let Some(b) = self.peek(0) else {
                break;
            };
            if b == b'>' {
                self.pos += 1;
                break;
            }
            if b == b'/' {
                self.pos += 1;
                if self.peek(0) == Some(b'>') {
                    self_closing = true;
                    self.pos += 1;
                    break;
                }
                continue;
            }
            let attr_name = self.scan_name(is_attr_name_byte);
            if attr_name.is_empty() {
                self.skip_char();
                continue;
            }
            self.skip_whitespace();
            let value = if self.peek(0) == Some(b'=') {
                self.pos += 1;
                self.skip_whitespace();
                Some(self.attribute_value())
            } else {
                None
            };
            // First occurrence wins, as in browsers.
            if !attributes.iter().any(|(k, _)| *k == attr_name) {
                attributes.push((attr_name, value));
            }
        }

        if is_void_element(&name) {
            self_closing = true;
        }
        let rawtext = !self_closing && (name == "script" || name == "style");
        self.out.push(Token::StartTag {
            name: name.clone(),
            attributes,
            self_closing,
        });

        if rawtext {
            let close_tag = if name == "script" {
                SCRIPT_CLOSE_TAG
            } else {
                STYLE_CLOSE_TAG
            };
            let rest = &self.input[self.pos..];
            match find_rawtext_close_tag(rest, close_tag) {
                Some((body_end, after)) => {
                    if body_end > 0 {
                        self.out.push(Token::Text(rest[..body_end].to_string()));
                    }
                    self.pos += after;
                }
                None => {
                    // Missing close tag: the remainder is rawtext.
                    if !rest.is_empty() {
                        self.out.push(Token::Text(rest.to_string()));
                    }
                    self.pos = self.bytes.len();
                }
            }
            self.out.push(Token::EndTag(name));
        }
    }

    fn attribute_value(&mut self) -> String {
        match self.peek(0) {
            Some(quote @ (b'"' | b'\'')) => {
                self.pos += 1;
                let start = self.pos;
                let end =
                    memchr(quote, &self.bytes[start..]).map_or(self.bytes.len(), |rel| start + rel);
                let raw = &self.input[start..end];
                self.pos = (end + 1).min(self.bytes.len());
                decode_entities(raw)
            }
            _ => {
                let start = self.pos;
                while let Some(b) = self.peek(0) {
                    if b.is_ascii_whitespace() || b == b'>' {
                        break;
                    }
                    if b == b'/' && self.peek(1) == Some(b'>') {
                        break;
                    }
                    self.pos += 1;
                }
                decode_entities(&self.input[start..self.pos])
            }
        }
    }
}

pub fn tokenize(input: &str) -> Vec<Token> {
    Tokenizer::new(input).run()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_basic_markup() {
        let tokens = tokenize("<!DOCTYPE html><p class=\"a\">Hi &amp; bye</p>");
        assert_eq!(
            tokens,
            vec![
                Token::Doctype("DOCTYPE html".to_string()),
                Token::StartTag {
                    name: "p".to_string(),
                    attributes: vec![("class".to_string(), Some("a".to_string()))],
                    self_closing: false,
                },
                Token::Text("Hi & bye".to_string()),
                Token::EndTag("p".to_string()),
            ]
        );
    }

    #[test]
    fn tokenize_lowercases_names_and_keeps_first_duplicate_attribute() {
        let tokens = tokenize("<DiV ID=one id=two data-x='1' hidden>");
        let Token::StartTag {
            name, attributes, ..
        } = &tokens[0]
        else {
            panic!("expected start tag, got {tokens:?}");
        };
        assert_eq!(name, "div");
        assert_eq!(
            attributes,
            &vec![
                ("id".to_string(), Some("one".to_string())),
                ("data-x".to_string(), Some("1".to_string())),
                ("hidden".to_string(), None),
            ]
        );
    }

    #[test]
    fn tokenize_script_body_is_rawtext() {
        let tokens = tokenize("<script>if (a < b && c) {}</ScRiPt >after");
        assert_eq!(
            tokens,
            vec![
                Token::StartTag {
                    name: "script".to_string(),
                    attributes: Vec::new(),
                    self_closing: false,
                },
                Token::Text("if (a < b && c) {}".to_string()),
                Token::EndTag("script".to_string()),
                Token::Text("after".to_string()),
            ]
        );
    }

    #[test]
    fn rawtext_close_tag_does_not_accept_near_matches() {
        let tokens = tokenize("<script>ok</scriptx >no</script>");
        assert_eq!(tokens[1], Token::Text("ok</scriptx >no".to_string()));
    }

    #[test]
    fn tokenize_rawtext_without_close_tag_consumes_rest() {
        let tokens = tokenize("<style>body{}");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1], Token::Text("body{}".to_string()));
        assert_eq!(tokens[2], Token::EndTag("style".to_string()));
    }

    #[test]
    fn tokenize_void_elements_self_close() {
        let tokens = tokenize("<input name=q><br/>");
        assert!(matches!(
            &tokens[0],
            Token::StartTag { name, self_closing: true, .. } if name == "input"
        ));
        assert!(matches!(
            &tokens[1],
            Token::StartTag { name, self_closing: true, .. } if name == "br"
        ));
    }

    #[test]
    fn tokenize_lone_angle_bracket_is_text() {
        let tokens = tokenize("1 < 2");
        assert_eq!(tokens, vec![Token::Text("1 < 2".to_string())]);
    }

    #[test]
    fn tokenize_preserves_utf8_text_and_attribute_values() {
        let tokens = tokenize("<p title=naïve>café 😊</p>");
        assert!(matches!(
            &tokens[0],
            Token::StartTag { attributes, .. }
                if attributes[0].1.as_deref() == Some("naïve")
        ));
        assert_eq!(tokens[1], Token::Text("café 😊".to_string()));
    }

    #[test]
    fn tokenize_unterminated_comment_runs_to_end() {
        let tokens = tokenize("<p>a</p><!-- open");
        assert_eq!(tokens.last(), Some(&Token::Comment(" open".to_string())));
    }

    #[test]
    fn tokenize_accepts_non_ascii_attribute_names() {
        let tokens = tokenize("<p data-ñ=1>x</p>");
        assert_eq!(
            tokens[0],
            Token::StartTag {
                name: "p".to_string(),
                attributes: vec![("data-ñ".to_string(), Some("1".to_string()))],
                self_closing: false,
            }
        );
        assert_eq!(tokens[1], Token::Text("x".to_string()));
    }

    #[test]
    fn tokenize_survives_typographic_quotes_inside_tags() {
        let tokens = tokenize("<p “quoted”>x</p><a href=/n ’>y</a>");
        let Token::StartTag { name, attributes, .. } = &tokens[0] else {
            panic!("expected start tag, got {:?}", tokens[0]);
        };
        assert_eq!(name, "p");
        assert_eq!(attributes, &vec![("“quoted”".to_string(), None)]);
        assert_eq!(tokens[1], Token::Text("x".to_string()));
        let Token::StartTag { attributes, .. } = &tokens[3] else {
            panic!("expected start tag, got {:?}", tokens[3]);
        };
        assert_eq!(attributes[0], ("href".to_string(), Some("/n".to_string())));
        assert_eq!(tokens[4], Token::Text("y".to_string()));
    }

    #[test]
    fn tokenize_skips_stray_punctuation_in_tags() {
        let tokens = tokenize("<p ! ?=x class=a>z</p>");
        let Token::StartTag { attributes, .. } = &tokens[0] else {
            panic!("expected start tag, got {:?}", tokens[0]);
        };
        assert!(attributes.contains(&("class".to_string(), Some("a".to_string()))));
        assert_eq!(tokens[1], Token::Text("z".to_string()));
    }
}
