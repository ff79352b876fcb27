//! Form serialization for the submission pipeline.
//!
//! Builds the successful-control set of a `<form>` in tree order and turns it into either a
//! query string (GET-like methods) or an urlencoded body.

use core_types::Method;
use html::traverse::closest;
use html::{Id, Node};
use net::HttpRequest;
use url::Url;
use url::form_urlencoded;

use crate::error::RouterError;
use crate::page::PageState;

pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormRequest {
    pub action: Url,
    pub method: Method,
    pub form_data: Vec<(String, String)>,
}

impl FormRequest {
    pub fn encoded(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&self.form_data)
            .finish()
    }

    /// The wire request. GET-like methods replace the action's query with the form data.
    pub fn to_http(&self) -> HttpRequest {
        let mut url = self.action.clone();
        url.set_fragment(None);
        if self.method.carries_query() {
            url.set_query(Some(&self.encoded()));
            HttpRequest::new(self.method, url.as_str())
        } else {
            HttpRequest::new(self.method, url.as_str())
                .with_header("Content-Type", FORM_URLENCODED)
                .with_body(self.encoded().into_bytes())
        }
    }
}

fn is_submit_button(node: &Node) -> bool {
    match node.tag() {
        Some("button") => node
            .attr("type")
            .is_none_or(|t| t.trim().eq_ignore_ascii_case("submit")),
        Some("input") => node.attr("type").is_some_and(|t| {
            let t = t.trim();
            t.eq_ignore_ascii_case("submit") || t.eq_ignore_ascii_case("image")
        }),
        _ => false,
    }
}

fn is_image_button(node: &Node) -> bool {
    node.is_element("input")
        && node
            .attr("type")
            .is_some_and(|t| t.trim().eq_ignore_ascii_case("image"))
}

/// Serializes `form` as submitted by `submitter` (a submit button inside it, if any).
/// A submitter outside `form` is ignored.
pub fn serialize_form(
    page: &PageState,
    form: Id,
    submitter: Option<Id>,
) -> Result<FormRequest, RouterError> {
    let form_node = page
        .node(form)
        .filter(|n| n.is_element("form"))
        .ok_or(RouterError::NotAForm(form))?;
    let submitter = submitter
        .filter(|&id| closest(&page.dom, id, |n| n.id() == form).is_some())
        .and_then(|id| page.node(id))
        .filter(|n| is_submit_button(n));

    let raw_action = submitter
        .and_then(|s| s.attr("formaction"))
        .or_else(|| form_node.attr("action"))
        .map(str::trim)
        .filter(|a| !a.is_empty());
    let action = match raw_action {
        Some(raw) => page.resolve(raw).map_err(|e| RouterError::malformed(raw, e))?,
        None => page.url.clone(),
    };

    let method = submitter
        .and_then(|s| s.attr("formmethod"))
        .or_else(|| form_node.attr("method"))
        .and_then(Method::parse)
        .unwrap_or_default();

    let mut form_data = Vec::new();
    collect_controls(form_node, false, &mut form_data);
    if let Some(button) = submitter {
        let name = button.attr("name").filter(|n| !n.is_empty());
        if is_image_button(button) {
            // No pointer position headlessly; the click lands at the origin.
            let prefix = name.map(|n| format!("{n}.")).unwrap_or_default();
            form_data.push((format!("{prefix}x"), "0".to_string()));
            form_data.push((format!("{prefix}y"), "0".to_string()));
        } else if let Some(name) = name {
            let value = button.attr("value").unwrap_or("");
            form_data.push((name.to_string(), value.to_string()));
        }
    }

    Ok(FormRequest {
        action,
        method,
        form_data,
    })
}

fn collect_controls(node: &Node, disabled: bool, out: &mut Vec<(String, String)>) {
    for child in node.children() {
        match child.tag() {
            Some("fieldset") => collect_controls(child, disabled || child.has_attr("disabled"), out),
            // Nested forms own their controls.
            Some("form") => {}
            Some("input") | Some("select") | Some("textarea") => {
                if disabled || child.has_attr("disabled") {
                    continue;
                }
                let Some(name) = child.attr("name").filter(|n| !n.is_empty()) else {
                    continue;
                };
                control_values(child, name, out);
            }
            _ => collect_controls(child, disabled, out),
        }
    }
}

fn control_values(control: &Node, name: &str, out: &mut Vec<(String, String)>) {
    let mut push = |value: &str| out.push((name.to_string(), value.to_string()));
    match control.tag() {
        Some("input") => {
            let kind = control.attr("type").unwrap_or("text").trim().to_ascii_lowercase();
            match kind.as_str() {
                "checkbox" | "radio" => {
                    if control.has_attr("checked") {
                        push(control.attr("value").unwrap_or("on"));
                    }
                }
                "file" | "image" | "submit" | "reset" | "button" => {}
                _ => push(control.attr("value").unwrap_or("")),
            }
        }
        Some("textarea") => {
            let text = control.text_content();
            // The parser drops one newline right after <textarea>.
            let text = text.strip_prefix('\n').unwrap_or(&text);
            push(&text.replace("\r\n", "\n"));
        }
        Some("select") => {
            let mut options = Vec::new();
            collect_options(control, false, &mut options);
            let selected: Vec<&Node> = options
                .iter()
                .copied()
                .filter(|o| o.has_attr("selected"))
                .collect();
            if control.has_attr("multiple") {
                for option in selected {
                    push(&option_value(option));
                }
            } else if let Some(option) = selected.last().or_else(|| options.first()) {
                push(&option_value(option));
            }
        }
        _ => {}
    }
}

fn collect_options<'a>(node: &'a Node, disabled: bool, out: &mut Vec<&'a Node>) {
    for child in node.children() {
        if child.is_element("option") {
            if !disabled && !child.has_attr("disabled") {
                out.push(child);
            }
        } else if child.is_element("optgroup") {
            collect_options(child, disabled || child.has_attr("disabled"), out);
        }
    }
}

fn option_value(option: &Node) -> String {
    match option.attr("value") {
        Some(value) => value.to_string(),
        None => option
            .text_content()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use html::traverse::collect_element_ids;

    fn page(markup: &str) -> PageState {
        PageState::parse(Url::parse("https://site.test/shop/cart?x=1#top").expect("url"), markup)
    }

    fn first(page: &PageState, tag: &str) -> Id {
        let mut ids = Vec::new();
        collect_element_ids(&page.dom, tag, &mut ids);
        ids[0]
    }

    fn pairs(list: &[(&str, &str)]) -> Vec<(String, String)> {
        list.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn collects_successful_controls_in_tree_order() {
        let page = page(
            r#"<form action="/checkout" method="post">
                <input name="q" value="shoes">
                <input type="checkbox" name="gift" checked>
                <input type="checkbox" name="wrap" value="yes">
                <input type="radio" name="size" value="s">
                <input type="radio" name="size" value="m" checked>
                <input name="off" value="x" disabled>
                <input value="nameless">
                <input type="file" name="upload">
                <input type="submit" name="go" value="Go">
                <textarea name="note">
hello</textarea>
                <select name="color"><option>red</option><option value="b" selected>blue</option></select>
                <select name="tags" multiple><option selected>a</option><option>b</option><option selected>c</option></select>
                <fieldset disabled><input name="hidden" value="h"></fieldset>
            </form>"#,
        );
        let req = serialize_form(&page, first(&page, "form"), None).expect("form");

        assert_eq!(req.method, Method::Post);
        assert_eq!(req.action.as_str(), "https://site.test/checkout");
        assert_eq!(
            req.form_data,
            pairs(&[
                ("q", "shoes"),
                ("gift", "on"),
                ("size", "m"),
                ("note", "hello"),
                ("color", "b"),
                ("tags", "a"),
                ("tags", "c"),
            ])
        );
    }

    #[test]
    fn single_select_without_selection_uses_first_option() {
        let page = page("<form><select name=s><option> One  two </option><option>3</option></select></form>");
        let req = serialize_form(&page, first(&page, "form"), None).expect("form");
        assert_eq!(req.form_data, pairs(&[("s", "One two")]));
    }

    #[test]
    fn missing_action_targets_current_url_and_method_defaults_to_get() {
        let page = page("<form method=dialog><input name=a value=1></form>");
        let req = serialize_form(&page, first(&page, "form"), None).expect("form");
        assert_eq!(req.method, Method::Get);
        assert_eq!(req.action.as_str(), "https://site.test/shop/cart?x=1#top");

        let http = req.to_http();
        assert_eq!(http.url, "https://site.test/shop/cart?a=1");
        assert!(http.body.is_none());
    }

    #[test]
    fn post_encodes_body_and_sets_content_type() {
        let page = page("<form method=POST action=save><input name=title value='a b&c'></form>");
        let http = serialize_form(&page, first(&page, "form"), None)
            .expect("form")
            .to_http();
        assert_eq!(http.method, Method::Post);
        assert_eq!(http.url, "https://site.test/shop/save");
        assert_eq!(http.header("content-type"), Some(FORM_URLENCODED));
        assert_eq!(http.body.as_deref(), Some(&b"title=a+b%26c"[..]));
    }

    #[test]
    fn submitter_adds_its_pair_and_can_override_action_and_method() {
        let page = page(
            "<form action=/a method=get><input name=x value=1>\
             <button name=op value=del formaction=/delete formmethod=post>Delete</button></form>",
        );
        let req = serialize_form(&page, first(&page, "form"), Some(first(&page, "button")))
            .expect("form");
        assert_eq!(req.action.as_str(), "https://site.test/delete");
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.form_data, pairs(&[("x", "1"), ("op", "del")]));
    }

    #[test]
    fn non_submit_submitter_is_ignored() {
        let page = page("<form><input name=x value=1><button type=button name=b value=v>b</button></form>");
        let req = serialize_form(&page, first(&page, "form"), Some(first(&page, "button")))
            .expect("form");
        assert_eq!(req.form_data, pairs(&[("x", "1")]));
    }

    #[test]
    fn submitter_from_another_form_is_ignored() {
        let page = page(
            "<form action=/a><input name=x value=1></form>\
             <form action=/b><button name=op value=del formaction=/delete formmethod=post>d</button></form>",
        );
        let req = serialize_form(&page, first(&page, "form"), Some(first(&page, "button")))
            .expect("form");
        assert_eq!(req.action.as_str(), "https://site.test/a");
        assert_eq!(req.method, Method::Get);
        assert_eq!(req.form_data, pairs(&[("x", "1")]));
    }

    #[test]
    fn image_submitter_sends_click_coordinates() {
        let page = page("<form><input name=x value=1><input type=image name=go src=go.png></form>");
        let mut inputs = Vec::new();
        collect_element_ids(&page.dom, "input", &mut inputs);
        let req = serialize_form(&page, first(&page, "form"), Some(inputs[1])).expect("form");
        assert_eq!(req.form_data, pairs(&[("x", "1"), ("go.x", "0"), ("go.y", "0")]));

        let page = self::page("<form><input type=image src=go.png></form>");
        let req = serialize_form(&page, first(&page, "form"), Some(first(&page, "input")))
            .expect("form");
        assert_eq!(req.form_data, pairs(&[("x", "0"), ("y", "0")]));
    }

    #[test]
    fn non_form_target_is_rejected() {
        let page = page("<form></form><p>x</p>");
        let p = first(&page, "p");
        assert!(matches!(
            serialize_form(&page, p, None),
            Err(RouterError::NotAForm(id)) if id == p
        ));
    }

    #[test]
    fn unresolvable_action_is_malformed() {
        let page = page("<form action='http://[::1'></form>");
        assert!(matches!(
            serialize_form(&page, first(&page, "form"), None),
            Err(RouterError::MalformedUrl { .. })
        ));
    }
}
