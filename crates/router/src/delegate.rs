//! Document-level event delegation.
//!
//! The host forwards every UI event here instead of binding handlers per element, so
//! interception keeps working however often the body is patched. Targets are resolved
//! through the event's dispatch path (`html::traverse::closest`).

use html::traverse::closest;
use html::{Id, Node};
use url::Url;

use crate::page::PageState;
use crate::router::Router;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MouseButton {
    #[default]
    Primary,
    Auxiliary,
    Secondary,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    pub fn any(&self) -> bool {
        self.ctrl || self.meta || self.shift || self.alt
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UiEvent {
    Click {
        target: Id,
        button: MouseButton,
        modifiers: Modifiers,
        default_prevented: bool,
    },
    Submit {
        target: Id,
        submitter: Option<Id>,
        default_prevented: bool,
    },
    MouseEnter {
        target: Id,
    },
    Focus {
        target: Id,
    },
}

impl UiEvent {
    /// A plain primary-button click.
    pub fn click(target: Id) -> Self {
        UiEvent::Click {
            target,
            button: MouseButton::Primary,
            modifiers: Modifiers::default(),
            default_prevented: false,
        }
    }

    pub fn submit(target: Id) -> Self {
        UiEvent::Submit {
            target,
            submitter: None,
            default_prevented: false,
        }
    }
}

/// What the host must do with the native default action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// Prevent it; the router handles the event.
    Intercepted,
    /// Let it proceed.
    Ignored,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ClickAction {
    Navigate(Url),
    SameUrl,
    Ignore,
}

fn nearest_anchor(page: &PageState, target: Id) -> Option<&Node> {
    closest(&page.dom, target, |n| n.is_element("a") && n.has_attr("href"))
}

fn nearest_form(page: &PageState, target: Id) -> Option<Id> {
    closest(&page.dom, target, |n| n.is_element("form")).map(Node::id)
}

/// `_blank` and named targets open another browsing context.
fn opens_new_context(target: Option<&str>) -> bool {
    match target.map(str::trim) {
        None | Some("") => false,
        Some(t) => !["_self", "_parent", "_top"]
            .iter()
            .any(|keep| t.eq_ignore_ascii_case(keep)),
    }
}

fn resolve_href(page: &PageState, anchor: &Node) -> Option<Url> {
    let href = anchor.attr("href")?;
    match page.resolve(href) {
        Ok(url) => Some(url),
        Err(err) => {
            log::warn!(target: "router.delegate", "not intercepting malformed href {href:?}: {err}");
            None
        }
    }
}

pub(crate) fn classify_click(page: &PageState, target: Id) -> ClickAction {
    let Some(anchor) = nearest_anchor(page, target) else {
        return ClickAction::Ignore;
    };
    if anchor.has_attr("download") || opens_new_context(anchor.attr("target")) {
        return ClickAction::Ignore;
    }
    let Some(url) = resolve_href(page, anchor) else {
        return ClickAction::Ignore;
    };
    if url.origin() != page.origin() {
        return ClickAction::Ignore;
    }
    if url == page.url {
        return ClickAction::SameUrl;
    }
    ClickAction::Navigate(url)
}

/// Prefetch candidate for a hover/focus on `target`: an anchor whose `rel` carries `token`.
pub(crate) fn prefetch_target(page: &PageState, target: Id, token: &str) -> Option<Url> {
    let anchor = nearest_anchor(page, target)?;
    let marked = anchor
        .attr("rel")
        .is_some_and(|rel| rel.split_ascii_whitespace().any(|t| t.eq_ignore_ascii_case(token)));
    if !marked {
        return None;
    }
    resolve_href(page, anchor)
}

impl Router {
    /// Entry point for every UI event. Never fails: anything the router cannot handle is
    /// left to the native behaviour.
    pub fn dispatch(&mut self, event: &UiEvent) -> Dispatch {
        if !self.is_active() {
            return Dispatch::Ignored;
        }
        match event {
            UiEvent::Click {
                default_prevented: true,
                ..
            }
            | UiEvent::Submit {
                default_prevented: true,
                ..
            } => Dispatch::Ignored,

            UiEvent::Click {
                target,
                button,
                modifiers,
                ..
            } => {
                // Modified and non-primary clicks open new tabs/windows natively.
                if *button != MouseButton::Primary || modifiers.any() {
                    return Dispatch::Ignored;
                }
                match classify_click(self.page(), *target) {
                    ClickAction::Navigate(url) => {
                        self.push_location(url);
                        Dispatch::Intercepted
                    }
                    ClickAction::SameUrl => {
                        log::trace!(target: "router.delegate", "same-url click ignored");
                        Dispatch::Intercepted
                    }
                    ClickAction::Ignore => Dispatch::Ignored,
                }
            }

            UiEvent::Submit {
                target, submitter, ..
            } => {
                let Some(form) = nearest_form(self.page(), *target) else {
                    return Dispatch::Ignored;
                };
                match self.submit_form(form, *submitter) {
                    Ok(_) => Dispatch::Intercepted,
                    Err(err) => {
                        log::warn!(target: "router.delegate", "not intercepting submit: {err}");
                        Dispatch::Ignored
                    }
                }
            }

            UiEvent::MouseEnter { target } | UiEvent::Focus { target } => {
                if self.config().prefetch.enabled {
                    let token = self.config().prefetch.rel.clone();
                    if let Some(url) = prefetch_target(self.page(), *target, &token) {
                        self.prefetch(&url);
                    }
                }
                Dispatch::Ignored
            }
        }
    }
}
