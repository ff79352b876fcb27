use std::fmt;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use html::Id;
use html::traverse::collect_element_ids;
use router::{Dispatch, PageState, Router, UiEvent};

/// One scripted user action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    Click(String),
    Hover(String),
    Submit(usize),
    Goto(String),
    Back,
    Forward,
}

impl FromStr for Step {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        match raw {
            "back" => return Ok(Step::Back),
            "forward" => return Ok(Step::Forward),
            _ => {}
        }
        let (verb, arg) = raw
            .split_once(':')
            .ok_or_else(|| format!("expected <verb>:<arg>, back or forward, got {raw:?}"))?;
        if arg.is_empty() {
            return Err(format!("step {verb:?} needs an argument"));
        }
        match verb {
            "click" => Ok(Step::Click(arg.to_string())),
            "hover" => Ok(Step::Hover(arg.to_string())),
            "goto" => Ok(Step::Goto(arg.to_string())),
            "submit" => arg
                .parse()
                .map(Step::Submit)
                .map_err(|e| format!("submit index {arg:?}: {e}")),
            other => Err(format!("unknown step {other:?}")),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Click(href) => write!(f, "click:{href}"),
            Step::Hover(href) => write!(f, "hover:{href}"),
            Step::Submit(n) => write!(f, "submit:{n}"),
            Step::Goto(href) => write!(f, "goto:{href}"),
            Step::Back => f.write_str("back"),
            Step::Forward => f.write_str("forward"),
        }
    }
}

/// First anchor whose `href` is `wanted` verbatim or resolves to the same URL.
fn find_anchor(page: &PageState, wanted: &str) -> Option<Id> {
    let resolved = page.resolve(wanted).ok();
    let mut anchors = Vec::new();
    collect_element_ids(&page.dom, "a", &mut anchors);
    anchors.into_iter().find(|id| {
        let Some(href) = page.node(*id).and_then(|n| n.attr("href")) else {
            return false;
        };
        href == wanted || (resolved.is_some() && page.resolve(href).ok() == resolved)
    })
}

fn nth_form(page: &PageState, n: usize) -> Option<Id> {
    let mut forms = Vec::new();
    collect_element_ids(&page.dom, "form", &mut forms);
    forms.get(n).copied()
}

pub fn apply(router: &mut Router, step: &Step) -> Result<()> {
    match step {
        Step::Click(href) => {
            let target = find_anchor(router.page(), href)
                .ok_or_else(|| anyhow!("no link to {href:?} on {}", router.page().url))?;
            if router.dispatch(&UiEvent::click(target)) == Dispatch::Ignored {
                log::warn!("click on {href:?} not intercepted; a browser would load it natively");
            }
        }
        Step::Hover(href) => {
            let target = find_anchor(router.page(), href)
                .ok_or_else(|| anyhow!("no link to {href:?} on {}", router.page().url))?;
            router.dispatch(&UiEvent::MouseEnter { target });
        }
        Step::Submit(n) => {
            let form = nth_form(router.page(), *n)
                .ok_or_else(|| anyhow!("page has no form #{n}"))?;
            if router.dispatch(&UiEvent::submit(form)) == Dispatch::Ignored {
                log::warn!("submit of form #{n} not intercepted");
            }
        }
        Step::Goto(href) => router.navigate(href)?,
        Step::Back => {
            if !router.back() {
                log::warn!("no history entry to go back to");
            }
        }
        Step::Forward => {
            if !router.forward() {
                log::warn!("no history entry to go forward to");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    #[test]
    fn parses_every_step_kind() {
        assert_eq!("click:/a".parse(), Ok(Step::Click("/a".into())));
        assert_eq!("hover:/b?x=1".parse(), Ok(Step::Hover("/b?x=1".into())));
        assert_eq!("submit:2".parse(), Ok(Step::Submit(2)));
        assert_eq!("goto:https://x.test/".parse(), Ok(Step::Goto("https://x.test/".into())));
        assert_eq!("back".parse(), Ok(Step::Back));
        assert_eq!(" forward ".parse(), Ok(Step::Forward));
    }

    #[test]
    fn rejects_malformed_steps() {
        assert!("jump:/a".parse::<Step>().is_err());
        assert!("click:".parse::<Step>().is_err());
        assert!("submit:first".parse::<Step>().is_err());
        assert!("sideways".parse::<Step>().is_err());
    }

    #[test]
    fn display_round_trips_through_parse() {
        let step = Step::Submit(1);
        assert_eq!(step.to_string().parse(), Ok(step));
    }

    #[test]
    fn anchors_match_verbatim_or_resolved() {
        let page = PageState::parse(
            Url::parse("https://site.test/docs/").expect("url"),
            "<a href=intro>i</a><a href=/docs/guide>g</a>",
        );
        let mut anchors = Vec::new();
        collect_element_ids(&page.dom, "a", &mut anchors);
        assert_eq!(find_anchor(&page, "intro"), Some(anchors[0]));
        assert_eq!(find_anchor(&page, "guide"), Some(anchors[1]));
        assert_eq!(find_anchor(&page, "/missing"), None);
    }
}
