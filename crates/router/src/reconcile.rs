use html::traverse::{find_body, find_body_mut, find_head, find_head_mut};
use html::{MorphError, MorphStats, Node, morph};
use thiserror::Error;

use crate::error::RouterError;
use crate::page::PageState;

pub type ReconcileStats = MorphStats;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Morph(#[from] MorphError),
    #[error("{0}")]
    Other(String),
}

/// Patches a live subtree in place to match a detached one. Called once for `<head>` and
/// once for `<body>`; nodes it inserts must carry `Id::UNASSIGNED`.
pub trait Reconciler {
    fn reconcile(&mut self, live: &mut Node, target: &Node) -> Result<ReconcileStats, ReconcileError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct MorphReconciler;

impl Reconciler for MorphReconciler {
    fn reconcile(&mut self, live: &mut Node, target: &Node) -> Result<ReconcileStats, ReconcileError> {
        Ok(morph(live, target)?)
    }
}

fn add(total: &mut ReconcileStats, part: ReconcileStats) {
    total.inserted += part.inserted;
    total.removed += part.removed;
    total.updated += part.updated;
    total.moved += part.moved;
}

/// Applies `target`'s head and body onto the live page. A failed head patch is not rolled
/// back when the body then fails.
pub(crate) fn patch_document(
    reconciler: &mut dyn Reconciler,
    page: &mut PageState,
    target: &Node,
) -> Result<ReconcileStats, RouterError> {
    let next_head = find_head(target).ok_or(RouterError::MissingSection("head"))?;
    let next_body = find_body(target).ok_or(RouterError::MissingSection("body"))?;

    let mut stats = ReconcileStats::default();
    {
        let live_head = find_head_mut(&mut page.dom).ok_or(RouterError::MissingSection("head"))?;
        add(&mut stats, reconciler.reconcile(live_head, next_head)?);
    }
    let body_result = match find_body_mut(&mut page.dom) {
        Some(live_body) => reconciler.reconcile(live_body, next_body).map_err(RouterError::from),
        None => Err(RouterError::MissingSection("body")),
    };
    // Number whatever the head patch inserted even when the body failed.
    page.assign_new_ids();
    add(&mut stats, body_result?);
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use html::Id;
    use html::parse_document;
    use url::Url;

    fn page(markup: &str) -> PageState {
        PageState::parse(Url::parse("https://site.test/").expect("url"), markup)
    }

    struct FailingBody;

    impl Reconciler for FailingBody {
        fn reconcile(&mut self, live: &mut Node, target: &Node) -> Result<ReconcileStats, ReconcileError> {
            if live.is_element("body") {
                return Err(ReconcileError::Other("boom".into()));
            }
            MorphReconciler.reconcile(live, target)
        }
    }

    #[test]
    fn patches_head_and_body_and_numbers_new_nodes() {
        let mut live = page("<title>One</title><p>one</p>");
        let target = parse_document("<title>Two</title><p>two</p><aside>new</aside>");
        let stats = patch_document(&mut MorphReconciler, &mut live, &target).expect("patch");

        assert_eq!(live.title().as_deref(), Some("Two"));
        let body = live.body().expect("body");
        assert_eq!(body.text_content(), "twonew");
        assert_ne!(body.children()[1].id(), Id::UNASSIGNED);
        assert_eq!(stats.inserted, 1);
    }

    #[test]
    fn body_failure_keeps_partial_head_patch() {
        let mut live = page("<title>One</title><p>one</p>");
        let target = parse_document("<title>Two</title><p>two</p>");
        let err = patch_document(&mut FailingBody, &mut live, &target).unwrap_err();

        assert!(matches!(err, RouterError::Reconcile(_)), "got {err:?}");
        assert_eq!(live.title().as_deref(), Some("Two"));
        assert_eq!(live.body().expect("body").text_content(), "one");
    }

    #[test]
    fn target_without_sections_is_rejected() {
        let mut live = page("<p>one</p>");
        let target = Node::Document {
            id: Id::UNASSIGNED,
            doctype: None,
            children: Vec::new(),
        };
        let err = patch_document(&mut MorphReconciler, &mut live, &target).unwrap_err();
        assert!(matches!(err, RouterError::MissingSection("head")), "got {err:?}");
    }
}
