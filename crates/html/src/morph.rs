//! In-place reconciliation of a live subtree against a freshly parsed one.
//!
//! Contract:
//! - The live root and the target root must be the same kind (same element name, or both
//!   documents); otherwise nothing is touched and `MorphError::KindMismatch` is returned.
//! - Matched live nodes keep their `Id`; inserted nodes arrive with `Id::UNASSIGNED` so the
//!   owner can number them.
//! - Elements with an `id` attribute are matched by (tag, id) anywhere later in the sibling
//!   list and moved into place; other nodes are matched positionally by kind and tag.
//! - Attribute lists are replaced wholesale when they differ; text and comments are updated
//!   in place.
//! - Unmatched trailing live nodes are removed.
//!
//! Complexity: O(n) per child list for positional matches, O(n^2) worst case when many keyed
//! siblings move.

use crate::traverse::clear_node_ids;
use crate::types::Node;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MorphError {
    #[error("cannot morph <{live}> into <{target}>")]
    KindMismatch { live: String, target: String },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MorphStats {
    pub inserted: usize,
    pub removed: usize,
    pub updated: usize,
    pub moved: usize,
}

impl MorphStats {
    pub fn is_noop(&self) -> bool {
        *self == MorphStats::default()
    }
}

fn kind_label(node: &Node) -> String {
    match node {
        Node::Document { .. } => "#document".to_string(),
        Node::Element { name, .. } => name.clone(),
        Node::Text { .. } => "#text".to_string(),
        Node::Comment { .. } => "#comment".to_string(),
    }
}

fn element_key(node: &Node) -> Option<&str> {
    match node {
        Node::Element { .. } => node.attr("id").filter(|id| !id.is_empty()),
        _ => None,
    }
}

/// Whether `live` may be morphed positionally into `target`.
fn compatible(live: &Node, target: &Node) -> bool {
    match (live, target) {
        (Node::Element { name: a, .. }, Node::Element { name: b, .. }) => {
            a == b && element_key(live).is_none() && element_key(target).is_none()
        }
        (Node::Text { .. }, Node::Text { .. }) => true,
        (Node::Comment { .. }, Node::Comment { .. }) => true,
        _ => false,
    }
}

pub fn morph(live: &mut Node, target: &Node) -> Result<MorphStats, MorphError> {
    let same_root = match (&*live, target) {
        (Node::Element { name: a, .. }, Node::Element { name: b, .. }) => a == b,
        (Node::Document { .. }, Node::Document { .. }) => true,
        _ => false,
    };
    if !same_root {
        return Err(MorphError::KindMismatch {
            live: kind_label(live),
            target: kind_label(target),
        });
    }

    let mut stats = MorphStats::default();
    morph_node(live, target, &mut stats);
    log::trace!(target: "html.morph", "morph <{}>: {stats:?}", kind_label(target));
    Ok(stats)
}

fn morph_node(live: &mut Node, target: &Node, stats: &mut MorphStats) {
    match (live, target) {
        (
            Node::Document {
                doctype, children, ..
            },
            Node::Document {
                doctype: next_doctype,
                children: next_children,
                ..
            },
        ) => {
            if doctype != next_doctype {
                doctype.clone_from(next_doctype);
                stats.updated += 1;
            }
            morph_children(children, next_children, stats);
        }
        (
            Node::Element {
                attributes,
                children,
                ..
            },
            Node::Element {
                attributes: next_attributes,
                children: next_children,
                ..
            },
        ) => {
            if attributes != next_attributes {
                attributes.clone_from(next_attributes);
                stats.updated += 1;
            }
            morph_children(children, next_children, stats);
        }
        (Node::Text { text, .. }, Node::Text {
            text: next_text, ..
        })
        | (Node::Comment { text, .. }, Node::Comment {
            text: next_text, ..
        }) => {
            if text != next_text {
                text.clone_from(next_text);
                stats.updated += 1;
            }
        }
        // Callers only pair compatible nodes.
        _ => {}
    }
}

fn fresh_copy(target: &Node) -> Node {
    let mut node = target.clone();
    clear_node_ids(&mut node);
    node
}

fn morph_children(live: &mut Vec<Node>, target: &[Node], stats: &mut MorphStats) {
    for (i, next) in target.iter().enumerate() {
        let matched = match element_key(next) {
            Some(key) => (i..live.len()).find(|&j| {
                element_key(&live[j]) == Some(key) && live[j].tag() == next.tag()
            }),
            None => (i < live.len() && compatible(&live[i], next)).then_some(i),
        };

        match matched {
            Some(j) => {
                if j != i {
                    let node = live.remove(j);
                    live.insert(i, node);
                    stats.moved += 1;
                }
                morph_node(&mut live[i], next, stats);
            }
            None => {
                live.insert(i, fresh_copy(next));
                stats.inserted += 1;
            }
        }
    }

    if live.len() > target.len() {
        stats.removed += live.len() - target.len();
        live.truncate(target.len());
    }
}
