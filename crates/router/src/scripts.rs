//! Script replay after a patch.
//!
//! Patching a `<script>` in place never runs it, so after every patch each script that has
//! not run yet is rebuilt as a fresh element at the end of `<body>` and handed to the
//! executor. External scripts run at most once per router; inline scripts run on every
//! patch that leaves them in the document.

use std::collections::HashSet;

use html::traverse::{collect_element_ids, find_body_mut, remove_node};
use html::{Attribute, Id, Node};

use crate::page::PageState;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptElement {
    /// Absolute source URL, when the script is external.
    pub src: Option<String>,
    pub script_type: Option<String>,
    pub is_async: bool,
    pub defer: bool,
    pub text: String,
}

impl ScriptElement {
    fn from_node(node: &Node, page: &PageState) -> Self {
        let src = node
            .attr("src")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|raw| match page.resolve(raw) {
                Ok(url) => url.to_string(),
                Err(err) => {
                    log::warn!(target: "router.scripts", "keeping unresolvable src {raw:?}: {err}");
                    raw.to_string()
                }
            });
        Self {
            src,
            script_type: node.attr("type").map(str::to_string),
            is_async: node.has_attr("async"),
            defer: node.has_attr("defer"),
            text: node.text_content(),
        }
    }

    fn to_node(&self) -> Node {
        let mut attributes: Vec<Attribute> = Vec::new();
        if let Some(t) = &self.script_type {
            attributes.push(("type".into(), Some(t.clone())));
        }
        if let Some(src) = &self.src {
            attributes.push(("src".into(), Some(src.clone())));
        }
        if self.is_async {
            attributes.push(("async".into(), None));
        }
        if self.defer {
            attributes.push(("defer".into(), None));
        }
        let children = if self.text.is_empty() {
            Vec::new()
        } else {
            vec![Node::text(self.text.clone())]
        };
        Node::element("script", attributes, children)
    }
}

/// Runs a freshly inserted script. The host decides what "running" means.
pub trait ScriptExecutor {
    fn execute(&mut self, script: &ScriptElement);
}

/// Records executions in the log only.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingExecutor;

impl ScriptExecutor for LoggingExecutor {
    fn execute(&mut self, script: &ScriptElement) {
        match &script.src {
            Some(src) => log::info!(target: "router.scripts", "execute {src}"),
            None => log::info!(
                target: "router.scripts",
                "execute inline script ({} bytes)",
                script.text.len()
            ),
        }
    }
}

#[derive(Debug, Default)]
pub struct ScriptReplayer {
    executed: HashSet<String>,
}

impl ScriptReplayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks every external script already in `page` as executed.
    pub fn seed(&mut self, page: &PageState) {
        let mut ids = Vec::new();
        collect_element_ids(&page.dom, "script", &mut ids);
        for id in ids {
            if let Some(src) = page.node(id).and_then(|n| ScriptElement::from_node(n, page).src) {
                self.executed.insert(src);
            }
        }
        log::trace!(target: "router.scripts", "seeded {} external scripts", self.executed.len());
    }

    pub fn has_executed(&self, src: &str) -> bool {
        self.executed.contains(src)
    }

    pub fn executed_count(&self) -> usize {
        self.executed.len()
    }

    /// Re-inserts every script of `page` that has not run yet. Returns how many were
    /// handed to `executor`.
    pub fn replay(&mut self, page: &mut PageState, executor: &mut dyn ScriptExecutor) -> usize {
        // Snapshot first: the loop appends scripts that must not be visited again.
        let mut ids: Vec<Id> = Vec::new();
        collect_element_ids(&page.dom, "script", &mut ids);

        let mut replayed = 0;
        for id in ids {
            let Some(script) = page.node(id).map(|n| ScriptElement::from_node(n, page)) else {
                continue;
            };
            if let Some(src) = &script.src {
                if self.executed.contains(src) {
                    continue;
                }
                self.executed.insert(src.clone());
            }

            remove_node(&mut page.dom, id);
            let Some(body) = find_body_mut(&mut page.dom).and_then(Node::children_mut) else {
                log::warn!(target: "router.scripts", "no <body> to append scripts to");
                break;
            };
            body.push(script.to_node());
            page.assign_new_ids();

            executor.execute(&script);
            replayed += 1;
        }
        if replayed > 0 {
            log::debug!(target: "router.scripts", "replayed {replayed} scripts");
        }
        replayed
    }
}
