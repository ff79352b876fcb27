use crate::{Id, Node};

/// Assigns ids to every node still at `Id::UNASSIGNED`, drawing from `next`.
///
/// Nodes that already carry an id keep it, so a live document can be re-walked after a
/// patch and only the freshly inserted nodes receive new ids.
pub fn assign_node_ids(root: &mut Node, next: &mut u32) {
    fn walk(node: &mut Node, next: &mut u32) {
        if node.id() == Id::UNASSIGNED {
            node.set_id(Id(*next));
            *next = next.wrapping_add(1).max(1);
        }
        if let Some(children) = node.children_mut() {
            for c in children {
                walk(c, next);
            }
        }
    }
    walk(root, next);
}

/// Resets every id in the subtree to `Id::UNASSIGNED`.
pub fn clear_node_ids(node: &mut Node) {
    node.set_id(Id::UNASSIGNED);
    if let Some(children) = node.children_mut() {
        for c in children {
            clear_node_ids(c);
        }
    }
}

pub fn find_node_by_id(node: &Node, id: Id) -> Option<&Node> {
    if node.id() == id {
        return Some(node);
    }
    node.children()
        .iter()
        .find_map(|c| find_node_by_id(c, id))
}

/// The event dispatch path for `target`: the target itself first, then each ancestor up
/// to and including `root`. Empty when `target` is not in the tree.
pub fn composed_path(root: &Node, target: Id) -> Vec<&Node> {
    fn walk<'a>(node: &'a Node, target: Id, path: &mut Vec<&'a Node>) -> bool {
        path.push(node);
        if node.id() == target {
            return true;
        }
        for c in node.children() {
            if walk(c, target, path) {
                return true;
            }
        }
        path.pop();
        false
    }

    let mut path = Vec::new();
    if target == Id::UNASSIGNED || !walk(root, target, &mut path) {
        return Vec::new();
    }
    path.reverse();
    path
}

/// Nearest node on the dispatch path of `target` that satisfies `pred`.
pub fn closest<'a>(root: &'a Node, target: Id, pred: impl Fn(&Node) -> bool) -> Option<&'a Node> {
    composed_path(root, target).into_iter().find(|n| pred(n))
}

/// Detaches the node with `id` from the tree and returns it.
pub fn remove_node(root: &mut Node, id: Id) -> Option<Node> {
    let children = root.children_mut()?;
    if let Some(pos) = children.iter().position(|c| c.id() == id) {
        return Some(children.remove(pos));
    }
    children.iter_mut().find_map(|c| remove_node(c, id))
}

/// Collects ids of all elements named `tag`, in tree order.
pub fn collect_element_ids(node: &Node, tag: &str, out: &mut Vec<Id>) {
    if node.is_element(tag) {
        out.push(node.id());
    }
    for c in node.children() {
        collect_element_ids(c, tag, out);
    }
}

fn html_element(dom: &Node) -> Option<&Node> {
    match dom {
        Node::Document { children, .. } => children.iter().find(|c| c.is_element("html")),
        _ => None,
    }
}

fn html_element_mut(dom: &mut Node) -> Option<&mut Node> {
    match dom {
        Node::Document { children, .. } => children.iter_mut().find(|c| c.is_element("html")),
        _ => None,
    }
}

pub fn find_head(dom: &Node) -> Option<&Node> {
    html_element(dom)?
        .children()
        .iter()
        .find(|c| c.is_element("head"))
}

pub fn find_body(dom: &Node) -> Option<&Node> {
    html_element(dom)?
        .children()
        .iter()
        .find(|c| c.is_element("body"))
}

pub fn find_head_mut(dom: &mut Node) -> Option<&mut Node> {
    html_element_mut(dom)?
        .children_mut()?
        .iter_mut()
        .find(|c| c.is_element("head"))
}

pub fn find_body_mut(dom: &mut Node) -> Option<&mut Node> {
    html_element_mut(dom)?
        .children_mut()?
        .iter_mut()
        .find(|c| c.is_element("body"))
}
