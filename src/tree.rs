//! Container tree snapshots and the queries dimfocus runs against them.
//!
//! The window manager reports its whole layout as a tree of nodes: root,
//! outputs, workspaces, split containers and windows. dimfocus never keeps a
//! tree around; it fetches a fresh snapshot, answers one question and drops it.

use std::fmt;
use std::io;

use serde::Deserialize;

use crate::ipc::WindowManager;

/// Node kinds reported in the `type` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Root,
    Output,
    Workspace,
    Con,
    FloatingCon,
    Dockarea,
    #[serde(other)]
    Unknown,
}

/// A node of the container tree as returned by `GET_TREE` and carried in
/// window events.
#[derive(Debug, Clone, Deserialize)]
pub struct Node {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Only meaningful in a freshly fetched snapshot
    #[serde(default)]
    pub focused: bool,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub floating_nodes: Vec<Node>,
}

/// Lightweight handle to a container, kept after the snapshot is gone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRef {
    pub id: i64,
    pub name: Option<String>,
}

impl From<&Node> for ContainerRef {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id,
            name: node.name.clone(),
        }
    }
}

impl fmt::Display for ContainerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} ({:?})", self.id, name),
            None => write!(f, "{}", self.id),
        }
    }
}

/// Depth-first search that carries the nearest enclosing workspace along.
/// A workspace counts as its own enclosing workspace.
fn find_with_workspace<'a, F>(
    node: &'a Node,
    workspace: Option<&'a Node>,
    predicate: &F,
) -> Option<(&'a Node, Option<&'a Node>)>
where
    F: Fn(&Node) -> bool,
{
    let workspace = if node.node_type == NodeType::Workspace {
        Some(node)
    } else {
        workspace
    };

    if predicate(node) {
        return Some((node, workspace));
    }

    node.nodes
        .iter()
        .chain(node.floating_nodes.iter())
        .find_map(|child| find_with_workspace(child, workspace, predicate))
}

/// Find the focused node and the workspace containing it.
///
/// Returns `(None, None)` when nothing in the tree is focused.
pub fn find_focused(root: &Node) -> (Option<&Node>, Option<&Node>) {
    match find_with_workspace(root, None, &|node: &Node| node.focused) {
        Some((node, workspace)) => (Some(node), workspace),
        None => (None, None),
    }
}

/// Find the workspace owning the container with `id`.
///
/// `None` means the container is no longer in the tree (usually the window
/// closed after the event was emitted).
pub fn find_workspace_of(root: &Node, id: i64) -> Option<&Node> {
    find_with_workspace(root, None, &|node: &Node| node.id == id).and_then(|(_, workspace)| workspace)
}

/// Fetch a snapshot and report the focused container with its workspace
pub fn focused_with_workspace(
    wm: &mut impl WindowManager,
) -> io::Result<(Option<ContainerRef>, Option<ContainerRef>)> {
    let tree = wm.get_tree()?;
    let (focused, workspace) = find_focused(&tree);
    Ok((focused.map(ContainerRef::from), workspace.map(ContainerRef::from)))
}

/// Fetch a snapshot and report the workspace owning container `id`
pub fn workspace_of(wm: &mut impl WindowManager, id: i64) -> io::Result<Option<ContainerRef>> {
    let tree = wm.get_tree()?;
    Ok(find_workspace_of(&tree, id).map(ContainerRef::from))
}
