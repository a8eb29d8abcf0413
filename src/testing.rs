//! In-memory window manager and event source for unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;

use crate::events::{EventSource, Poll, WindowChange, WindowEvent};
use crate::ipc::{CommandOutcome, WindowManager};
use crate::tree::{Node, NodeType};

fn node(id: i64, name: &str, node_type: NodeType, nodes: Vec<Node>) -> Node {
    Node {
        id,
        name: Some(name.to_string()),
        node_type,
        focused: false,
        nodes,
        floating_nodes: Vec::new(),
    }
}

pub fn window(id: i64, name: &str) -> Node {
    node(id, name, NodeType::Con, Vec::new())
}

pub fn focused_window(id: i64, name: &str) -> Node {
    Node {
        focused: true,
        ..window(id, name)
    }
}

pub fn workspace(id: i64, name: &str, windows: Vec<Node>) -> Node {
    node(id, name, NodeType::Workspace, windows)
}

/// Root with a single output holding `workspaces`
pub fn root(workspaces: Vec<Node>) -> Node {
    let output = node(2, "eDP-1", NodeType::Output, workspaces);
    node(1, "root", NodeType::Root, vec![output])
}

pub fn window_event(change: WindowChange, id: i64, name: &str) -> WindowEvent {
    WindowEvent {
        change,
        container: window(id, name),
    }
}

pub fn focus_event(id: i64, name: &str) -> WindowEvent {
    window_event(WindowChange::Focus, id, name)
}

fn contains(node: &Node, id: i64) -> bool {
    node.id == id
        || node
            .nodes
            .iter()
            .chain(node.floating_nodes.iter())
            .any(|child| contains(child, id))
}

/// Records every command; commands aimed at a container missing from `tree`
/// come back unsuccessful, like a real window manager.
pub struct FakeWm {
    pub tree: Node,
    /// Number of upcoming `get_tree` calls that fail
    pub tree_failures: usize,
    pub fail_commands: bool,
    log: Rc<RefCell<Vec<String>>>,
}

impl FakeWm {
    pub fn new(tree: Node) -> Self {
        Self {
            tree,
            tree_failures: 0,
            fail_commands: false,
            log: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn commands(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    /// Shared handle to the command log, still readable after the fake is dropped
    pub fn command_log(&self) -> Rc<RefCell<Vec<String>>> {
        Rc::clone(&self.log)
    }

    pub fn clear(&self) {
        self.log.borrow_mut().clear();
    }
}

impl WindowManager for FakeWm {
    fn get_tree(&mut self) -> io::Result<Node> {
        if self.tree_failures > 0 {
            self.tree_failures -= 1;
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "fake tree failure"));
        }
        Ok(self.tree.clone())
    }

    fn run_command(&mut self, command: &str) -> io::Result<Vec<CommandOutcome>> {
        self.log.borrow_mut().push(command.to_string());
        if self.fail_commands {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "fake command failure"));
        }

        let target = command
            .strip_prefix("[con_id=\"")
            .and_then(|rest| rest.split_once('"'))
            .and_then(|(id, _)| id.parse::<i64>().ok());
        let matched = target.map_or(true, |id| contains(&self.tree, id));

        Ok(vec![CommandOutcome {
            success: matched,
            parse_error: false,
            error: (!matched).then(|| "No matching node.".to_string()),
        }])
    }
}

/// Replays a fixed list of polls, then reports the stream closed
pub struct ScriptedEvents {
    polls: VecDeque<io::Result<Poll>>,
}

impl ScriptedEvents {
    pub fn new(polls: Vec<io::Result<Poll>>) -> Self {
        Self {
            polls: polls.into(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.polls.len()
    }
}

impl EventSource for ScriptedEvents {
    fn poll_event(&mut self) -> io::Result<Poll> {
        self.polls.pop_front().unwrap_or(Ok(Poll::Closed))
    }
}
