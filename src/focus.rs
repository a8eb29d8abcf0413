//! Focus tracking state machine.
//!
//! ```text
//!                 startup snapshot
//!                        │
//!          ┌─────────────┴──────────────┐
//!          │ nothing focused            │ F focused on W
//!          ▼                            ▼
//!   ┌─────────────┐  focus(X)    ┌──────────────────┐
//!   │  Untracked  │─────────────►│ Tracking { X, W }│◄──┐
//!   └─────────────┘              └────────┬─────────┘   │
//!                                         │ focus(Y≠X)  │
//!                                         └─────────────┘
//! ```
//!
//! On every focus change to a new window, the window is brightened first,
//! then its workspace is resolved. The previously focused window is dimmed
//! only if it sits on the same workspace; a window left behind on another
//! workspace keeps its opacity until it is focused and left again.
//!
//! Known limitation: there is no reconciliation pass. If focus moves to
//! another workspace by a path that never brings dimfocus a focus event for
//! the window left there (e.g. a `swaymsg` focus command issued from
//! elsewhere), that window can stay fully opaque until it is focused again or
//! closes.

use crate::events::{WindowChange, WindowEvent};
use crate::ipc::WindowManager;
use crate::opacity::{apply_opacity, Selector, FULL_OPACITY};
use crate::tree::{self, ContainerRef};

/// The window dimfocus last brightened and the workspace it was on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedFocus {
    pub window: ContainerRef,
    pub workspace: ContainerRef,
}

/// What handling an event did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Not a focus change
    Ignored,
    /// Focus re-asserted on the tracked window
    Reasserted,
    /// Tree query failed; state kept
    QueryFailed,
    /// Focused container is already gone from the tree; state kept
    WorkspaceUnavailable,
    /// Focus moved; `dimmed` is the previous window if it was dimmed
    Moved { window: i64, dimmed: Option<i64> },
}

/// Owns the tracked focus and drives opacity commands from focus events
#[derive(Debug)]
pub struct FocusTracker {
    dim_opacity: f64,
    current: Option<TrackedFocus>,
}

impl FocusTracker {
    pub fn new(dim_opacity: f64) -> Self {
        Self {
            dim_opacity,
            current: None,
        }
    }

    pub fn current(&self) -> Option<&TrackedFocus> {
        self.current.as_ref()
    }

    /// Record `window` on `workspace` as the tracked focus
    pub fn track(&mut self, window: ContainerRef, workspace: ContainerRef) {
        self.current = Some(TrackedFocus { window, workspace });
    }

    /// Process one window event
    pub fn handle_event(&mut self, event: &WindowEvent, wm: &mut impl WindowManager) -> Transition {
        let container = ContainerRef::from(&event.container);
        log::info!("Got window event: {:?} {}", event.change, container);

        if event.change != WindowChange::Focus {
            return Transition::Ignored;
        }

        if let Some(current) = &self.current {
            if current.window.id == container.id {
                log::debug!("Focus re-asserted on {}", container);
                return Transition::Reasserted;
            }
        }

        // Brighten before any bookkeeping so the new window never sits dim
        apply_opacity(wm, Selector::Container(container.id), FULL_OPACITY);

        let workspace = match tree::workspace_of(wm, container.id) {
            Ok(Some(workspace)) => workspace,
            Ok(None) => {
                log::info!("Window {} vanished before its workspace was resolved", container);
                return Transition::WorkspaceUnavailable;
            }
            Err(e) => {
                log::warn!("Failed to get workspace of window {}: {}", container, e);
                return Transition::QueryFailed;
            }
        };

        let mut dimmed = None;
        if let Some(previous) = &self.current {
            if previous.workspace.id == workspace.id {
                apply_opacity(wm, Selector::Container(previous.window.id), self.dim_opacity);
                dimmed = Some(previous.window.id);
            } else {
                log::debug!(
                    "Workspace changed from {} to {}, leaving {} as is",
                    previous.workspace,
                    workspace,
                    previous.window
                );
            }
        }

        let window = container.id;
        self.track(container, workspace);
        Transition::Moved { window, dimmed }
    }
}
