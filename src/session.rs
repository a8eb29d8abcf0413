//! Startup, event loop and cleanup.
//!
//! A [`Session`] exists exactly while windows are dimmed. Starting one dims
//! every window and brightens the focused one; dropping it puts every window
//! back to full opacity, whether the loop ended normally, on a signal, on a
//! transport error or by panic.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::events::{EventSource, Poll, WmEvent};
use crate::focus::{FocusTracker, Transition};
use crate::ipc::WindowManager;
use crate::opacity::{apply_opacity, Selector, FULL_OPACITY};
use crate::tree;

pub struct Session<W: WindowManager> {
    wm: W,
    tracker: FocusTracker,
}

impl<W: WindowManager> Session<W> {
    /// Query the current focus, dim everything and brighten the focused window.
    ///
    /// Fails only if the initial tree query fails; nothing has been dimmed then.
    pub fn start(mut wm: W, dim_opacity: f64) -> io::Result<Self> {
        let (focused, workspace) = tree::focused_with_workspace(&mut wm)?;

        let mut session = Self {
            wm,
            tracker: FocusTracker::new(dim_opacity),
        };

        apply_opacity(&mut session.wm, Selector::AllWindows, dim_opacity);

        match focused {
            Some(window) => {
                apply_opacity(&mut session.wm, Selector::Container(window.id), FULL_OPACITY);
                match workspace {
                    Some(workspace) => {
                        log::info!("Initial focus: {} on workspace {}", window, workspace);
                        session.tracker.track(window, workspace);
                    }
                    None => log::warn!("Initial focus {} is not on any workspace", window),
                }
            }
            None => log::info!("No window focused at startup"),
        }

        Ok(session)
    }

    #[cfg(test)]
    pub fn tracker(&self) -> &FocusTracker {
        &self.tracker
    }

    /// Handle events until the stream closes, the window manager shuts down or
    /// `shutdown` is set. The flag is checked between events.
    ///
    /// Only a transport error on the event stream itself is returned; failures
    /// while handling a single event are logged and the loop goes on.
    pub fn run(&mut self, events: &mut impl EventSource, shutdown: &AtomicBool) -> io::Result<()> {
        log::info!("Entering event loop");

        while !shutdown.load(Ordering::Relaxed) {
            match events.poll_event()? {
                Poll::Event(WmEvent::Window(event)) => {
                    match self.tracker.handle_event(&event, &mut self.wm) {
                        Transition::Moved { window, dimmed: Some(previous) } => {
                            log::debug!("Focus moved to {}, dimmed {}", window, previous)
                        }
                        Transition::Moved { window, dimmed: None } => {
                            log::debug!("Focus moved to {}", window)
                        }
                        _ => {}
                    }
                }
                Poll::Event(WmEvent::Shutdown(event)) => {
                    log::info!("Window manager is shutting down ({})", event.change);
                    return Ok(());
                }
                Poll::Event(WmEvent::Other(kind)) => {
                    log::info!("Unrecognized event type: {:#x}", kind);
                }
                Poll::Idle => {}
                Poll::Closed => {
                    log::info!("Event stream closed by the window manager");
                    return Ok(());
                }
            }
        }

        log::info!("Shutdown requested");
        Ok(())
    }
}

impl<W: WindowManager> Drop for Session<W> {
    fn drop(&mut self) {
        if let Some(focus) = self.tracker.current() {
            log::debug!("Last focus: {} on workspace {}", focus.window, focus.workspace);
        }
        log::info!("Restoring full opacity on all windows");
        apply_opacity(&mut self.wm, Selector::AllWindows, FULL_OPACITY);
    }
}
