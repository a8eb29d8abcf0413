//! Opacity commands.
//!
//! Turns a (selector, opacity) pair into a command such as
//! `[con_id="42"] opacity set 0.70` and submits it. A command that matches no
//! window is not an error: the target usually closed between the event and
//! the command.

use std::fmt;
use std::io;

use crate::ipc::WindowManager;

/// Opacity of the focused window
pub const FULL_OPACITY: f64 = 1.0;

/// Default opacity of every other window
pub const DEFAULT_DIM_OPACITY: f64 = 0.7;

/// Which windows a command applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    /// Every window (any title)
    AllWindows,
    /// A single container by id
    Container(i64),
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::AllWindows => write!(f, "title=\".*\""),
            Selector::Container(id) => write!(f, "con_id=\"{}\"", id),
        }
    }
}

/// How the window manager received an opacity command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Applied,
    /// Executed but reported unsuccessful, typically because nothing matched
    Unmatched,
}

/// Build the command string for a selector and opacity
pub fn opacity_command(selector: Selector, opacity: f64) -> String {
    format!("[{}] opacity set {:.2}", selector, opacity.clamp(0.0, 1.0))
}

/// Submit an opacity command.
///
/// Only transport and protocol failures are returned as errors.
pub fn set_opacity(
    wm: &mut impl WindowManager,
    selector: Selector,
    opacity: f64,
) -> io::Result<CommandStatus> {
    let command = opacity_command(selector, opacity);
    let outcomes = wm.run_command(&command)?;

    if outcomes.iter().all(|outcome| outcome.success) {
        log::debug!("Result of {:?}: applied", command);
        return Ok(CommandStatus::Applied);
    }

    for outcome in outcomes.iter().filter(|outcome| !outcome.success) {
        let error = outcome.error.as_deref().unwrap_or("unsuccessful");
        if outcome.parse_error {
            log::warn!("Window manager could not parse {:?}: {}", command, error);
        } else {
            log::debug!("Result of {:?}: {}", command, error);
        }
    }
    Ok(CommandStatus::Unmatched)
}

/// [`set_opacity`] for the steady state: transport failures are logged and
/// swallowed.
pub fn apply_opacity(wm: &mut impl WindowManager, selector: Selector, opacity: f64) {
    if let Err(e) = set_opacity(wm, selector, opacity) {
        log::warn!(
            "Failed to run {:?}: {}",
            opacity_command(selector, opacity),
            e
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{root, window, workspace, FakeWm};

    #[test]
    fn test_opacity_command() {
        assert_eq!(
            opacity_command(Selector::AllWindows, DEFAULT_DIM_OPACITY),
            "[title=\".*\"] opacity set 0.70"
        );
        assert_eq!(
            opacity_command(Selector::Container(42), FULL_OPACITY),
            "[con_id=\"42\"] opacity set 1.00"
        );
        assert_eq!(
            opacity_command(Selector::Container(7), 0.333),
            "[con_id=\"7\"] opacity set 0.33"
        );
    }

    #[test]
    fn test_opacity_command_clamps() {
        assert_eq!(
            opacity_command(Selector::Container(1), 1.5),
            "[con_id=\"1\"] opacity set 1.00"
        );
        assert_eq!(
            opacity_command(Selector::Container(1), -0.2),
            "[con_id=\"1\"] opacity set 0.00"
        );
    }

    #[test]
    fn test_set_opacity_applied() {
        let mut wm = FakeWm::new(root(vec![workspace(10, "1", vec![window(11, "foot")])]));
        let status = set_opacity(&mut wm, Selector::Container(11), 0.7).unwrap();
        assert_eq!(status, CommandStatus::Applied);
        assert_eq!(wm.commands(), vec!["[con_id=\"11\"] opacity set 0.70"]);
    }

    #[test]
    fn test_set_opacity_no_match_is_not_an_error() {
        let mut wm = FakeWm::new(root(vec![workspace(10, "1", vec![window(11, "foot")])]));
        let status = set_opacity(&mut wm, Selector::Container(99), FULL_OPACITY).unwrap();
        assert_eq!(status, CommandStatus::Unmatched);
    }

    #[test]
    fn test_set_opacity_transport_failure() {
        let mut wm = FakeWm::new(root(vec![]));
        wm.fail_commands = true;
        assert!(set_opacity(&mut wm, Selector::AllWindows, 0.7).is_err());
    }

    #[test]
    fn test_apply_opacity_swallows_failures() {
        let mut wm = FakeWm::new(root(vec![]));
        wm.fail_commands = true;
        apply_opacity(&mut wm, Selector::Container(3), 0.7);
        wm.fail_commands = false;
        apply_opacity(&mut wm, Selector::Container(3), 0.7);
        assert_eq!(
            wm.commands(),
            vec![
                "[con_id=\"3\"] opacity set 0.70",
                "[con_id=\"3\"] opacity set 0.70",
            ]
        );
    }
}
