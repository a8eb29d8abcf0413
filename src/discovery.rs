//! Locating the window manager's IPC socket.
//!
//! sway and i3 both export their socket path in an environment variable and
//! can print it with `--get-socketpath`. Other compatible window managers can
//! plug in their own [`Discovery`].

use std::io;
use std::path::PathBuf;
use std::process::Command;

/// Finds the control socket of a running window manager
pub trait Discovery {
    /// Human-readable name for log and error messages
    fn name(&self) -> &str;

    /// Path of the control socket
    fn resolve_endpoint(&self) -> io::Result<PathBuf>;

    /// Whether the window manager appears to be running
    fn is_running(&self) -> bool;
}

/// Discovery through an environment variable with a command-line fallback
#[derive(Debug, Clone)]
pub struct CommandDiscovery {
    program: String,
    socket_env: String,
}

impl CommandDiscovery {
    pub fn new(program: impl Into<String>, socket_env: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            socket_env: socket_env.into(),
        }
    }

    pub fn sway() -> Self {
        Self::new("sway", "SWAYSOCK")
    }

    pub fn i3() -> Self {
        Self::new("i3", "I3SOCK")
    }
}

impl Discovery for CommandDiscovery {
    fn name(&self) -> &str {
        &self.program
    }

    fn resolve_endpoint(&self) -> io::Result<PathBuf> {
        if let Some(path) = std::env::var_os(&self.socket_env).filter(|p| !p.is_empty()) {
            log::debug!("Using socket from ${}", self.socket_env);
            return Ok(PathBuf::from(path));
        }

        let output = Command::new(&self.program)
            .arg("--get-socketpath")
            .output()
            .map_err(|e| {
                io::Error::new(
                    e.kind(),
                    format!("failed to run `{} --get-socketpath`: {}", self.program, e),
                )
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let path = stdout.trim();
        if !output.status.success() || path.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!(
                    "`{} --get-socketpath` returned no socket ({}): {}",
                    self.program,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }
        Ok(PathBuf::from(path))
    }

    fn is_running(&self) -> bool {
        match Command::new("pgrep").args(["-x", self.program.as_str()]).output() {
            Ok(output) => output.status.success(),
            Err(e) => {
                // Without pgrep we cannot tell; let the connection attempt decide
                log::warn!("Could not check whether {} is running: {}", self.program, e);
                true
            }
        }
    }
}

/// A socket path given explicitly by the user
#[derive(Debug, Clone)]
pub struct FixedEndpoint {
    path: PathBuf,
    label: String,
}

impl FixedEndpoint {
    pub fn new(path: PathBuf) -> Self {
        let label = path.display().to_string();
        Self { path, label }
    }
}

impl Discovery for FixedEndpoint {
    fn name(&self) -> &str {
        &self.label
    }

    fn resolve_endpoint(&self) -> io::Result<PathBuf> {
        Ok(self.path.clone())
    }

    fn is_running(&self) -> bool {
        self.path.exists()
    }
}
