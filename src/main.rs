//! dimfocus - dim every window except the focused one
//!
//! Listens to focus events from sway (or i3) over the IPC socket and sets
//! window opacity: the focused window is fully opaque, the window that lost
//! focus on the same workspace is dimmed. All windows are restored to full
//! opacity on exit.

mod config;
mod discovery;
mod events;
mod focus;
mod ipc;
mod opacity;
mod session;
#[cfg(test)]
mod testing;
mod tree;

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use signal_hook::consts::{SIGHUP, TERM_SIGNALS};

use config::{Backend, Config};
use events::{EventStream, SUBSCRIBED_EVENTS};
use ipc::IpcConnection;
use session::Session;

/// Dim unfocused windows on sway and i3
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (default: ~/.config/dimfocus/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Opacity of unfocused windows, 0.0 to 1.0
    #[arg(long, value_name = "OPACITY")]
    dim: Option<f64>,

    /// Window manager to connect to
    #[arg(long, value_enum)]
    backend: Option<Backend>,

    /// IPC socket path, bypassing discovery
    #[arg(long)]
    socket: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    /// Apply command-line overrides on top of the file config
    fn apply(&self, config: &mut Config) {
        if let Some(dim) = self.dim {
            config.opacity.dimmed = dim;
        }
        if let Some(backend) = self.backend {
            config.ipc.backend = backend;
        }
        if let Some(socket) = &self.socket {
            config.ipc.socket = Some(socket.clone());
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(args.log_level.as_str())
    ).init();

    log::info!("Starting dimfocus v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &args.config {
        Some(path) => Config::load_from_path(path.clone()),
        None => Config::load(),
    };
    args.apply(&mut config);
    config.validate()?;

    if !config.ipc.backend.supports_opacity() {
        log::warn!(
            "Stock {:?} has no opacity command; expect every command to be rejected \
             unless this window manager adds one",
            config.ipc.backend
        );
    }

    let discovery = config.discovery();
    if !discovery.is_running() {
        bail!("{} does not appear to be running", discovery.name());
    }
    let socket = discovery
        .resolve_endpoint()
        .with_context(|| format!("Failed to find the IPC socket of {}", discovery.name()))?;
    log::info!("Using IPC socket {:?}", socket);

    // SIGHUP arrives when the launching terminal closes; it must restore too.
    // A second signal while cleanup is stuck terminates immediately.
    let shutdown = Arc::new(AtomicBool::new(false));
    for &signal in TERM_SIGNALS.iter().chain(&[SIGHUP]) {
        signal_hook::flag::register_conditional_shutdown(signal, 1, Arc::clone(&shutdown))
            .context("Failed to register signal handler")?;
        signal_hook::flag::register(signal, Arc::clone(&shutdown))
            .context("Failed to register signal handler")?;
    }

    // Subscribe before the initial snapshot so no focus change falls in between
    let mut events = EventStream::subscribe(
        IpcConnection::connect(&socket)?,
        SUBSCRIBED_EVENTS,
        config.poll_interval(),
    )
    .context("Failed to subscribe to window events")?;

    let commands = IpcConnection::connect(&socket)?;
    let mut session = Session::start(commands, config.opacity.dimmed)
        .context("Failed to get focused window and workspace")?;

    let result = session.run(&mut events, &shutdown);
    drop(session);
    result.context("Lost the window manager event stream")?;

    log::info!("Exiting dimfocus");
    Ok(())
}
