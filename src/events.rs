//! Window manager event subscription.
//!
//! [`EventStream`] owns a dedicated connection subscribed to window and
//! shutdown events. Reads use a short timeout so the caller can check for
//! cancellation between events; partial frames survive across polls.

use std::io::{self, Read};
use std::os::unix::net::UnixStream;
use std::time::Duration;

use serde::Deserialize;

use crate::ipc::{
    decode_json, FrameBuffer, IpcConnection, MessageType, EVENT_SHUTDOWN, EVENT_WINDOW,
};
use crate::tree::Node;

/// Events dimfocus subscribes to
pub const SUBSCRIBED_EVENTS: &[&str] = &["window", "shutdown"];

/// The `change` field of a window event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowChange {
    New,
    Close,
    Focus,
    Title,
    FullscreenMode,
    Move,
    Floating,
    Urgent,
    Mark,
    #[serde(other)]
    Other,
}

/// A window event; `container` is a full snapshot of the affected node
#[derive(Debug, Clone, Deserialize)]
pub struct WindowEvent {
    pub change: WindowChange,
    pub container: Node,
}

/// The window manager is exiting (`exit`) or restarting (`restart`)
#[derive(Debug, Clone, Deserialize)]
pub struct ShutdownEvent {
    pub change: String,
}

#[derive(Debug, Clone)]
pub enum WmEvent {
    Window(WindowEvent),
    Shutdown(ShutdownEvent),
    /// Any other event type; carries the raw type for logging
    Other(u32),
}

/// Result of one poll of an event source
#[derive(Debug)]
pub enum Poll {
    Event(WmEvent),
    /// Nothing arrived before the poll interval elapsed
    Idle,
    /// The window manager closed the stream
    Closed,
}

/// Sequential source of window manager events
pub trait EventSource {
    /// Wait at most one poll interval for the next event
    fn poll_event(&mut self) -> io::Result<Poll>;
}

/// Decode an event frame
pub fn decode_event(kind: u32, payload: &[u8]) -> io::Result<WmEvent> {
    match kind {
        EVENT_WINDOW => Ok(WmEvent::Window(decode_json(payload)?)),
        EVENT_SHUTDOWN => Ok(WmEvent::Shutdown(decode_json(payload)?)),
        other => Ok(WmEvent::Other(other)),
    }
}

#[derive(Deserialize)]
struct SubscribeReply {
    success: bool,
}

/// Subscribed event connection
pub struct EventStream {
    stream: UnixStream,
    frames: FrameBuffer,
}

impl EventStream {
    /// Subscribe `conn` to `events` and turn it into an event stream.
    ///
    /// `poll_interval` bounds how long [`EventSource::poll_event`] blocks.
    pub fn subscribe(
        mut conn: IpcConnection,
        events: &[&str],
        poll_interval: Duration,
    ) -> io::Result<Self> {
        let payload = serde_json::to_vec(events)?;
        let reply: SubscribeReply = decode_json(&conn.request(MessageType::Subscribe, &payload)?)?;
        if !reply.success {
            return Err(io::Error::other(format!(
                "window manager refused subscription to {:?}",
                events
            )));
        }
        log::info!("Subscribed to {:?} events", events);
        Self::from_stream(conn.into_stream(), poll_interval)
    }

    /// Wrap a stream that is already subscribed
    pub fn from_stream(stream: UnixStream, poll_interval: Duration) -> io::Result<Self> {
        stream.set_read_timeout(Some(poll_interval))?;
        Ok(Self {
            stream,
            frames: FrameBuffer::new(),
        })
    }
}

impl EventSource for EventStream {
    fn poll_event(&mut self) -> io::Result<Poll> {
        let mut chunk = [0u8; 4096];
        loop {
            if let Some((kind, payload)) = self.frames.next_frame()? {
                match decode_event(kind, &payload) {
                    Ok(event) => return Ok(Poll::Event(event)),
                    Err(e) => {
                        log::warn!("Dropping undecodable event of type {:#x}: {}", kind, e);
                        continue;
                    }
                }
            }

            match self.stream.read(&mut chunk) {
                Ok(0) => return Ok(Poll::Closed),
                Ok(n) => self.frames.extend(&chunk[..n]),
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::WouldBlock
                            | io::ErrorKind::TimedOut
                            | io::ErrorKind::Interrupted
                    ) =>
                {
                    return Ok(Poll::Idle)
                }
                Err(e) => return Err(e),
            }
        }
    }
}
