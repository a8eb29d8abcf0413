//! Client side of the i3/sway IPC protocol.
//!
//! Both window managers speak the same framing over a Unix socket: the magic
//! string `i3-ipc`, a 32-bit payload length and a 32-bit message type (both in
//! native byte order), followed by a JSON payload.
//!
//! Queries and commands go through [`IpcConnection`]. Event subscriptions use a
//! second connection (see `events.rs`) so that event frames never interleave
//! with command replies.

use std::io::{self, Read, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::tree::Node;

/// Magic string that starts every frame
pub const MAGIC: &[u8; 6] = b"i3-ipc";

/// Magic + payload length + message type
pub const HEADER_LEN: usize = 14;

/// Event frames carry this bit in their type field
pub const EVENT_FLAG: u32 = 0x8000_0000;

/// Window event (focus, new, close, title, ...)
pub const EVENT_WINDOW: u32 = EVENT_FLAG | 3;

/// Window manager is exiting or restarting
pub const EVENT_SHUTDOWN: u32 = EVENT_FLAG | 6;

/// Request types understood by both i3 and sway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum MessageType {
    RunCommand = 0,
    Subscribe = 2,
    GetTree = 4,
}

/// One entry of a `RUN_COMMAND` reply.
///
/// The window manager answers with one entry per command in the payload.
/// `success = false` covers both "matched no window" and genuine errors.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommandOutcome {
    pub success: bool,
    #[serde(default)]
    pub parse_error: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// The part of the window manager the focus logic talks to.
///
/// Implemented by [`IpcConnection`] for the real socket and by in-memory
/// fakes in tests.
pub trait WindowManager {
    /// Fetch a snapshot of the whole container tree
    fn get_tree(&mut self) -> io::Result<Node>;

    /// Run a command string and return the per-command outcomes
    fn run_command(&mut self, command: &str) -> io::Result<Vec<CommandOutcome>>;
}

/// Build a complete frame for a request
pub fn encode_message(kind: MessageType, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(MAGIC);
    frame.extend_from_slice(&(payload.len() as u32).to_ne_bytes());
    frame.extend_from_slice(&(kind as u32).to_ne_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// Write a request frame
pub fn write_message(writer: &mut impl Write, kind: MessageType, payload: &[u8]) -> io::Result<()> {
    writer.write_all(&encode_message(kind, payload))?;
    writer.flush()
}

/// Parse a frame header into (payload length, message type)
pub fn parse_header(header: &[u8]) -> io::Result<(u32, u32)> {
    if header.len() < HEADER_LEN || &header[..MAGIC.len()] != MAGIC {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "reply does not start with the i3-ipc magic",
        ));
    }
    Ok((ne_u32(&header[6..10]), ne_u32(&header[10..14])))
}

fn ne_u32(bytes: &[u8]) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[..4]);
    u32::from_ne_bytes(raw)
}

/// Read one complete frame, blocking until it arrives
pub fn read_message(reader: &mut impl Read) -> io::Result<(u32, Vec<u8>)> {
    let mut header = [0u8; HEADER_LEN];
    reader.read_exact(&mut header)?;
    let (len, kind) = parse_header(&header)?;
    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload)?;
    Ok((kind, payload))
}

/// Decode a JSON payload, reporting failures as `InvalidData`
pub fn decode_json<T: DeserializeOwned>(payload: &[u8]) -> io::Result<T> {
    serde_json::from_slice(payload).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Accumulates bytes from a non-blocking or timed-out reader until whole
/// frames are available.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: Vec<u8>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append freshly read bytes
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Pop the next complete frame, if one is buffered
    pub fn next_frame(&mut self) -> io::Result<Option<(u32, Vec<u8>)>> {
        if self.buf.len() < HEADER_LEN {
            return Ok(None);
        }
        let (len, kind) = parse_header(&self.buf[..HEADER_LEN])?;
        let end = HEADER_LEN + len as usize;
        if self.buf.len() < end {
            return Ok(None);
        }
        let payload = self.buf[HEADER_LEN..end].to_vec();
        self.buf.drain(..end);
        Ok(Some((kind, payload)))
    }
}

/// Blocking request/response connection to the window manager
pub struct IpcConnection {
    stream: UnixStream,
}

impl IpcConnection {
    /// Connect to the control socket at `path`
    pub fn connect(path: &Path) -> io::Result<Self> {
        let stream = UnixStream::connect(path).map_err(|e| {
            io::Error::new(
                e.kind(),
                format!("failed to connect to window manager at {:?}: {}", path, e),
            )
        })?;
        log::debug!("Connected to IPC socket {:?}", path);
        Ok(Self::from_stream(stream))
    }

    /// Wrap an already connected stream
    pub fn from_stream(stream: UnixStream) -> Self {
        Self { stream }
    }

    /// Send a request and wait for the reply of the same type
    pub fn request(&mut self, kind: MessageType, payload: &[u8]) -> io::Result<Vec<u8>> {
        write_message(&mut self.stream, kind, payload)?;
        let (reply_kind, reply) = read_message(&mut self.stream)?;
        if reply_kind != kind as u32 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "expected reply of type {}, got {:#x}",
                    kind as u32, reply_kind
                ),
            ));
        }
        Ok(reply)
    }

    /// Give up request/response framing and hand the raw stream over
    pub fn into_stream(self) -> UnixStream {
        self.stream
    }
}

impl WindowManager for IpcConnection {
    fn get_tree(&mut self) -> io::Result<Node> {
        let reply = self.request(MessageType::GetTree, b"")?;
        decode_json(&reply)
    }

    fn run_command(&mut self, command: &str) -> io::Result<Vec<CommandOutcome>> {
        let reply = self.request(MessageType::RunCommand, command.as_bytes())?;
        decode_json(&reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::thread;

    fn event_frame(kind: u32, payload: &[u8]) -> Vec<u8> {
        let mut frame = Vec::new();
        frame.extend_from_slice(MAGIC);
        frame.extend_from_slice(&(payload.len() as u32).to_ne_bytes());
        frame.extend_from_slice(&kind.to_ne_bytes());
        frame.extend_from_slice(payload);
        frame
    }

    #[test]
    fn test_encode_message_header() {
        let frame = encode_message(MessageType::RunCommand, b"nop");
        assert_eq!(&frame[..6], b"i3-ipc");
        assert_eq!(&frame[6..10], &3u32.to_ne_bytes());
        assert_eq!(&frame[10..14], &0u32.to_ne_bytes());
        assert_eq!(&frame[14..], b"nop");
    }

    #[test]
    fn test_read_message() {
        let frame = event_frame(EVENT_WINDOW, br#"{"change":"focus"}"#);
        let (kind, payload) = read_message(&mut Cursor::new(frame)).unwrap();
        assert_eq!(kind, EVENT_WINDOW);
        assert_eq!(payload, br#"{"change":"focus"}"#);
    }

    #[test]
    fn test_read_message_rejects_bad_magic() {
        let mut frame = event_frame(4, b"{}");
        frame[0] = b'x';
        let err = read_message(&mut Cursor::new(frame)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_frame_buffer_waits_for_whole_frame() {
        let first = event_frame(EVENT_WINDOW, b"{\"a\":1}");
        let second = event_frame(EVENT_SHUTDOWN, b"{\"change\":\"exit\"}");

        let mut frames = FrameBuffer::new();
        frames.extend(&first[..5]);
        assert!(frames.next_frame().unwrap().is_none());

        frames.extend(&first[5..]);
        frames.extend(&second[..HEADER_LEN + 2]);
        let (kind, payload) = frames.next_frame().unwrap().unwrap();
        assert_eq!(kind, EVENT_WINDOW);
        assert_eq!(payload, b"{\"a\":1}");
        assert!(frames.next_frame().unwrap().is_none());

        frames.extend(&second[HEADER_LEN + 2..]);
        let (kind, _) = frames.next_frame().unwrap().unwrap();
        assert_eq!(kind, EVENT_SHUTDOWN);
    }

    #[test]
    fn test_run_command_over_socket() {
        let (client, mut server) = UnixStream::pair().unwrap();
        let handle = thread::spawn(move || {
            let (kind, payload) = read_message(&mut server).unwrap();
            assert_eq!(kind, MessageType::RunCommand as u32);
            let reply = br#"[{"success":false,"error":"No matching node."}]"#;
            server.write_all(&event_frame(kind, reply)).unwrap();
            payload
        });

        let mut conn = IpcConnection::from_stream(client);
        let outcomes = conn.run_command("[con_id=\"7\"] opacity set 0.70").unwrap();
        assert_eq!(outcomes.len(), 1);
        assert!(!outcomes[0].success);
        assert!(!outcomes[0].parse_error);
        assert_eq!(outcomes[0].error.as_deref(), Some("No matching node."));

        let sent = handle.join().unwrap();
        assert_eq!(sent, b"[con_id=\"7\"] opacity set 0.70");
    }

    #[test]
    fn test_request_rejects_mismatched_reply_type() {
        let (client, mut server) = UnixStream::pair().unwrap();
        let handle = thread::spawn(move || {
            let _ = read_message(&mut server).unwrap();
            server.write_all(&event_frame(EVENT_WINDOW, b"{}")).unwrap();
        });

        let mut conn = IpcConnection::from_stream(client);
        let err = conn.get_tree().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        handle.join().unwrap();
    }
}
