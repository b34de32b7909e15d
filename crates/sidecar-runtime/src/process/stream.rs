//! Async stream line readers (non-UTF8-safe).
//!
//! Servers built on native tooling can emit non-UTF8 bytes on stdout/stderr.
//! `BufReader::lines()` would terminate the reader on invalid UTF-8, so lines
//! are read as bytes and decoded lossily.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use sidecar_core::ports::ProcessEvent;

/// Which child stream a reader consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }

    fn event(self, line: String) -> ProcessEvent {
        match self {
            Self::Stdout => ProcessEvent::Stdout(line),
            Self::Stderr => ProcessEvent::Stderr(line),
        }
    }
}

/// Strip one trailing `\n` (and a preceding `\r`) and decode lossily.
pub fn decode_line(buf: &mut Vec<u8>) -> String {
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    String::from_utf8_lossy(buf).into_owned()
}

/// Forward every line of `stream` to `events` until EOF.
///
/// The returned handle completes once the stream is drained, which lets the
/// exit waiter deliver all output before the exit event.
pub fn spawn_stream_reader(
    stream: impl AsyncRead + Unpin + Send + 'static,
    pid: Option<u32>,
    kind: StreamKind,
    events: UnboundedSender<ProcessEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let stream_type = kind.as_str();
        let mut reader = BufReader::new(stream);
        let mut buf: Vec<u8> = Vec::with_capacity(1024);

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break, // EOF
                Ok(_) => {
                    let line = decode_line(&mut buf);
                    trace!(?pid, %stream_type, "{}", line);
                    // Receiver gone: keep draining so the child never blocks on a full pipe
                    let _ = events.send(kind.event(line));
                }
                Err(e) => {
                    debug!(?pid, %stream_type, error = %e, "stream reader exiting due to read error");
                    break;
                }
            }
        }

        debug!(?pid, %stream_type, "stream reader task exiting");
    })
}
