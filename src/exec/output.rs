// src/exec/output.rs

//! Background readers for child stdout/stderr.
//!
//! A reader must keep its pipe open until the child closes it: a dropped
//! read end turns the child's next write into SIGPIPE.

use std::borrow::Cow;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{debug, warn};

use crate::types::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// Re-emit every line on our own stream as `[role] line`.
pub fn forward_lines<R>(role: Role, reader: R, stream: Stream)
where
    R: AsyncRead + Send + Unpin + 'static,
{
    tokio::spawn(async move {
        pump_lines(role, reader, |line| match stream {
            Stream::Stdout => println!("{}", tag_line(role, line)),
            Stream::Stderr => eprintln!("{}", tag_line(role, line)),
        })
        .await;
        debug!(role = %role, ?stream, "output stream closed");
    });
}

/// Consume a stream so its pipe never fills; lines are logged at debug.
pub fn drain_to_debug<R>(role: Role, reader: R)
where
    R: AsyncRead + Send + Unpin + 'static,
{
    tokio::spawn(async move {
        pump_lines(role, reader, |line| debug!(role = %role, "stderr: {}", line)).await;
    });
}

/// Hand every line of `reader` to `emit` until end of stream.
///
/// Bytes that are not UTF-8 are replaced, never treated as an error. After a
/// read error the rest of the stream is still consumed, just not emitted.
async fn pump_lines<R, F>(role: Role, reader: R, mut emit: F)
where
    R: AsyncRead + Unpin,
    F: FnMut(&str),
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => return,
            Ok(_) => emit(&decode_line(&buf)),
            Err(e) => {
                warn!(role = %role, error = %e, "failed to read child output; discarding the rest");
                if let Err(e) = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await {
                    debug!(role = %role, error = %e, "output drain stopped");
                }
                return;
            }
        }
    }
}

fn decode_line(raw: &[u8]) -> Cow<'_, str> {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw)
}

fn tag_line(role: Role, line: &str) -> String {
    format!("[{role}] {line}")
}
