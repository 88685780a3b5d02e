// src/discovery/stream.rs

use tokio::io::{AsyncBufRead, Lines};
use tokio::io::AsyncBufReadExt;

use crate::errors::{Cardinality, Gw1hError, Result};
use crate::types::{Pid, PidRadix};

/// Lazy, finite sequence of pids parsed from discovery output, one per line.
///
/// Consumes its reader, so a stream can only be walked once.
pub struct PidStream<R> {
    lines: Lines<R>,
    radix: PidRadix,
}

impl<R: AsyncBufRead + Unpin> PidStream<R> {
    pub fn new(reader: R, radix: PidRadix) -> Self {
        Self {
            lines: reader.lines(),
            radix,
        }
    }

    /// Next candidate, `None` once the output has ended.
    ///
    /// A line that is not a valid pid is a `StreamParse` error; the caller
    /// is expected to stop there.
    pub async fn next(&mut self) -> Option<Result<Pid>> {
        let line = match self.lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return None,
            Err(e) => return Some(Err(Gw1hError::IoError(e))),
        };

        Some(
            Pid::parse_radix(&line, self.radix)
                .map_err(|reason| Gw1hError::StreamParse { line, reason }),
        )
    }

    /// Drain the whole stream, failing on the first bad line.
    pub async fn collect(mut self) -> Result<Vec<Pid>> {
        let mut pids = Vec::new();
        while let Some(pid) = self.next().await {
            pids.push(pid?);
        }
        Ok(pids)
    }
}

/// Accept exactly one candidate. Ambiguity is never resolved by guessing.
pub fn select_single(mut candidates: Vec<Pid>) -> std::result::Result<Pid, Cardinality> {
    match candidates.len() {
        0 => Err(Cardinality::None),
        1 => Ok(candidates.remove(0)),
        _ => Err(Cardinality::Multiple(candidates)),
    }
}
