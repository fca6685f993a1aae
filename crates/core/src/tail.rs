// crates/core/src/tail.rs
//! File tailing primitives: bounded backward reads for backlog replay and
//! an offset-tracking reader for live append streaming.
//!
//! `TailReader` replaces the external `tail -f` process the dashboard used
//! to spawn — there is nothing to reap on disconnect, and cancellation is
//! just dropping the reader.

use std::io;
use std::path::{Path, PathBuf};

use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Chunk size for backward reads.
const REV_CHUNK: u64 = 8 * 1024;

/// Read the last `n` lines of a file without loading the whole file.
///
/// Lines come back in file order. A trailing newline does not produce an
/// empty final line; a file with fewer than `n` lines yields them all.
pub async fn tail_lines(path: &Path, n: usize) -> io::Result<Vec<String>> {
    tail_lines_before(path, n, u64::MAX).await
}

/// Like [`tail_lines`], but only considers the first `end` bytes of the
/// file. Used to replay backlog up to the exact offset a live reader
/// starts at, so a line appended mid-setup is neither lost nor sent twice.
pub async fn tail_lines_before(path: &Path, n: usize, end: u64) -> io::Result<Vec<String>> {
    if n == 0 {
        return Ok(Vec::new());
    }

    let mut file = tokio::fs::File::open(path).await?;
    let len = file.metadata().await?.len().min(end);
    if len == 0 {
        return Ok(Vec::new());
    }

    // Walk backward from EOF until we have seen one more newline than the
    // number of lines wanted (the extra one bounds the first kept line),
    // then split and keep the tail.
    let mut collected: Vec<u8> = Vec::new();
    let mut newlines = 0usize;
    let mut pos = len;

    while pos > 0 && newlines <= n {
        let chunk_len = pos.min(REV_CHUNK);
        pos -= chunk_len;

        file.seek(io::SeekFrom::Start(pos)).await?;
        let mut chunk = vec![0u8; chunk_len as usize];
        file.read_exact(&mut chunk).await?;

        newlines += chunk.iter().filter(|&&b| b == b'\n').count();
        chunk.extend_from_slice(&collected);
        collected = chunk;
    }

    let text = String::from_utf8_lossy(&collected);
    let text = text.strip_suffix('\n').unwrap_or(&text);
    if text.is_empty() {
        return Ok(Vec::new());
    }

    let lines: Vec<&str> = text.split('\n').collect();
    let start = lines.len().saturating_sub(n);
    Ok(lines[start..].iter().map(|s| s.to_string()).collect())
}

/// Incremental reader that returns only the lines appended since the last
/// call.
///
/// - Only newline-terminated lines are returned; a partial trailing line
///   stays pending until its terminator arrives, even across many reads.
/// - Truncation (file shrank below the reader's offset) resets the reader
///   to the start of the file.
/// - Starting at the current end of file makes the first call return only
///   content appended after construction.
#[derive(Debug)]
pub struct TailReader {
    path: PathBuf,
    offset: u64,
    /// Bytes of an unterminated trailing line carried between reads.
    pending: Vec<u8>,
}

impl TailReader {
    /// Reader positioned at the start of the file: the first call to
    /// [`TailReader::read_new_lines`] returns the file's entire existing
    /// content, which doubles as history replay.
    pub fn from_start(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            offset: 0,
            pending: Vec::new(),
        }
    }

    /// Reader positioned at the current end of the file.
    pub async fn from_end(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let len = tokio::fs::metadata(&path).await?.len();
        Ok(Self {
            path,
            offset: len,
            pending: Vec::new(),
        })
    }

    /// Current byte offset (start of the pending partial line, if any).
    pub fn offset(&self) -> u64 {
        self.offset.saturating_sub(self.pending.len() as u64)
    }

    /// Return all complete lines appended since the last call.
    pub async fn read_new_lines(&mut self) -> io::Result<Vec<String>> {
        let mut file = tokio::fs::File::open(&self.path).await?;
        let len = file.metadata().await?.len();

        if len < self.offset {
            // Truncated underneath us; start over.
            tracing::debug!(path = %self.path.display(), "file truncated, restarting tail");
            self.offset = 0;
            self.pending.clear();
        }
        if len == self.offset {
            return Ok(Vec::new());
        }

        file.seek(io::SeekFrom::Start(self.offset)).await?;
        let mut buf = Vec::with_capacity((len - self.offset) as usize);
        file.read_to_end(&mut buf).await?;
        self.offset += buf.len() as u64;

        self.pending.extend_from_slice(&buf);

        let mut lines = Vec::new();
        while let Some(nl) = self.pending.iter().position(|&b| b == b'\n') {
            let rest = self.pending.split_off(nl + 1);
            let mut line = std::mem::replace(&mut self.pending, rest);
            line.pop(); // the newline
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        Ok(lines)
    }
}
