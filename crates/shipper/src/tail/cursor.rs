//! Tail cursor — per-file byte offset over newly appended content.
//!
//! A cursor is created the first time a file is observed, seeded at the
//! current end of file so pre-existing content is never ingested. Every
//! later read returns only complete (newline-terminated) lines and
//! advances the offset past them; a trailing partial line stays on disk
//! and is picked up once a later notification finds its newline.
//!
//! The offset lives in process memory only. A restart seeds fresh cursors
//! at whatever end-of-file it finds.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom};
use tracing::debug;

pub struct TailCursor {
    path: PathBuf,
    offset: u64,
}

impl TailCursor {
    /// Create a cursor positioned at the current end of the file.
    pub async fn at_end(path: &Path) -> io::Result<Self> {
        let offset = tokio::fs::metadata(path).await?.len();
        Ok(Self {
            path: path.to_path_buf(),
            offset,
        })
    }

    /// Byte offset of the last consumed position.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Read all complete lines appended since the last read.
    ///
    /// Lines are decoded lossily (the source files are not guaranteed
    /// clean UTF-8) and returned without their terminators. Blank lines
    /// are consumed but not returned. The offset only moves past the last
    /// newline actually seen, so calling this again without new appends
    /// yields nothing and never re-reads consumed content.
    pub async fn read_new_lines(&mut self) -> io::Result<Vec<String>> {
        let mut file = File::open(&self.path).await?;
        let len = file.metadata().await?.len();

        if len < self.offset {
            // File shrank under us (rotation is out of scope); resume at
            // the new end rather than re-reading from a stale position.
            debug!(
                "{} truncated ({} -> {} bytes), resuming at end",
                self.path.display(),
                self.offset,
                len
            );
            self.offset = len;
            return Ok(Vec::new());
        }
        if len == self.offset {
            return Ok(Vec::new());
        }

        file.seek(SeekFrom::Start(self.offset)).await?;
        let mut buf = Vec::with_capacity((len - self.offset) as usize);
        file.take(len - self.offset).read_to_end(&mut buf).await?;

        let mut lines = Vec::new();
        let mut consumed = 0usize;
        for (i, byte) in buf.iter().enumerate() {
            if *byte != b'\n' {
                continue;
            }
            let raw = &buf[consumed..i];
            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            if !raw.is_empty() {
                lines.push(String::from_utf8_lossy(raw).into_owned());
            }
            consumed = i + 1;
        }

        self.offset += consumed as u64;
        Ok(lines)
    }
}
