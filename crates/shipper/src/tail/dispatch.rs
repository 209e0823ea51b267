//! Dispatcher — routes file-change notifications to the right pipeline.
//!
//! A notification names a path; the path's file name decides the log kind
//! (`access.log` vs `error.log` substring), the per-file cursor yields the
//! newly appended lines, and each line runs grammar → normalizer →
//! gateway. Every failure along the way is contained to its line or its
//! notification; nothing here stops the watch loop.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::grammar;
use crate::record::normalize;
use crate::store::{Gateway, StoreError};
use crate::tail::cursor::TailCursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Access,
    Error,
}

/// Decide which pipeline a path belongs to; `None` for unrelated files.
pub fn classify(path: &Path) -> Option<LogKind> {
    let name = path.to_string_lossy();
    if name.contains("access.log") {
        Some(LogKind::Access)
    } else if name.contains("error.log") {
        Some(LogKind::Error)
    } else {
        None
    }
}

pub struct Dispatcher {
    cursors: HashMap<PathBuf, TailCursor>,
    gateway: Gateway,
}

impl Dispatcher {
    pub fn new(gateway: Gateway) -> Self {
        Self {
            cursors: HashMap::new(),
            gateway,
        }
    }

    /// Current cursor offset for a file, if one has been seeded.
    pub fn offset(&self, path: &Path) -> Option<u64> {
        self.cursors.get(path).map(TailCursor::offset)
    }

    /// Handle one modify notification to completion.
    pub async fn handle_modify(&mut self, path: &Path) {
        let Some(kind) = classify(path) else {
            return;
        };
        if path.is_dir() {
            return;
        }

        // First sighting: seed the cursor at end-of-file and ingest
        // nothing. Only activity after this point is shipped.
        if !self.cursors.contains_key(path) {
            match TailCursor::at_end(path).await {
                Ok(cursor) => {
                    debug!(
                        "now tailing {} from offset {}",
                        path.display(),
                        cursor.offset()
                    );
                    self.cursors.insert(path.to_path_buf(), cursor);
                }
                Err(e) => warn!("cannot open {}: {e}", path.display()),
            }
            return;
        }

        let lines = {
            let Some(cursor) = self.cursors.get_mut(path) else {
                return;
            };
            match cursor.read_new_lines().await {
                Ok(lines) => lines,
                Err(e) => {
                    // Recoverable at the notification level; the offset is
                    // untouched and the next notification retries.
                    warn!("error reading {}: {e}", path.display());
                    return;
                }
            }
        };

        for line in lines {
            self.ingest(kind, &line).await;
        }
    }

    async fn ingest(&mut self, kind: LogKind, line: &str) {
        match kind {
            LogKind::Access => match grammar::access::parse(line) {
                Some(fields) => match normalize::access_record(fields) {
                    Ok(record) => {
                        if let Err(e) = self.gateway.insert_access(&record).await {
                            warn!("storage unavailable, access record lost: {e}");
                        }
                    }
                    Err(e) => warn!("skipping access line: {e}"),
                },
                None => warn!("failed to parse access log line: {}", preview(line)),
            },
            LogKind::Error => match grammar::error::parse(line) {
                Some(fields) => match normalize::error_record(fields) {
                    Ok(record) => {
                        if let Err(e) = self.gateway.insert_error(&record).await {
                            warn!("storage unavailable, error record lost: {e}");
                        }
                    }
                    Err(e) => warn!("skipping error line: {e}"),
                },
                None => warn!("failed to parse error log line: {}", preview(line)),
            },
        }
    }

    /// Release the gateway session. Consumes the dispatcher: shutdown is
    /// the end of the pipeline.
    pub async fn shutdown(self) -> Result<(), StoreError> {
        self.gateway.close().await
    }
}

/// First 100 characters of a line, for log output.
fn preview(line: &str) -> String {
    if line.chars().count() <= 100 {
        line.to_string()
    } else {
        let cut: String = line.chars().take(100).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fake::FakeStore;
    use std::io::Write;

    const ACCESS_LINE: &str = r#"10.0.0.1 - - [10/Oct/2023:13:55:36 +0000] "GET /x HTTP/1.1" 200 512 "-" "curl/8.0" - 0.002 -"#;
    const ERROR_LINE: &str =
        "2023/10/10 13:55:36 [error] 1234#0: *5 connect() failed, client: 10.0.0.2, server: example.com";

    fn append(path: &Path, content: &str) {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    async fn dispatcher(store: &FakeStore) -> Dispatcher {
        let gateway = Gateway::connect(Box::new(store.clone())).await.unwrap();
        Dispatcher::new(gateway)
    }

    #[test]
    fn test_classify_by_substring() {
        assert_eq!(
            classify(Path::new("/var/log/nginx/site-access.log")),
            Some(LogKind::Access)
        );
        assert_eq!(
            classify(Path::new("/var/log/nginx/site-error.log")),
            Some(LogKind::Error)
        );
        assert_eq!(classify(Path::new("/var/log/nginx/other.txt")), None);
        assert_eq!(classify(Path::new("/var/log/nginx")), None);
    }

    #[tokio::test]
    async fn test_access_line_reaches_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site-access.log");
        append(&path, "historic line, never shipped\n");

        let store = FakeStore::new();
        let mut dispatcher = dispatcher(&store).await;

        // First notification seeds the cursor; nothing is ingested.
        dispatcher.handle_modify(&path).await;
        assert!(store.access_rows().await.is_empty());

        append(&path, &format!("{ACCESS_LINE}\n"));
        dispatcher.handle_modify(&path).await;

        let rows = store.access_rows().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].remote_addr, "10.0.0.1");
        assert_eq!(rows[0].status, 200);
        assert_eq!(rows[0].remote_user, None);
    }

    #[tokio::test]
    async fn test_error_line_reaches_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site-error.log");
        append(&path, "");

        let store = FakeStore::new();
        let mut dispatcher = dispatcher(&store).await;

        dispatcher.handle_modify(&path).await;
        append(&path, &format!("{ERROR_LINE}\n"));
        dispatcher.handle_modify(&path).await;

        let rows = store.error_rows().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].pid, Some(1234));
        assert_eq!(rows[0].server.as_deref(), Some("example.com"));
    }

    #[tokio::test]
    async fn test_unrelated_file_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        append(&path, "whatever\n");

        let store = FakeStore::new();
        let mut dispatcher = dispatcher(&store).await;
        dispatcher.handle_modify(&path).await;
        dispatcher.handle_modify(&path).await;

        assert_eq!(dispatcher.offset(&path), None);
        assert!(store.access_rows().await.is_empty());
    }

    #[tokio::test]
    async fn test_redelivered_notification_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site-access.log");
        append(&path, "");

        let store = FakeStore::new();
        let mut dispatcher = dispatcher(&store).await;

        dispatcher.handle_modify(&path).await;
        append(&path, &format!("{ACCESS_LINE}\n"));
        dispatcher.handle_modify(&path).await;
        let offset = dispatcher.offset(&path);

        // Same notification again, no new bytes.
        dispatcher.handle_modify(&path).await;
        assert_eq!(dispatcher.offset(&path), offset);
        assert_eq!(store.access_rows().await.len(), 1);
    }

    #[tokio::test]
    async fn test_unparsed_line_skipped_but_offset_advances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site-access.log");
        append(&path, "");

        let store = FakeStore::new();
        let mut dispatcher = dispatcher(&store).await;
        dispatcher.handle_modify(&path).await;

        append(&path, &format!("this matches no grammar\n{ACCESS_LINE}\n"));
        dispatcher.handle_modify(&path).await;

        // The bad line is skipped, the good one behind it still lands,
        // and the cursor sits at the end of everything it read.
        assert_eq!(store.access_rows().await.len(), 1);
        let file_len = std::fs::metadata(&path).unwrap().len();
        assert_eq!(dispatcher.offset(&path), Some(file_len));
    }

    #[tokio::test]
    async fn test_insert_failure_does_not_stall_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site-access.log");
        append(&path, "");

        let store = FakeStore::new();
        let mut dispatcher = dispatcher(&store).await;
        dispatcher.handle_modify(&path).await;

        store.fail_next_inserts(1).await;
        append(&path, &format!("{ACCESS_LINE}\n{ACCESS_LINE}\n"));
        dispatcher.handle_modify(&path).await;

        // First record dropped on the failing session, one reconnect,
        // second record shipped.
        assert_eq!(store.access_rows().await.len(), 1);
        assert_eq!(store.connect_count().await, 2);
    }
}
