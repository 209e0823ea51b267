//! Persistence gateway — owns the session, reconnects on failure.
//!
//! One record is one transaction. A failed insert rolls back inside the
//! session, the record is dropped (at-most-once delivery), and a fresh
//! session is established before control returns to the caller. Only the
//! initial connect at boot is allowed to be fatal.

use std::time::Duration;

use tracing::{info, warn};

use crate::record::{AccessLogRecord, ErrorLogRecord};
use crate::store::session::{LogSession, SessionFactory, StoreError};

/// How many times `connect` tries before giving up.
pub const CONNECT_ATTEMPTS: u32 = 3;
/// Pause between connect attempts.
pub const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(5);

pub struct Gateway {
    factory: Box<dyn SessionFactory>,
    session: Box<dyn LogSession>,
}

impl Gateway {
    /// Establish the initial session, retrying up to [`CONNECT_ATTEMPTS`]
    /// times with [`CONNECT_RETRY_DELAY`] between attempts. Exhausting the
    /// retries is the one storage error the process cannot survive.
    pub async fn connect(factory: Box<dyn SessionFactory>) -> Result<Self, StoreError> {
        let session = connect_with_retry(&*factory).await?;
        Ok(Self { factory, session })
    }

    /// Insert one access record in its own transaction.
    ///
    /// On a storage error the record is dropped and the session replaced;
    /// the error only propagates when the reconnect itself fails.
    pub async fn insert_access(&mut self, record: &AccessLogRecord) -> Result<(), StoreError> {
        if let Err(e) = self.session.insert_access(record).await {
            warn!("access insert failed, dropping record: {e}");
            self.session = connect_with_retry(&*self.factory).await?;
        }
        Ok(())
    }

    /// Insert one error record in its own transaction; same failure
    /// contract as [`Gateway::insert_access`].
    pub async fn insert_error(&mut self, record: &ErrorLogRecord) -> Result<(), StoreError> {
        if let Err(e) = self.session.insert_error(record).await {
            warn!("error insert failed, dropping record: {e}");
            self.session = connect_with_retry(&*self.factory).await?;
        }
        Ok(())
    }

    /// Release the session. Called on the shutdown path so the connection
    /// is closed deliberately rather than dropped.
    pub async fn close(self) -> Result<(), StoreError> {
        self.session.close().await
    }
}

async fn connect_with_retry(factory: &dyn SessionFactory) -> Result<Box<dyn LogSession>, StoreError> {
    let mut attempt = 1;
    loop {
        match factory.connect().await {
            Ok(session) => {
                info!("database session established (attempt {attempt})");
                return Ok(session);
            }
            Err(e) if attempt < CONNECT_ATTEMPTS => {
                warn!("database connect failed (attempt {attempt}): {e}");
                tokio::time::sleep(CONNECT_RETRY_DELAY).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(StoreError::RetriesExhausted {
                    attempts: CONNECT_ATTEMPTS,
                    last: e.to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fake::FakeStore;
    use chrono::{TimeZone, Utc};

    fn sample_access() -> AccessLogRecord {
        AccessLogRecord {
            remote_addr: "10.0.0.1".into(),
            remote_user: None,
            time_local: Utc.with_ymd_and_hms(2023, 10, 10, 13, 55, 36).unwrap(),
            request: "GET /x HTTP/1.1".into(),
            status: 200,
            body_bytes_sent: 512,
            http_referer: None,
            http_user_agent: "curl/8.0".into(),
            upstream_addr: None,
            request_time: 0.002,
            upstream_response_time: None,
        }
    }

    #[tokio::test]
    async fn test_connect_first_attempt() {
        let store = FakeStore::new();
        let gateway = Gateway::connect(Box::new(store.clone())).await.unwrap();
        assert_eq!(store.connect_count().await, 1);
        gateway.close().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_succeeds_after_transient_failures() {
        let store = FakeStore::new();
        store.fail_connects(2).await;
        let gateway = Gateway::connect(Box::new(store.clone())).await.unwrap();
        // Two failures plus the success.
        assert_eq!(store.connect_count().await, 3);
        gateway.close().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_retries_exhausted_is_fatal() {
        let store = FakeStore::new();
        store.fail_connects(CONNECT_ATTEMPTS).await;
        let result = Gateway::connect(Box::new(store.clone())).await;
        assert!(matches!(
            result,
            Err(StoreError::RetriesExhausted { attempts, .. }) if attempts == CONNECT_ATTEMPTS
        ));
        assert_eq!(store.connect_count().await, CONNECT_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_insert_failure_reconnects_once_and_drops_record() {
        let store = FakeStore::new();
        let mut gateway = Gateway::connect(Box::new(store.clone())).await.unwrap();
        assert_eq!(store.connect_count().await, 1);

        store.fail_next_inserts(1).await;
        let first = sample_access();
        let mut second = sample_access();
        second.status = 404;

        // Failed record is dropped, not surfaced as an error.
        gateway.insert_access(&first).await.unwrap();
        assert_eq!(store.connect_count().await, 2);

        // The subsequent record lands on the fresh session.
        gateway.insert_access(&second).await.unwrap();
        assert_eq!(store.connect_count().await, 2);

        let rows = store.access_rows().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, 404);
    }

    #[tokio::test(start_paused = true)]
    async fn test_insert_failure_with_dead_database_propagates() {
        let store = FakeStore::new();
        let mut gateway = Gateway::connect(Box::new(store.clone())).await.unwrap();

        store.fail_next_inserts(1).await;
        store.fail_connects(CONNECT_ATTEMPTS).await;

        let result = gateway.insert_access(&sample_access()).await;
        assert!(matches!(result, Err(StoreError::RetriesExhausted { .. })));
    }
}
