//! Fake — in-memory test double for the storage layer.
//!
//! Implements [`SessionFactory`] and [`LogSession`] against shared
//! in-memory state so gateway and dispatcher tests can run without a
//! MySQL server, and can inject connect/insert failures deterministically.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::record::{AccessLogRecord, ErrorLogRecord};
use crate::store::session::{LogSession, SessionFactory, StoreError};

/// Mutable inner state protected by a mutex.
#[derive(Default)]
struct Inner {
    access: Vec<AccessLogRecord>,
    error: Vec<ErrorLogRecord>,
    connects: u32,
    /// Remaining connect attempts that should fail.
    fail_connects: u32,
    /// Remaining insert calls that should fail.
    fail_inserts: u32,
}

/// A fake store. Cloning shares the underlying state, so a test can keep
/// a handle for assertions while the gateway owns the factory.
#[derive(Clone, Default)]
pub struct FakeStore {
    inner: Arc<Mutex<Inner>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` connect attempts fail.
    pub async fn fail_connects(&self, n: u32) {
        self.inner.lock().await.fail_connects = n;
    }

    /// Make the next `n` insert calls fail (any kind).
    pub async fn fail_next_inserts(&self, n: u32) {
        self.inner.lock().await.fail_inserts = n;
    }

    /// Number of successful and failed connect attempts observed.
    pub async fn connect_count(&self) -> u32 {
        self.inner.lock().await.connects
    }

    pub async fn access_rows(&self) -> Vec<AccessLogRecord> {
        self.inner.lock().await.access.clone()
    }

    pub async fn error_rows(&self) -> Vec<ErrorLogRecord> {
        self.inner.lock().await.error.clone()
    }
}

impl SessionFactory for FakeStore {
    fn connect(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Box<dyn LogSession>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let mut state = self.inner.lock().await;
            state.connects += 1;
            if state.fail_connects > 0 {
                state.fail_connects -= 1;
                return Err(StoreError::Backend("connection refused".into()));
            }
            Ok(Box::new(FakeSession {
                inner: Arc::clone(&self.inner),
            }) as Box<dyn LogSession>)
        })
    }
}

pub struct FakeSession {
    inner: Arc<Mutex<Inner>>,
}

impl LogSession for FakeSession {
    fn insert_access<'a>(
        &'a mut self,
        record: &'a AccessLogRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>> {
        Box::pin(async move {
            let mut state = self.inner.lock().await;
            if state.fail_inserts > 0 {
                state.fail_inserts -= 1;
                return Err(StoreError::Backend("lost connection during commit".into()));
            }
            state.access.push(record.clone());
            Ok(())
        })
    }

    fn insert_error<'a>(
        &'a mut self,
        record: &'a ErrorLogRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>> {
        Box::pin(async move {
            let mut state = self.inner.lock().await;
            if state.fail_inserts > 0 {
                state.fail_inserts -= 1;
                return Err(StoreError::Backend("lost connection during commit".into()));
            }
            state.error.push(record.clone());
            Ok(())
        })
    }

    fn close(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send>> {
        Box::pin(async { Ok(()) })
    }
}
