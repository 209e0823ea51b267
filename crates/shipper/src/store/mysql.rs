//! MySQL-backed session and factory.
//!
//! A single dedicated connection per session, no pool: the gateway needs
//! to throw the whole session away on failure and build a new one, and a
//! pool would hide which connection a failed transaction poisoned.

use std::future::Future;
use std::pin::Pin;

use sqlx::mysql::MySqlConnectOptions;
use sqlx::{Connection, MySqlConnection};

use crate::config::DbConfig;
use crate::record::{AccessLogRecord, ErrorLogRecord};
use crate::store::session::{LogSession, SessionFactory, StoreError};

// Column order is fixed by the storage schema; see schema.sql.
const INSERT_ACCESS: &str = "INSERT INTO access_logs \
     (remote_addr, remote_user, time_local, request, status, body_bytes_sent, \
      http_referer, http_user_agent, upstream_addr, request_time, upstream_response_time) \
     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";

const INSERT_ERROR: &str = "INSERT INTO error_logs \
     (time_local, level, message, pid, client, server, request, host) \
     VALUES (?, ?, ?, ?, ?, ?, ?, ?)";

pub struct MySqlSession {
    conn: MySqlConnection,
}

impl MySqlSession {
    async fn insert_access_tx(&mut self, record: &AccessLogRecord) -> Result<(), StoreError> {
        let mut tx = self.conn.begin().await?;
        let result = sqlx::query(INSERT_ACCESS)
            .bind(&record.remote_addr)
            .bind(record.remote_user.as_deref())
            .bind(record.time_local)
            .bind(&record.request)
            .bind(record.status)
            .bind(record.body_bytes_sent)
            .bind(record.http_referer.as_deref())
            .bind(&record.http_user_agent)
            .bind(record.upstream_addr.as_deref())
            .bind(record.request_time)
            .bind(record.upstream_response_time)
            .execute(&mut *tx)
            .await;

        match result {
            Ok(_) => Ok(tx.commit().await?),
            Err(e) => {
                tx.rollback().await.map_err(StoreError::Database)?;
                Err(StoreError::Database(e))
            }
        }
    }

    async fn insert_error_tx(&mut self, record: &ErrorLogRecord) -> Result<(), StoreError> {
        let mut tx = self.conn.begin().await?;
        let result = sqlx::query(INSERT_ERROR)
            .bind(record.time_local)
            .bind(&record.level)
            .bind(&record.message)
            .bind(record.pid)
            .bind(record.client.as_deref())
            .bind(record.server.as_deref())
            .bind(record.request.as_deref())
            .bind(record.host.as_deref())
            .execute(&mut *tx)
            .await;

        match result {
            Ok(_) => Ok(tx.commit().await?),
            Err(e) => {
                tx.rollback().await.map_err(StoreError::Database)?;
                Err(StoreError::Database(e))
            }
        }
    }
}

impl LogSession for MySqlSession {
    fn insert_access<'a>(
        &'a mut self,
        record: &'a AccessLogRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>> {
        Box::pin(self.insert_access_tx(record))
    }

    fn insert_error<'a>(
        &'a mut self,
        record: &'a ErrorLogRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>> {
        Box::pin(self.insert_error_tx(record))
    }

    fn close(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send>> {
        Box::pin(async move {
            self.conn.close().await?;
            Ok(())
        })
    }
}

/// Builds [`MySqlSession`]s from the configured coordinates.
pub struct MySqlFactory {
    options: MySqlConnectOptions,
}

impl MySqlFactory {
    pub fn new(db: &DbConfig) -> Self {
        let options = MySqlConnectOptions::new()
            .host(&db.host)
            .port(db.port)
            .database(&db.name)
            .username(&db.user)
            .password(&db.password);
        Self { options }
    }
}

impl SessionFactory for MySqlFactory {
    fn connect(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Box<dyn LogSession>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let conn = MySqlConnection::connect_with(&self.options).await?;
            Ok(Box::new(MySqlSession { conn }) as Box<dyn LogSession>)
        })
    }
}
