//! Write transactions that take SQLite's write lock up front
//!
//! sqlx's [`Transaction`](sqlx::Transaction) issues a deferred `BEGIN`: the
//! first read pins a snapshot and the first write then has to upgrade it. In
//! WAL mode that upgrade fails with `SQLITE_BUSY` as soon as another writer
//! committed in between, and the busy timeout never applies. Flows that read
//! before they write therefore start with `BEGIN IMMEDIATE`, which waits for
//! the write lock (honouring the busy timeout) before anything is read.

use std::ops::{Deref, DerefMut};

use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqliteConnection, SqlitePool};
use tracing::warn;

use crate::Result;

/// An open `BEGIN IMMEDIATE` transaction on a pooled connection
///
/// Dereferences to the connection, so `&mut *tx` can be handed to anything
/// taking a `SqliteConnection`. Dropped without [`commit`](Self::commit) or
/// [`rollback`](Self::rollback), the transaction is rolled back in the
/// background before the connection goes back to the pool.
pub struct WriteTransaction {
    conn: Option<PoolConnection<Sqlite>>,
}

impl WriteTransaction {
    pub(super) async fn begin(pool: &SqlitePool) -> Result<Self> {
        let mut conn = pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
        Ok(Self { conn: Some(conn) })
    }

    pub async fn commit(mut self) -> Result<()> {
        let Some(mut conn) = self.conn.take() else {
            return Ok(());
        };

        if let Err(e) = sqlx::query("COMMIT").execute(&mut *conn).await {
            // A failed COMMIT leaves the transaction open
            if let Err(rollback) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
                warn!("Rollback after failed commit also failed: {}", rollback);
                drop(conn.detach());
            }
            return Err(e.into());
        }
        Ok(())
    }

    pub async fn rollback(mut self) -> Result<()> {
        let Some(mut conn) = self.conn.take() else {
            return Ok(());
        };

        if let Err(e) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
            drop(conn.detach());
            return Err(e.into());
        }
        Ok(())
    }
}

impl Deref for WriteTransaction {
    type Target = SqliteConnection;

    fn deref(&self) -> &SqliteConnection {
        self.conn
            .as_deref()
            .expect("connection is present until commit or rollback consumes the transaction")
    }
}

impl DerefMut for WriteTransaction {
    fn deref_mut(&mut self) -> &mut SqliteConnection {
        self.conn
            .as_deref_mut()
            .expect("connection is present until commit or rollback consumes the transaction")
    }
}

impl Drop for WriteTransaction {
    fn drop(&mut self) {
        let Some(mut conn) = self.conn.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
                        warn!("Rollback of abandoned write transaction failed: {}", e);
                        drop(conn.detach());
                    }
                });
            }
            // Closing the connection discards the open transaction
            Err(_) => drop(conn.detach()),
        }
    }
}
