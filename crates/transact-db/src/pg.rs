//! Postgres transaction source backed by a diesel-async connection pool.
//!
//! Transactions are driven through diesel-async's `AnsiTransactionManager`, so
//! diesel's own bookkeeping stays consistent with the `BEGIN` issued here and
//! the connection is returned to the pool in a clean state.

use diesel_async::{AnsiTransactionManager, AsyncPgConnection, RunQueryDsl, TransactionManager};
use transact_core::context::Context;
use transact_core::options::TxOptions;

use crate::connection::{DbConnection, DbPool};
use crate::error::{DbError, DbResult};
use crate::source::{TxHandle, TxSource};

/// Opens transactions on connections checked out from a [`DbPool`].
#[derive(Clone)]
pub struct PgSource {
    pool: DbPool,
}

impl PgSource {
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &DbPool {
        &self.pool
    }

    async fn open(&self, ctx: &Context, options: TxOptions) -> DbResult<PgTx> {
        let mut conn = ctx.run(self.pool.get_owned()).await??;
        let sql = options.begin_sql();
        tracing::trace!(sql = %sql, "Beginning transaction");
        ctx.run(AnsiTransactionManager::begin_transaction_sql(&mut *conn, &sql))
            .await??;
        Ok(PgTx { conn })
    }
}

impl TxSource for PgSource {
    type Tx = PgTx;

    async fn begin(&self, ctx: &Context, options: TxOptions) -> anyhow::Result<PgTx> {
        Ok(self.open(ctx, options).await?)
    }
}

/// An open Postgres transaction holding its pooled connection.
pub struct PgTx {
    conn: DbConnection<'static>,
}

impl PgTx {
    /// ## Summary
    /// Returns the connection the transaction runs on, for diesel queries.
    pub fn conn(&mut self) -> &mut AsyncPgConnection {
        &mut self.conn
    }

    /// ## Summary
    /// Executes a raw SQL statement inside the transaction.
    ///
    /// ## Errors
    /// Returns an error if the context finishes first or the statement fails.
    pub async fn execute(&mut self, ctx: &Context, sql: &str) -> DbResult<usize> {
        let query = diesel::sql_query(sql);
        Ok(ctx.run(query.execute(self.conn())).await??)
    }
}

impl TxHandle for PgTx {
    async fn commit(&mut self, ctx: &Context) -> anyhow::Result<()> {
        ctx.run(AnsiTransactionManager::commit_transaction(self.conn()))
            .await?
            .map_err(DbError::from)?;
        Ok(())
    }

    async fn rollback(&mut self, ctx: &Context) -> anyhow::Result<()> {
        ctx.run(AnsiTransactionManager::rollback_transaction(self.conn()))
            .await?
            .map_err(DbError::from)?;
        Ok(())
    }
}
