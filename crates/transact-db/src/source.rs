//! Capabilities the [`Manager`](crate::Manager) is built from.
//!
//! Implement [`TxSource`] and [`TxHandle`] for a driver (see [`crate::pg`]) or
//! for a test double. A unit of work is any closure returning a [`WorkFuture`].

use std::future::Future;
use std::sync::Arc;

use diesel_async::scoped_futures::ScopedBoxFuture;
use transact_core::context::Context;
use transact_core::options::TxOptions;

/// Opens transactions.
pub trait TxSource: Send + Sync {
    type Tx: TxHandle;

    /// ## Summary
    /// Opens a new transaction with `options`.
    ///
    /// ## Errors
    /// Returns an error if no transaction could be opened. No handle exists in
    /// that case, so there is nothing to resolve.
    fn begin(
        &self,
        ctx: &Context,
        options: TxOptions,
    ) -> impl Future<Output = anyhow::Result<Self::Tx>> + Send;
}

/// An open transaction. Resolved by exactly one call to `commit` or `rollback`.
pub trait TxHandle: Send {
    /// ## Errors
    /// Returns an error if the commit was not acknowledged.
    fn commit(&mut self, ctx: &Context) -> impl Future<Output = anyhow::Result<()>> + Send;

    /// ## Errors
    /// Returns an error if the rollback was not acknowledged.
    fn rollback(&mut self, ctx: &Context) -> impl Future<Output = anyhow::Result<()>> + Send;
}

impl<S> TxSource for Arc<S>
where
    S: TxSource,
{
    type Tx = S::Tx;

    fn begin(
        &self,
        ctx: &Context,
        options: TxOptions,
    ) -> impl Future<Output = anyhow::Result<Self::Tx>> + Send {
        S::begin(self, ctx, options)
    }
}

/// Future returned by a unit of work: the closure a [`Manager`](crate::Manager)
/// runs inside an open transaction.
///
/// ```rust,ignore
/// use diesel_async::scoped_futures::ScopedFutureExt;
///
/// manager
///     .run(&ctx, TxOptions::default(), |ctx, tx| {
///         async move {
///             tx.execute(ctx, "UPDATE accounts SET balance = balance - 10").await?;
///             Ok(())
///         }
///         .scope_boxed()
///     })
///     .await?;
/// ```
pub type WorkFuture<'a, 'r> = ScopedBoxFuture<'a, 'r, anyhow::Result<()>>;
