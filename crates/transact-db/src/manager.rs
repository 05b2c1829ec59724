//! The transaction runner.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use diesel_async::scoped_futures::ScopedFutureExt;
//! use transact_db::{Context, Manager, TxOptions};
//!
//! let manager = Manager::new(PgSource::new(pool));
//! manager
//!     .run(&ctx, TxOptions::new().serializable(), |ctx, tx| {
//!         async move {
//!             tx.execute(ctx, "INSERT INTO audit (event) VALUES ('login')").await?;
//!             Ok(())
//!         }
//!         .scope_boxed()
//!     })
//!     .await?;
//! ```

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use transact_core::context::Context;
use transact_core::error::{Failure, TxError};
use transact_core::options::TxOptions;
use uuid::Uuid;

use crate::recover;
use crate::source::{TxHandle, TxSource, WorkFuture};

/// Terminal state reached by one invocation, recorded on its span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    OpenFailed,
    Committed,
    RolledBack,
}

impl Outcome {
    const fn as_str(self) -> &'static str {
        match self {
            Self::OpenFailed => "open_failed",
            Self::Committed => "committed",
            Self::RolledBack => "rolled_back",
        }
    }

    fn record(self) {
        tracing::Span::current().record("outcome", self.as_str());
    }
}

/// Runs units of work inside transactions opened from a [`TxSource`].
///
/// Holds nothing but the source and default options, so one manager can serve
/// concurrent invocations as long as the source allows it. Each invocation owns
/// the transaction it opens.
#[derive(Debug, Clone)]
pub struct Manager<S> {
    source: S,
    options: TxOptions,
}

impl<S> Manager<S>
where
    S: TxSource,
{
    #[must_use]
    pub const fn new(source: S) -> Self {
        Self {
            source,
            options: TxOptions::new(),
        }
    }

    /// ## Summary
    /// Sets the options used by [`Manager::run_with_defaults`].
    #[must_use]
    pub fn with_options(self, options: TxOptions) -> Self {
        Self { options, ..self }
    }

    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }

    #[must_use]
    pub const fn options(&self) -> TxOptions {
        self.options
    }

    /// ## Summary
    /// Opens a transaction, runs `work` in it, then commits if `work` succeeded
    /// or rolls back if it failed or panicked.
    ///
    /// A panic inside `work` does not propagate: it is converted into a
    /// [`Failure::Panic`] and the transaction is rolled back.
    ///
    /// To carry an error through a panic, panic with an `anyhow::Error` or a
    /// `Box<dyn Error + Send + Sync>` (`std::panic::panic_any(err)`); that error
    /// becomes the failure unchanged. String payloads are kept as
    /// `recovered from panic: <message>`. Any other payload, including a bare
    /// concrete error type such as `std::io::Error`, cannot be inspected and is
    /// reported as `recovered from panic: non-string payload`.
    ///
    /// ## Errors
    /// - [`Failure::Open`] alone if the transaction could not be opened; `work`
    ///   is not invoked.
    /// - [`Failure::Work`] or [`Failure::Panic`], followed by
    ///   [`Failure::Rollback`] when the rollback also failed.
    /// - [`Failure::Commit`] alone if `work` succeeded but the commit failed.
    #[tracing::instrument(
        name = "transaction",
        skip_all,
        fields(
            tx_id = %Uuid::now_v7(),
            isolation_level = ?options.isolation_level,
            access_mode = ?options.access_mode,
            outcome = tracing::field::Empty,
        )
    )]
    pub async fn run<'a, F>(&self, ctx: &Context, options: TxOptions, work: F) -> Result<(), TxError>
    where
        F: for<'r> FnOnce(&'r Context, &'r mut S::Tx) -> WorkFuture<'a, 'r> + Send + 'a,
    {
        let mut tx = match self.source.begin(ctx, options).await {
            Ok(tx) => tx,
            Err(err) => {
                tracing::debug!(error = %err, "Failed to begin transaction");
                Outcome::OpenFailed.record();
                return Err(Failure::Open(err).into());
            }
        };
        tracing::debug!("Transaction opened");

        let invoked = AssertUnwindSafe(async { work(ctx, &mut tx).await })
            .catch_unwind()
            .await;

        // `recovered` is only ever set by the panic branch.
        let (primary, recovered) = match invoked {
            Ok(Ok(())) => {
                let committed = tx.commit(ctx).await;
                Outcome::Committed.record();
                match committed {
                    Ok(()) => {
                        tracing::debug!("Transaction committed");
                        (Ok(()), Ok(()))
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "Commit failed");
                        (Err(Failure::Commit(err).into()), Ok(()))
                    }
                }
            }
            Ok(Err(err)) => {
                tracing::debug!(error = %err, "Unit of work failed, rolling back");
                let rolled_back = rollback(ctx, &mut tx).await;
                Outcome::RolledBack.record();
                (TxError::join([Some(Failure::Work(err)), rolled_back]), Ok(()))
            }
            Err(payload) => {
                let err = recover::into_error(payload);
                tracing::error!(error = %err, "Unit of work panicked, rolling back");
                let rolled_back = rollback(ctx, &mut tx).await;
                Outcome::RolledBack.record();
                (Ok(()), TxError::join([Some(Failure::Panic(err)), rolled_back]))
            }
        };

        TxError::merge(primary, recovered)
    }

    /// ## Summary
    /// Same as [`Manager::run`] with the manager's default options.
    ///
    /// ## Errors
    /// See [`Manager::run`].
    pub async fn run_with_defaults<'a, F>(&self, ctx: &Context, work: F) -> Result<(), TxError>
    where
        F: for<'r> FnOnce(&'r Context, &'r mut S::Tx) -> WorkFuture<'a, 'r> + Send + 'a,
    {
        self.run(ctx, self.options, work).await
    }
}

async fn rollback<T>(ctx: &Context, tx: &mut T) -> Option<Failure>
where
    T: TxHandle,
{
    match tx.rollback(ctx).await {
        Ok(()) => {
            tracing::debug!("Transaction rolled back");
            None
        }
        Err(err) => {
            tracing::warn!(error = %err, "Rollback failed");
            Some(Failure::Rollback(err))
        }
    }
}
