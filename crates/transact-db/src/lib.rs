//! Runs caller-supplied units of work inside a database transaction,
//! resolving every opened transaction to exactly one commit or rollback.

pub mod connection;
pub mod error;
pub mod manager;
pub mod pg;
mod recover;
pub mod source;

pub use manager::Manager;
pub use source::{TxHandle, TxSource, WorkFuture};
pub use transact_core::context::Context;
pub use transact_core::error::{Failure, FailureKind, TxError};
pub use transact_core::options::TxOptions;
