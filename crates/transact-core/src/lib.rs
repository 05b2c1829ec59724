//! Shared vocabulary for running units of work inside a database transaction:
//! the request [`context::Context`], [`options::TxOptions`], the composite
//! [`error::TxError`] and configuration loading.

pub mod config;
pub mod context;
pub mod error;
pub mod options;
