//! Test support for the transaction runner.
//!
//! Provides programmable doubles for the three capabilities the runner is built
//! from, so its behaviour can be verified without a database.

pub mod fake;
