//! Programmable doubles for [`TxSource`](transact_db::TxSource),
//! [`TxHandle`](transact_db::TxHandle) and the unit-of-work closure returning a
//! [`WorkFuture`](transact_db::WorkFuture).
//!
//! Every double is a cheap handle onto shared state: clone it, hand the clone
//! to the runner, and inspect call counts on the original afterwards.

mod source;
mod tx;
mod work;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use source::FakeSource;
pub use tx::FakeTx;
pub use work::FakeWork;

// Doubles are routinely driven through panics; a poisoned lock still holds
// valid counters.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
