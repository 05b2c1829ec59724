use std::sync::{Arc, Mutex};

use transact_db::{Context, TxOptions, TxSource};

use super::{FakeTx, lock};

#[derive(Default)]
enum Begin {
    /// Open a new `FakeTx` per call.
    #[default]
    Fresh,
    /// Hand out clones of one `FakeTx`.
    Returns(FakeTx),
    Fails(&'static str),
}

#[derive(Default)]
struct State {
    begin: Begin,
    calls: Vec<TxOptions>,
    opened: Vec<FakeTx>,
}

/// Transaction source double.
///
/// Honours the context: a cancelled or expired context fails `begin` with the
/// context error before any handle is produced.
#[derive(Clone, Default)]
pub struct FakeSource {
    state: Arc<Mutex<State>>,
}

impl FakeSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// ## Summary
    /// Makes every `begin` call return a clone of `tx`.
    pub fn begin_returns(&self, tx: &FakeTx) {
        lock(&self.state).begin = Begin::Returns(tx.clone());
    }

    pub fn begin_fails(&self, msg: &'static str) {
        lock(&self.state).begin = Begin::Fails(msg);
    }

    #[must_use]
    pub fn begin_call_count(&self) -> usize {
        lock(&self.state).calls.len()
    }

    /// ## Summary
    /// Returns the options passed to the `call`-th (0-based) `begin` call.
    #[must_use]
    pub fn begin_args_for_call(&self, call: usize) -> Option<TxOptions> {
        lock(&self.state).calls.get(call).copied()
    }

    /// ## Summary
    /// Every handle produced so far, in order.
    #[must_use]
    pub fn opened(&self) -> Vec<FakeTx> {
        lock(&self.state).opened.clone()
    }
}

impl TxSource for FakeSource {
    type Tx = FakeTx;

    async fn begin(&self, ctx: &Context, options: TxOptions) -> anyhow::Result<FakeTx> {
        let mut state = lock(&self.state);
        state.calls.push(options);
        if let Some(err) = ctx.err() {
            return Err(err.into());
        }
        let tx = match &state.begin {
            Begin::Fresh => FakeTx::new(),
            Begin::Returns(tx) => tx.clone(),
            Begin::Fails(msg) => return Err(anyhow::anyhow!(*msg)),
        };
        state.opened.push(tx.clone());
        Ok(tx)
    }
}
