use std::sync::{Arc, Mutex};

use transact_db::{Context, TxHandle};

use super::lock;

type Stub = Arc<dyn Fn(usize) -> anyhow::Result<()> + Send + Sync>;

#[derive(Clone, Copy)]
enum Terminal {
    Commit,
    Rollback,
}

#[derive(Default)]
struct State {
    commit_calls: usize,
    rollback_calls: usize,
    statements: Vec<String>,
    commit_stub: Option<Stub>,
    rollback_stub: Option<Stub>,
}

/// Transaction handle double. Commits and rolls back successfully unless stubbed.
#[derive(Clone, Default)]
pub struct FakeTx {
    state: Arc<Mutex<State>>,
}

impl FakeTx {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// ## Summary
    /// Makes every commit call invoke `stub` with the 1-based call number.
    pub fn commit_calls<F>(&self, stub: F)
    where
        F: Fn(usize) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        lock(&self.state).commit_stub = Some(Arc::new(stub));
    }

    /// ## Summary
    /// Makes every rollback call invoke `stub` with the 1-based call number.
    pub fn rollback_calls<F>(&self, stub: F)
    where
        F: Fn(usize) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        lock(&self.state).rollback_stub = Some(Arc::new(stub));
    }

    pub fn commit_fails(&self, msg: &'static str) {
        self.commit_calls(move |_| Err(anyhow::anyhow!(msg)));
    }

    pub fn rollback_fails(&self, msg: &'static str) {
        self.rollback_calls(move |_| Err(anyhow::anyhow!(msg)));
    }

    #[must_use]
    pub fn commit_call_count(&self) -> usize {
        lock(&self.state).commit_calls
    }

    #[must_use]
    pub fn rollback_call_count(&self) -> usize {
        lock(&self.state).rollback_calls
    }

    /// ## Summary
    /// Number of commit and rollback calls combined.
    #[must_use]
    pub fn terminal_call_count(&self) -> usize {
        let state = lock(&self.state);
        state.commit_calls + state.rollback_calls
    }

    #[must_use]
    pub fn exec_call_count(&self) -> usize {
        lock(&self.state).statements.len()
    }

    #[must_use]
    pub fn statements(&self) -> Vec<String> {
        lock(&self.state).statements.clone()
    }

    /// ## Summary
    /// Records `sql` as executed inside the transaction.
    ///
    /// ## Errors
    /// Never fails; the signature mirrors a real handle's.
    pub fn exec(&mut self, sql: &str) -> anyhow::Result<()> {
        lock(&self.state).statements.push(sql.to_string());
        Ok(())
    }

    fn resolve(&self, terminal: Terminal) -> anyhow::Result<()> {
        // The stub runs without the lock held so it may inspect this double.
        let (call, stub) = {
            let mut state = lock(&self.state);
            match terminal {
                Terminal::Commit => {
                    state.commit_calls += 1;
                    (state.commit_calls, state.commit_stub.clone())
                }
                Terminal::Rollback => {
                    state.rollback_calls += 1;
                    (state.rollback_calls, state.rollback_stub.clone())
                }
            }
        };
        stub.map_or(Ok(()), |stub| stub(call))
    }
}

impl TxHandle for FakeTx {
    async fn commit(&mut self, _ctx: &Context) -> anyhow::Result<()> {
        self.resolve(Terminal::Commit)
    }

    async fn rollback(&mut self, _ctx: &Context) -> anyhow::Result<()> {
        self.resolve(Terminal::Rollback)
    }
}
