use std::sync::{Arc, Mutex};

use diesel_async::scoped_futures::ScopedFutureExt;
use transact_db::{Context, WorkFuture};

use super::{FakeTx, lock};

type Behaviour<Tx> = Arc<dyn Fn(&Context, &mut Tx) -> anyhow::Result<()> + Send + Sync>;

struct State<Tx> {
    calls: usize,
    behaviour: Option<Behaviour<Tx>>,
}

/// Unit-of-work double. Succeeds without touching the transaction unless
/// programmed otherwise.
pub struct FakeWork<Tx = FakeTx> {
    state: Arc<Mutex<State<Tx>>>,
}

impl<Tx> Clone for FakeWork<Tx> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<Tx> Default for FakeWork<Tx> {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                calls: 0,
                behaviour: None,
            })),
        }
    }
}

impl<Tx> FakeWork<Tx> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// ## Summary
    /// Makes every invocation run `behaviour`. It may panic to simulate an
    /// abnormal termination.
    pub fn calls<F>(&self, behaviour: F)
    where
        F: Fn(&Context, &mut Tx) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        lock(&self.state).behaviour = Some(Arc::new(behaviour));
    }

    pub fn returns(&self, msg: &'static str) {
        self.calls(move |_, _| Err(anyhow::anyhow!(msg)));
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        lock(&self.state).calls
    }

    /// ## Summary
    /// The unit of work to hand to the runner; invocations are counted on `self`.
    pub fn spy<'a>(
        &self,
    ) -> impl for<'r> FnOnce(&'r Context, &'r mut Tx) -> WorkFuture<'a, 'r> + Send + 'a + use<'a, Tx>
    where
        Tx: Send + 'a,
    {
        let work = self.clone();
        move |ctx, tx| async move { work.call(ctx, tx) }.scope_boxed()
    }

    fn call(&self, ctx: &Context, tx: &mut Tx) -> anyhow::Result<()> {
        let behaviour = {
            let mut state = lock(&self.state);
            state.calls += 1;
            state.behaviour.clone()
        };
        behaviour.map_or(Ok(()), |behaviour| behaviour(ctx, tx))
    }
}
