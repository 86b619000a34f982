use std::{collections::VecDeque, time::Duration};

use tokio::{sync::Mutex, time::Instant};

use crate::{ResultEngine, a1::CellRange};

use super::{Grid, MajorDimension, RangeStore};

/// Rate limiting decorator for a [`RangeStore`].
///
/// At most `max_queries` requests are let through in any window of `window`
/// duration; a request beyond that sleeps until the oldest remembered request
/// leaves the window. Requests are otherwise forwarded untouched.
#[derive(Debug)]
pub struct Throttled<S> {
    inner: S,
    window: Duration,
    max_queries: usize,
    history: Mutex<VecDeque<Instant>>,
}

impl<S: RangeStore> Throttled<S> {
    pub fn new(inner: S, max_queries: usize, window: Duration) -> Self {
        let max_queries = max_queries.max(1);
        Self {
            inner,
            window,
            max_queries,
            history: Mutex::new(VecDeque::with_capacity(max_queries)),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn throttle(&self) {
        let mut history = self.history.lock().await;
        if history.len() >= self.max_queries
            && let Some(oldest) = history.pop_front()
        {
            let ready_at = oldest + self.window;
            if ready_at > Instant::now() {
                tracing::warn!(
                    "throttling: {} requests in the last {:?}, waiting {:?}",
                    self.max_queries,
                    self.window,
                    ready_at - Instant::now()
                );
                tokio::time::sleep_until(ready_at).await;
            }
        }
        history.push_back(Instant::now());
    }
}

impl<S: RangeStore> RangeStore for Throttled<S> {
    async fn get(
        &self,
        sheet: &str,
        range: &CellRange,
        major: MajorDimension,
    ) -> ResultEngine<Grid> {
        self.throttle().await;
        self.inner.get(sheet, range, major).await
    }

    async fn set(
        &self,
        sheet: &str,
        range: &CellRange,
        data: Grid,
        major: MajorDimension,
    ) -> ResultEngine<()> {
        self.throttle().await;
        self.inner.set(sheet, range, data, major).await
    }

    async fn clear(&self, sheet: &str, range: &CellRange) -> ResultEngine<()> {
        self.throttle().await;
        self.inner.clear(sheet, range).await
    }
}
