//! Interleave host polling with a foreground sequence.
//!
//! Every form here owns its [`PollScope`] and ends it exactly once, whether
//! the sequence runs out, the pump fails, the consumer errors out, or the
//! consumer simply stops pulling and drops the sequence.

use std::pin::Pin;

use futures::stream::{self, Stream, StreamExt};

use crate::config::PollOptions;
use crate::host::SharedHost;
use crate::poll::bridge::BlockingPoller;
use crate::poll::error::PollError;
use crate::poll::lifecycle::FinishReason;
use crate::poll::scope::PollScope;

struct StreamState<S> {
    scope: PollScope,
    inner: Pin<Box<S>>,
    n: usize,
    started: bool,
}

/// Wrap `stream` so that `n` host loop iterations run between elements.
///
/// Acquisition happens up front, so `AlreadyActive` is reported here rather
/// than on the first element.
pub fn with_polling<S>(
    host: SharedHost,
    stream: S,
    n: usize,
) -> Result<impl Stream<Item = Result<S::Item, PollError>>, PollError>
where
    S: Stream,
{
    let state = StreamState {
        scope: PollScope::acquire(host)?,
        inner: Box::pin(stream),
        n,
        started: false,
    };

    Ok(stream::unfold(Some(state), |state| async move {
        let mut state = state?;
        if state.started {
            if let Err(e) = state.scope.poll(state.n).await {
                return Some((Err(e), None));
            }
        }
        state.started = true;

        match state.inner.next().await {
            Some(item) => Some((Ok(item), Some(state))),
            None => {
                state.scope.finish(FinishReason::Exhausted);
                None
            }
        }
    }))
}

/// Blocking counterpart of [`with_polling`], driven through a [`BlockingPoller`].
pub struct PollingIter<I> {
    inner: I,
    n: usize,
    started: bool,
    poller: Option<BlockingPoller>,
    scope: Option<PollScope>,
}

pub fn with_polling_blocking<I>(
    host: SharedHost,
    iter: I,
    n: usize,
) -> Result<PollingIter<I::IntoIter>, PollError>
where
    I: IntoIterator,
{
    let scope = PollScope::acquire(host)?;
    let poller = scope.blocking()?;
    Ok(PollingIter {
        inner: iter.into_iter(),
        n,
        started: false,
        poller: Some(poller),
        scope: Some(scope),
    })
}

impl<I> PollingIter<I> {
    fn close(&mut self, reason: FinishReason) {
        // The worker must be joined before the scope hands off to replay.
        self.poller.take();
        if let Some(scope) = self.scope.take() {
            scope.finish(reason);
        }
    }
}

impl<I: Iterator> Iterator for PollingIter<I> {
    type Item = Result<I::Item, PollError>;

    fn next(&mut self) -> Option<Self::Item> {
        let poller = self.poller.as_ref()?;
        if self.started {
            if let Err(e) = poller.poll(self.n) {
                self.close(FinishReason::Dropped);
                return Some(Err(e));
            }
        }
        self.started = true;

        match self.inner.next() {
            Some(item) => Some(Ok(item)),
            None => {
                self.close(FinishReason::Exhausted);
                None
            }
        }
    }
}

impl<I> Drop for PollingIter<I> {
    fn drop(&mut self) {
        self.close(FinishReason::Dropped);
    }
}

/// Call `predicate` until it yields a value, polling the host in between.
///
/// Each round calls the predicate, runs `options.iterations` loop iterations
/// and then sleeps `options.interval` if one is set. Callers wanting a
/// timeout check elapsed time inside the predicate.
pub fn poll_until<T, F>(
    host: SharedHost,
    mut predicate: F,
    options: &PollOptions,
) -> Result<T, PollError>
where
    F: FnMut() -> Option<T>,
{
    try_poll_until(host, || Ok::<_, PollError>(predicate()), options)
}

/// [`poll_until`] with a fallible predicate. The predicate's error ends the
/// scope and is returned unchanged.
pub fn try_poll_until<T, E, F>(
    host: SharedHost,
    mut predicate: F,
    options: &PollOptions,
) -> Result<T, E>
where
    F: FnMut() -> Result<Option<T>, E>,
    E: From<PollError>,
{
    let scope = PollScope::acquire_with(host, options.replay)?;
    let poller = scope.blocking()?;

    loop {
        if let Some(value) = predicate()? {
            drop(poller);
            scope.release();
            return Ok(value);
        }
        poller.poll(options.iterations)?;
        if let Some(interval) = options.interval {
            std::thread::sleep(interval);
        }
    }
}

/// Suspending form of [`poll_until`] for callers already inside the host loop.
pub async fn poll_until_async<T, F>(
    host: SharedHost,
    mut predicate: F,
    options: &PollOptions,
) -> Result<T, PollError>
where
    F: FnMut() -> Option<T>,
{
    let scope = PollScope::acquire_with(host, options.replay)?;

    loop {
        if let Some(value) = predicate() {
            scope.release();
            return Ok(value);
        }
        scope.poll(options.iterations).await?;
        if let Some(interval) = options.interval {
            tokio::time::sleep(interval).await;
        }
    }
}
