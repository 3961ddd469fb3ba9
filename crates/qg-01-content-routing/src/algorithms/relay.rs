//! Fan-in relay for merged result streams.
//!
//! Producers run as tasks in a `JoinSet` and push into one bounded channel.
//! The consumer-facing `RelayStream` ends when every producer has finished,
//! when the request context is cancelled, or when it is dropped. Dropping
//! it cancels the producers' token and aborts their tasks.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::stream::{BoxStream, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::{CancellationToken, DropGuard};

const RELAY_BUFFER: usize = 64;

/// Instant `limit` from now, or `None` when that lies beyond the clock's range.
pub(crate) fn deadline_after(limit: Duration) -> Option<tokio::time::Instant> {
    tokio::time::Instant::now().checked_add(limit)
}

/// Resolves at `deadline`, never when there is none.
pub(crate) async fn expires_at(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Collects producers feeding a single merged stream.
pub struct Relay<T> {
    tx: mpsc::Sender<T>,
    rx: mpsc::Receiver<T>,
    tasks: JoinSet<()>,
    token: CancellationToken,
    ctx: CancellationToken,
}

impl<T: Send + 'static> Relay<T> {
    /// New relay scoped to a child of `ctx`.
    pub fn new(ctx: &CancellationToken) -> Self {
        let (tx, rx) = mpsc::channel(RELAY_BUFFER);
        Self {
            tx,
            rx,
            tasks: JoinSet::new(),
            token: ctx.child_token(),
            ctx: ctx.clone(),
        }
    }

    /// Token cancelled when the relay's consumer goes away.
    #[cfg(test)]
    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Spawn a producer. It receives its own sender and the relay token.
    pub fn spawn<F, Fut>(&mut self, producer: F)
    where
        F: FnOnce(mpsc::Sender<T>, CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let fut = producer(self.tx.clone(), self.token.clone());
        self.tasks.spawn(fut);
    }

    /// Spawn a producer that waits `delay`, opens `source` and forwards it
    /// until it ends, the token is cancelled, `limit` elapses or the
    /// consumer hangs up. `limit` counts from the end of the delay.
    pub fn forward<S>(&mut self, delay: Duration, limit: Option<Duration>, source: S)
    where
        S: FnOnce(&CancellationToken) -> BoxStream<'static, T> + Send + 'static,
    {
        self.spawn(move |tx, token| forward(source, tx, token, delay, limit));
    }

    /// Close the producer side and hand out the merged stream.
    pub fn into_stream(self) -> RelayStream<T> {
        let Self {
            tx,
            rx,
            tasks,
            token,
            ctx,
        } = self;
        drop(tx);

        RelayStream {
            rx,
            tasks,
            cancelled: Box::pin(async move { ctx.cancelled().await }),
            _guard: token.drop_guard(),
            done: false,
        }
    }
}

async fn forward<T, S>(
    source: S,
    tx: mpsc::Sender<T>,
    token: CancellationToken,
    delay: Duration,
    limit: Option<Duration>,
) where
    S: FnOnce(&CancellationToken) -> BoxStream<'static, T>,
{
    if !delay.is_zero() {
        tokio::select! {
            _ = token.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    let mut source = source(&token);
    let expired = expires_at(limit.and_then(deadline_after));
    tokio::pin!(expired);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => return,
            _ = &mut expired => return,
            item = source.next() => match item {
                Some(item) => {
                    if tx.send(item).await.is_err() {
                        return;
                    }
                }
                None => return,
            },
        }
    }
}

/// Merged output of a `Relay`.
pub struct RelayStream<T> {
    rx: mpsc::Receiver<T>,
    tasks: JoinSet<()>,
    cancelled: Pin<Box<dyn Future<Output = ()> + Send>>,
    _guard: DropGuard,
    done: bool,
}

impl<T> Unpin for RelayStream<T> {}

impl<T> RelayStream<T> {
    fn finish(&mut self) {
        self.done = true;
        self.rx.close();
        self.tasks.abort_all();
    }
}

impl<T> Stream for RelayStream<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        if this.cancelled.as_mut().poll(cx).is_ready() {
            this.finish();
            return Poll::Ready(None);
        }
        match this.rx.poll_recv(cx) {
            Poll::Ready(Some(item)) => Poll::Ready(Some(item)),
            Poll::Ready(None) => {
                this.finish();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
