//! Gap-bounded stream.
//!
//! Forwards an inner stream while re-arming one reusable timer every time
//! an item is handed to the consumer. If the timer fires before the next
//! item arrives, the stream ends as if the source had finished and the
//! source's token is cancelled. Total duration is unbounded; only the gaps
//! are. The first gap starts at the first poll, not at construction.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::stream::Stream;
use pin_project_lite::pin_project;
use tokio::time::{Instant, Sleep};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Where the forwarding loop currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeadlineState {
    /// Timer armed, no item yet since it was armed.
    Waiting,
    /// An item was just forwarded and the timer re-armed.
    ItemForwarded,
    /// The timer fired; the source was cancelled.
    TimedOut,
    /// The source ended.
    Done,
}

pin_project! {
    /// Stream adaptor that ends silently after a gap longer than `gap`.
    pub struct DeadlineStream<S> {
        #[pin]
        inner: S,
        #[pin]
        timer: Sleep,
        gap: Duration,
        armed: bool,
        state: DeadlineState,
        source: CancellationToken,
    }
}

impl<S> DeadlineStream<S> {
    /// The timer is armed on the first poll. `source` is cancelled on
    /// timeout or completion.
    pub fn new(inner: S, gap: Duration, source: CancellationToken) -> Self {
        Self {
            inner,
            timer: tokio::time::sleep(gap),
            gap,
            armed: false,
            state: DeadlineState::Waiting,
            source,
        }
    }

    pub fn state(&self) -> DeadlineState {
        self.state
    }
}

impl<S: Stream> Stream for DeadlineStream<S> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        match *this.state {
            DeadlineState::TimedOut | DeadlineState::Done => return Poll::Ready(None),
            DeadlineState::ItemForwarded => *this.state = DeadlineState::Waiting,
            DeadlineState::Waiting => {}
        }
        if !*this.armed {
            rearm(this.timer.as_mut(), *this.gap);
            *this.armed = true;
        }

        match this.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(item)) => {
                rearm(this.timer.as_mut(), *this.gap);
                *this.state = DeadlineState::ItemForwarded;
                return Poll::Ready(Some(item));
            }
            Poll::Ready(None) => {
                *this.state = DeadlineState::Done;
                this.source.cancel();
                return Poll::Ready(None);
            }
            Poll::Pending => {}
        }

        if this.timer.as_mut().poll(cx).is_ready() {
            debug!(gap = ?this.gap, "[qg-02] Block stream stalled, closing");
            *this.state = DeadlineState::TimedOut;
            this.source.cancel();
            return Poll::Ready(None);
        }
        Poll::Pending
    }
}

/// Push the deadline `gap` past now. A gap beyond the clock's range keeps
/// the saturated deadline the timer was built with.
fn rearm(timer: Pin<&mut Sleep>, gap: Duration) {
    if let Some(at) = Instant::now().checked_add(gap) {
        timer.reset(at);
    }
}
