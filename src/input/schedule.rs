//! `schedule`: paces a child input on a fixed interval.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error_handling::InputError;
use crate::input::{Batch, Input};

/// Delegates every read to the child once the next tick arrives.
///
/// The first tick fires immediately; missed ticks are not replayed.
pub struct ScheduleInput {
    child: Box<dyn Input>,
    period: Duration,
    /// Started on the first read, inside the host's runtime.
    ticker: Mutex<Option<Interval>>,
}

impl ScheduleInput {
    pub const NAME: &'static str = "schedule";

    /// Wraps `child`. A zero `period` is raised to one millisecond.
    pub fn new(child: Box<dyn Input>, period: Duration) -> Self {
        ScheduleInput {
            child,
            period: period.max(Duration::from_millis(1)),
            ticker: Mutex::new(None),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn child_name(&self) -> &'static str {
        self.child.name()
    }
}

#[async_trait]
impl Input for ScheduleInput {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn connect(&self, cancel: &CancellationToken) -> Result<(), InputError> {
        self.child.connect(cancel).await
    }

    async fn read_batch(&self, cancel: &CancellationToken) -> Result<Batch, InputError> {
        let mut guard = self.ticker.lock().await;
        let ticker = guard.get_or_insert_with(|| {
            let mut ticker = interval(self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        tokio::select! {
            _ = cancel.cancelled() => return Err(InputError::EndOfInput),
            _ = ticker.tick() => {}
        }
        drop(guard);
        self.child.read_batch(cancel).await
    }

    async fn close(&self, cancel: &CancellationToken) -> Result<(), InputError> {
        self.child.close(cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Message;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingInput {
        reads: Arc<AtomicUsize>,
        closed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Input for CountingInput {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn connect(&self, _cancel: &CancellationToken) -> Result<(), InputError> {
            Ok(())
        }

        async fn read_batch(&self, _cancel: &CancellationToken) -> Result<Batch, InputError> {
            let n = self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(Batch::new(vec![Message::new(json!({ "n": n }))]))
        }

        async fn close(&self, _cancel: &CancellationToken) -> Result<(), InputError> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn schedule(period: Duration) -> (ScheduleInput, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let reads = Arc::new(AtomicUsize::new(0));
        let closed = Arc::new(AtomicUsize::new(0));
        let child = CountingInput {
            reads: Arc::clone(&reads),
            closed: Arc::clone(&closed),
        };
        (ScheduleInput::new(Box::new(child), period), reads, closed)
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_is_immediate_then_paced() {
        let (input, reads, _) = schedule(Duration::from_secs(60));
        let cancel = CancellationToken::new();
        let start = tokio::time::Instant::now();

        let batch = input.read_batch(&cancel).await.unwrap();
        assert_eq!(batch.messages[0].content["n"], 0);
        assert!(start.elapsed() < Duration::from_secs(1));

        input.read_batch(&cancel).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(60));
        assert_eq!(reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_wait_is_end_of_input() {
        let (input, reads, _) = schedule(Duration::from_secs(3600));
        let cancel = CancellationToken::new();
        input.read_batch(&cancel).await.unwrap();

        cancel.cancel();
        let err = input.read_batch(&cancel).await.unwrap_err();
        assert!(err.is_end_of_input());
        assert_eq!(reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_close_closes_child() {
        let (input, _, closed) = schedule(Duration::from_secs(1));
        assert_eq!(input.child_name(), "counting");
        input.close(&CancellationToken::new()).await.unwrap();
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }
}
