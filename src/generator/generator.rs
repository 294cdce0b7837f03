use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::context::Context;
use crate::emitter::Emitter;
use crate::error::TaskError;
use crate::generator::producer::Producer;

/// Driver for a single [`Producer`].
///
/// Owns the bounded result channel, the completion signal, and the terminal
/// error slot. Created unstarted; [`Generator::start`] (or
/// [`Generator::run`]) may be called exactly once.
pub struct Generator<T> {
    producer: Option<Box<dyn Producer<T>>>,
    sender: Option<mpsc::Sender<T>>,
    receiver: Option<mpsc::Receiver<T>>,
    outcome: Arc<OnceLock<Result<(), TaskError>>>,
    done: CancellationToken,
    started: AtomicBool,
}

impl<T: Send + 'static> Generator<T> {
    /// Creates (but does not start) a generator with no result buffering
    /// beyond the single in-flight value a bounded tokio channel holds.
    pub fn new(producer: impl Producer<T>) -> Self {
        Self::new_buffered(producer, 0)
    }

    /// Creates (but does not start) a generator with the given result
    /// buffer size.
    ///
    /// A `buffer` of 0 is treated as 1: tokio bounded channels always admit
    /// one in-flight value, so an unbuffered producer runs at most one
    /// emission ahead of its consumer.
    pub fn new_buffered(producer: impl Producer<T>, buffer: usize) -> Self {
        let (tx, rx) = mpsc::channel(buffer.max(1));

        Self {
            producer: Some(Box::new(producer)),
            sender: Some(tx),
            receiver: Some(rx),
            outcome: Arc::new(OnceLock::new()),
            done: CancellationToken::new(),
            started: AtomicBool::new(false),
        }
    }

    /// Starts the producer in a background task.
    ///
    /// # Panics
    /// Panics if the generator has already been started.
    pub fn start(&mut self, ctx: &Context) {
        if self.started.swap(true, Ordering::SeqCst) {
            panic!("attempt to start a previously started Generator");
        }

        let producer = self
            .producer
            .take()
            .expect("producer present until first start");
        let tx = self.sender.take().expect("sender present until first start");
        let outcome = Arc::clone(&self.outcome);
        let done = self.done.clone();
        let ctx = ctx.clone();

        tokio::spawn(async move {
            let emitter = Emitter::new(tx.clone());
            let result = producer.run(ctx, emitter).await;

            // Record the outcome, then signal completion, then let the
            // channel close. Consumers that read the stream to its end are
            // therefore guaranteed to observe the final error via wait().
            let _ = outcome.set(result);
            done.cancel();
            drop(tx);
        });
    }

    /// Starts the generator and waits for the producer to finish.
    pub async fn run(&mut self, ctx: &Context) -> Result<(), TaskError> {
        self.start(ctx);

        self.wait().await
    }

    /// Takes the read side of the result channel.
    ///
    /// # Panics
    /// Panics if the receiver has already been taken; it is a single
    /// consumer handle.
    pub fn results(&mut self) -> mpsc::Receiver<T> {
        self.receiver
            .take()
            .expect("generator results receiver already taken")
    }

    /// Waits for the producer to finish and returns its terminal error.
    ///
    /// Safe to await repeatedly and from multiple tasks; every waiter
    /// observes the same value.
    pub async fn wait(&self) -> Result<(), TaskError> {
        self.done.cancelled().await;

        self.outcome
            .get()
            .cloned()
            .expect("outcome recorded before completion signal")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    #[tokio::test]
    async fn round_trip_in_order() {
        let mut gen = Generator::new_buffered(
            |ctx: Context, emitter: Emitter<u32>| async move {
                for i in [1, 2, 3] {
                    emitter.emit(&ctx, i).await?;
                }
                Ok(())
            },
            3,
        );

        let mut rx = gen.results();
        gen.start(&Context::background());

        let mut seen = Vec::new();
        while let Some(v) = rx.recv().await {
            seen.push(v);
        }
        assert_eq!(seen, vec![1, 2, 3]);
        assert_eq!(gen.wait().await, Ok(()));
    }

    #[tokio::test]
    async fn producer_error_becomes_terminal() {
        let mut gen = Generator::new(|ctx: Context, emitter: Emitter<u32>| async move {
            emitter.emit(&ctx, 1).await?;
            Err(TaskError::fail("exploded"))
        });

        let mut rx = gen.results();
        gen.start(&Context::background());

        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(rx.recv().await, None);
        assert_eq!(gen.wait().await, Err(TaskError::fail("exploded")));
    }

    #[tokio::test]
    async fn cancellation_cause_propagates_to_wait() {
        let ctx = Context::background().child();
        let mut gen = Generator::new(|ctx: Context, emitter: Emitter<u32>| async move {
            for i in 1..=5 {
                emitter.emit(&ctx, i).await?;
            }
            Ok(())
        });

        let mut rx = gen.results();
        ctx.cancel(TaskError::fail("consumer left"));
        gen.start(&ctx);

        // Drain whatever made it out before the producer noticed.
        let mut received = 0;
        while rx.recv().await.is_some() {
            received += 1;
        }
        assert!(received <= 5);
        assert_eq!(gen.wait().await, Err(TaskError::fail("consumer left")));
    }

    #[tokio::test]
    async fn unbuffered_producer_stays_one_ahead() {
        let mut gen = Generator::new(|ctx: Context, emitter: Emitter<u32>| async move {
            for i in 0..4 {
                emitter.emit(&ctx, i).await?;
            }
            Ok(())
        });

        let mut rx = gen.results();
        gen.start(&Context::background());

        // With no consumer progress the producer cannot finish: the channel
        // admits a single in-flight value.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(gen.outcome.get().is_none());

        let mut seen = Vec::new();
        while let Some(v) = rx.recv().await {
            seen.push(v);
        }
        assert_eq!(seen, vec![0, 1, 2, 3]);
        assert_eq!(gen.wait().await, Ok(()));
    }

    #[tokio::test]
    #[should_panic(expected = "previously started Generator")]
    async fn double_start_panics() {
        let mut gen = Generator::new(|_ctx: Context, _emitter: Emitter<u32>| async move {
            Ok::<_, TaskError>(())
        });
        let ctx = Context::background();
        gen.start(&ctx);
        gen.start(&ctx);
    }

    #[tokio::test]
    #[should_panic(expected = "results receiver already taken")]
    async fn results_retake_panics() {
        let mut gen = Generator::new(|_ctx: Context, _emitter: Emitter<u32>| async move {
            Ok::<_, TaskError>(())
        });
        let _rx = gen.results();
        let _ = gen.results();
    }

    #[tokio::test]
    async fn run_is_start_then_wait() {
        let mut gen = Generator::new(|ctx: Context, emitter: Emitter<&'static str>| async move {
            emitter.emit(&ctx, "only").await
        });

        let mut rx = gen.results();
        let consumer = tokio::spawn(async move {
            let mut seen = Vec::new();
            while let Some(v) = rx.recv().await {
                seen.push(v);
            }
            seen
        });

        assert_eq!(gen.run(&Context::background()).await, Ok(()));
        assert_eq!(consumer.await.expect("join"), vec!["only"]);
    }
}
