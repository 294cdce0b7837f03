//! # Producer abstraction for generators.
//!
//! A [`Producer`] is the async body a [`Generator`](crate::Generator)
//! drives: it receives a [`Context`] and an [`Emitter`], streams zero or
//! more values, and its return value becomes the generator's terminal
//! error.
//!
//! Closures implement the trait directly, so most producers are written
//! inline:
//!
//! ```rust
//! use workstream::{Context, Emitter, Generator, TaskError};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut gen = Generator::new(|ctx: Context, emitter: Emitter<u32>| async move {
//!     for i in 0..3 {
//!         emitter.emit(&ctx, i).await?;
//!     }
//!     Ok::<_, TaskError>(())
//! });
//! # let _ = gen.results();
//! # }
//! ```

use std::future::Future;

use async_trait::async_trait;

use crate::context::Context;
use crate::emitter::Emitter;
use crate::error::TaskError;

/// User-supplied async generator body.
///
/// Consumed by value when the generator starts: generators are not
/// restartable, so each producer runs at most once.
///
/// ## Contract
/// - Do not retain the emitter past return; dropping it is part of the
///   stream's close protocol.
/// - Stop promptly when [`Emitter::emit`] returns a cancellation error.
#[async_trait]
pub trait Producer<T>: Send + 'static {
    /// Runs the producer to completion.
    ///
    /// The return value is recorded as the generator's terminal error and
    /// handed back by [`Generator::wait`](crate::Generator::wait).
    async fn run(self: Box<Self>, ctx: Context, emitter: Emitter<T>) -> Result<(), TaskError>;
}

#[async_trait]
impl<T, F, Fut> Producer<T> for F
where
    T: Send + 'static,
    F: FnOnce(Context, Emitter<T>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send,
{
    async fn run(self: Box<Self>, ctx: Context, emitter: Emitter<T>) -> Result<(), TaskError> {
        (*self)(ctx, emitter).await
    }
}
