//! # Versioned, expirable state snapshots.
//!
//! A [`StateSnapshot`] is an immutable view of the loop's state at one
//! generation. [`StateSnapshot::state`] hands back a **clone**, so no
//! reader can corrupt what the loop stores; the copy discipline is whatever
//! `S: Clone` does:
//!
//! - plain values copy,
//! - `HashMap`/`Vec` clone shallowly (shared `Arc` elements stay shared),
//! - a hand-written `Clone` impl gives copy-on-write or deep-copy,
//! - `Arc<Immutable>` state makes the clone a pointer bump.
//!
//! The expiration signal closes when the loop publishes the next snapshot;
//! wait on it to learn that a re-read will observe something newer.

use tokio_util::sync::CancellationToken;

use crate::eventloop::eventloop::GenerationID;

/// Immutable view of state `S` at one generation.
#[derive(Debug)]
pub struct StateSnapshot<S> {
    state: S,
    generation: GenerationID,
    expired: CancellationToken,
}

impl<S: Clone + Send + Sync + 'static> StateSnapshot<S> {
    /// Creates an initial snapshot at generation 0.
    pub fn new(state: S) -> Self {
        Self::with_generation(state, 0)
    }

    /// Creates an initial snapshot at an explicit base generation.
    ///
    /// The event loop seeds its counter from this value, so a loop can be
    /// rebuilt mid-history without reissuing old generations.
    pub fn with_generation(state: S, generation: GenerationID) -> Self {
        Self {
            state,
            generation,
            expired: CancellationToken::new(),
        }
    }

    /// A clone of the state at the time of the snapshot.
    pub fn state(&self) -> S {
        self.state.clone()
    }

    /// The generation this snapshot belongs to. Monotonically non-decreasing
    /// across a loop's published snapshots.
    pub fn generation(&self) -> GenerationID {
        self.generation
    }

    /// Completes when this snapshot has been superseded.
    ///
    /// If the loop closes first, this never completes; combine with the
    /// loop's done signal (as [`wait_for_generation`](crate::wait_for_generation)
    /// does) to observe shutdown.
    pub async fn expired(&self) {
        self.expired.cancelled().await;
    }

    /// Whether a successor snapshot has been published.
    pub fn is_expired(&self) -> bool {
        self.expired.is_cancelled()
    }

    /// Closes the expiration signal. Idempotent; called by the loop worker
    /// after the successor is stored.
    pub(crate) fn expire(&self) {
        self.expired.cancel();
    }

    /// The successor snapshot: new state, generation + 1, fresh expiration
    /// signal. The loop worker is the only caller.
    pub(crate) fn next(&self, state: S) -> Self {
        Self {
            state,
            generation: self.generation + 1,
            expired: CancellationToken::new(),
        }
    }
}
