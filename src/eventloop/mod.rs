//! # Event loop: serialise state mutations, publish versioned snapshots.
//!
//! An [`EventLoop`] funnels every state change through a single worker and
//! publishes the result as an immutable, monotonically versioned
//! [`StateSnapshot`]:
//!
//! ```text
//! send(ctx, event) ─lock─► generation n+1 ─queue─► loop worker
//!                                                    │ dispatch(n+1, state)
//!                                                    ▼
//!                      snapshot cell ◄─store── snapshot { state', n+1 }
//!                           │                           │
//!                       snapshot()              expire(snapshot n)
//! ```
//!
//! ## Rules
//! - One worker, so events are dispatched strictly in send order.
//! - The submission lock keeps returned generations aligned with dispatch
//!   order: if `send` A returns before `send` B begins, A's generation is
//!   lower and A's event runs first.
//! - The new snapshot is stored **before** the old one expires, so an
//!   observer woken by expiration that re-reads always sees the successor.
//! - Readers never touch loop state directly: [`EventLoop::snapshot`]
//!   hands out an `Arc` of an immutable snapshot whose `state()` is a
//!   clone.
//!
//! ## Waiting and watching
//! [`wait_for_generation`] blocks until the loop reaches a generation,
//! [`send_and_wait`] composes it with a send, and [`watch_state`] runs an
//! observer on every transition it can keep up with.

mod event;
#[allow(clippy::module_inception)]
mod eventloop;
mod snapshot;
mod wait;
mod watch;

pub use event::Event;
pub use eventloop::{EventLoop, GenerationID};
pub use snapshot::StateSnapshot;
pub use wait::{send_and_wait, wait_for_generation};
pub use watch::watch_state;
