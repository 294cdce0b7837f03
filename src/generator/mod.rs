//! # Generator: stream values from one producer to consumers.
//!
//! A [`Generator`] drives a single [`Producer`] in a background task and
//! routes its emissions to a bounded result channel:
//!
//! ```text
//! Producer::run(ctx, emitter) ──emit──► results channel ──► consumer
//!                │
//!                └─ return value ──► terminal error slot ──► wait()
//! ```
//!
//! ## Rules
//! - A generator starts **exactly once**; a second `start` panics.
//! - The terminal error is recorded before the done signal fires and before
//!   the channel's closure is observable, so `wait()` after reading the
//!   stream to completion always sees the producer's actual outcome.
//! - A producer whose `emit` reports cancellation should return promptly;
//!   its cancellation cause becomes the generator's terminal error.

#[allow(clippy::module_inception)]
mod generator;
mod producer;

pub use generator::Generator;
pub use producer::Producer;
