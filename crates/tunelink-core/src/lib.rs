//! Queue synchronization and auto-advance engine for a remotely controlled player.
//!
//! The [`engine::Engine`] owns the local queue mirror ([`store::QueueStore`])
//! and serializes stream frames and user commands onto a single consumer.

pub mod advance;
pub mod commands;
pub mod engine;
pub mod events;
pub mod gateway;
pub mod health;
pub mod notify;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use tunelink_types as types;
