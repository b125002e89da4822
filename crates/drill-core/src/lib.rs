//! Core types, traits, and state machines for the drill study log.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Backend adapters implement the traits in [`store`]; the client cache,
//! connection status, and setup flow are written against those traits.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod attempt;
pub mod cache;
pub mod error;
pub mod identity;
pub mod note;
pub mod schema;
pub mod setup;
pub mod status;
pub mod store;
pub mod summary;

#[cfg(test)]
mod testing;

pub use error::{Error, ErrorKind, Result};
