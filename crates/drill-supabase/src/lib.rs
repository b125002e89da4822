//! Supabase backends for the drill study log, over PostgREST and the auth
//! server's REST API.
//!
//! [`SharedClient`] talks to the application's own project (identities and
//! `user_settings`). [`ProjectClient`] talks to one user's personal project
//! and is built by [`SupabaseConnector`].

mod connector;
mod project;
mod rest;
mod shared;

pub mod error;

pub use connector::SupabaseConnector;
pub use error::{Error, Result};
pub use project::ProjectClient;
pub use shared::{SETTINGS_SQL, SharedClient};

#[cfg(test)]
mod tests;
