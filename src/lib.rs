//! VoteHub - real-time collaborative voting.
//!
//! Clients submit votes over HTTP; every connected viewer receives the
//! resulting state over a WebSocket as soon as it changes.

pub mod config;
pub mod error;
pub mod hub;
pub mod server;
