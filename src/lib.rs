//! Prompt Wheel backend library: writing prompts by grade and section, a
//! random selection wheel, per-user finished tracking with local or remote
//! storage, narration, and the HTTP/WebSocket surface over all of it.

pub mod auth;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod error;
pub mod identity;
pub mod local_store;
pub mod logic;
pub mod progress;
pub mod protocol;
pub mod remote;
pub mod routes;
pub mod seeds;
pub mod selection;
pub mod speech;
pub mod state;
pub mod telemetry;
