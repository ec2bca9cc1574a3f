//! Core domain types
//!
//! These types are shared between the orchestrator (which persists and polls
//! runs) and the CLI (which displays them).

pub mod run;
pub mod segment;
