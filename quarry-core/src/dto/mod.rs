//! Data Transfer Objects for the orchestrator API
//!
//! DTOs are lightweight representations of domain entities optimized for
//! network transfer between the orchestrator and its callers.

pub mod run;
pub mod segment;
