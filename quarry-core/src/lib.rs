//! Quarry Core
//!
//! Core types shared by the Quarry services.
//!
//! This crate contains:
//! - Domain types: segment runs, their lifecycle status and the segment catalog
//! - DTOs: Data transfer objects for the orchestrator HTTP API

pub mod domain;
pub mod dto;
