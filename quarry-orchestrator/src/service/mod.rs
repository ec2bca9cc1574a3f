//! Service Module
//!
//! Business logic layer for the orchestrator.
//! Services orchestrate between the run store, the explorer and the poll queue.

pub mod run;
pub mod segment;

// Re-export for convenience
pub use run as run_service;
pub use segment as segment_service;
