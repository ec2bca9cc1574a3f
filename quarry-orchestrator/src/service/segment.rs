//! Segment Service
//!
//! Read access to the static segment catalog.

use quarry_core::domain::segment::catalog;
use quarry_core::dto::segment::SegmentInfo;

/// List every segment a run can target
pub fn list_segments() -> Vec<SegmentInfo> {
    catalog().iter().map(SegmentInfo::from).collect()
}
