//! Segment API Handlers

use axum::Json;
use quarry_core::dto::segment::SegmentInfo;

use crate::service::segment_service;

/// GET /api/segments
/// List the segment catalog
pub async fn list_segments() -> Json<Vec<SegmentInfo>> {
    Json(segment_service::list_segments())
}
