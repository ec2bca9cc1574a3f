//! Segment catalog DTOs

use serde::{Deserialize, Serialize};

use crate::domain::segment::{Category, Segment, SegmentOption};

/// Public view of a catalog segment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentInfo {
    pub category: Category,
    pub label: String,
    pub tagline: String,
    pub options: Vec<SegmentOptionInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentOptionInfo {
    pub key: String,
    pub label: String,
    pub choices: Vec<String>,
    pub default: String,
}

impl From<&Segment> for SegmentInfo {
    fn from(segment: &Segment) -> Self {
        let options = segment.options.iter().map(SegmentOptionInfo::from);
        Self {
            category: segment.category,
            label: segment.label.to_string(),
            tagline: segment.tagline.to_string(),
            options: options.collect(),
        }
    }
}

impl From<&SegmentOption> for SegmentOptionInfo {
    fn from(option: &SegmentOption) -> Self {
        Self {
            key: option.key.to_string(),
            label: option.label.to_string(),
            choices: option.choices.iter().map(|c| c.to_string()).collect(),
            default: option.default.to_string(),
        }
    }
}
