use std::collections::VecDeque;

use crate::domain::ScoredDetection;

/// Total retained detections.
pub const HISTORY_CAP: usize = 100;
/// Slice of history exposed to UI queries.
pub const UI_HISTORY_LIMIT: usize = 50;

/// Bounded, most-recent-first buffer of accepted detections. Not an audit
/// log: pushing past capacity silently evicts the oldest entry.
#[derive(Debug, Default)]
pub struct DetectionHistory {
    entries: VecDeque<ScoredDetection>,
}

impl DetectionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, detection: ScoredDetection) {
        self.entries.push_front(detection);
        self.entries.truncate(HISTORY_CAP);
    }

    /// Most recent `limit` entries, newest first.
    pub fn recent(&self, limit: usize) -> Vec<ScoredDetection> {
        self.entries.iter().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
