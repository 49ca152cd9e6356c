pub mod event;
pub mod types;

pub use event::{DetectionEvent, InvalidEvent, ScoredDetection};
pub use types::{
    CollectorKind, ConfigPatch, EventKind, KeywordCategories, MonitoringConfig, Sensitivity,
    SourceChannel,
};
