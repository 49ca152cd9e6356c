pub mod dedup;
pub mod fingerprint;
pub mod history;
pub mod policy;
pub mod scorer;

pub use dedup::DedupLedger;
pub use fingerprint::fingerprint;
pub use history::DetectionHistory;
