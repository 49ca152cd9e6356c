use std::collections::{HashSet, VecDeque};

/// Soft cap on remembered fingerprints.
pub const LEDGER_CAP: usize = 100;
/// How many of the most recent fingerprints survive an overflow.
pub const LEDGER_RETAIN: usize = 50;

/// Bounded recency set of content fingerprints.
///
/// Insertion-order truncation rather than LRU: when the ledger grows past
/// [`LEDGER_CAP`] it keeps only the most recently inserted [`LEDGER_RETAIN`]
/// entries. It is never cleared entirely, so genuinely novel content is
/// never blocked for long and no per-entry timestamps are needed.
#[derive(Debug, Default)]
pub struct DedupLedger {
    seen: HashSet<String>,
    order: VecDeque<String>,
}

impl DedupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// True exactly when this fingerprint has not been seen within the
    /// current retention window.
    pub fn should_process(&self, fingerprint: &str) -> bool {
        !self.seen.contains(fingerprint)
    }

    /// Marks a fingerprint as processed. Idempotent; re-recording an entry
    /// does not refresh its position in the eviction order.
    pub fn record(&mut self, fingerprint: String) {
        if !self.seen.insert(fingerprint.clone()) {
            return;
        }
        self.order.push_back(fingerprint);

        if self.order.len() > LEDGER_CAP {
            while self.order.len() > LEDGER_RETAIN {
                if let Some(evicted) = self.order.pop_front() {
                    self.seen.remove(&evicted);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
