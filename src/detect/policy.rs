use crate::domain::Sensitivity;

/// Fixed confidence cutoff above which an accepted detection additionally
/// interrupts the user with a proactive popup. Strictly greater-than:
/// exactly 0.6 is recorded but never popped. Independent of sensitivity;
/// under `Low` (threshold 0.7) every accepted detection clears this bar
/// too, and that overlap is intentional.
pub const POPUP_BAR: f64 = 0.6;

/// Acceptance threshold for a sensitivity level.
pub fn threshold(sensitivity: Sensitivity) -> f64 {
    match sensitivity {
        Sensitivity::High => 0.3,
        Sensitivity::Medium => 0.5,
        Sensitivity::Low => 0.7,
    }
}

pub fn should_popup(confidence: f64) -> bool {
    confidence > POPUP_BAR
}
