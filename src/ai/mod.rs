mod analysis;
mod client;

pub use analysis::{fallback_analysis, ContextAnalysis, ProductAnalysis, ProductInsight};
pub use client::ProductAnalyst;
