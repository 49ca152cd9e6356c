pub mod dispatch;
pub mod engine;

pub use dispatch::Dispatcher;
pub use engine::ContentMonitor;
