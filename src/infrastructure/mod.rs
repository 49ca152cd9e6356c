pub mod directories;
pub mod instance_guard;
pub mod logging;
pub mod shutdown;

pub use directories::{ensure_directories, ResolvedPaths};
pub use instance_guard::InstanceGuard;
pub use logging::init_tracing;
pub use shutdown::{install_signal_handlers, Shutdown, ShutdownListener};
