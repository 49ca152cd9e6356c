pub mod router;
pub mod types;

pub use router::Router;
pub use types::{channel, BusClient, ContextNotice, Envelope, Request, Response};
