mod error;
mod handlers;
mod helpers;
mod notify;
mod router;
mod types;

pub use notify::StdoutBroadcaster;
pub use router::handle_request;
pub use types::{AppState, Request};
