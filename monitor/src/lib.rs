// Session management module (signal listener, throttling, controller)
pub mod session;

// Buffer snapshot logging (capture + log destination)
pub mod snapshot;

pub mod error;

// Async test helpers, shared with integration tests
#[doc(hidden)]
pub mod test_utils;

pub use error::MonitorError;
pub use session::config::Config;
pub use session::controller::{CoreController, HostCapabilities, SessionContext};
