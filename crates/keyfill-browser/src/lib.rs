mod cdp_host;
mod error;

pub use cdp_host::{CdpHost, DEFAULT_DEBUGGING_PORT};
pub use error::{Error, Result};
