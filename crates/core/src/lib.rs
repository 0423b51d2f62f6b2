// dirqueue Core - Queue state machine, claim protocol & ports
// NO filesystem layout or process spawning here (see infra-fs, infra-system)

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use error::{AppError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
