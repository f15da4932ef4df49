#![warn(clippy::pedantic)]
// Noisy doc/signature lints on every pub fn
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
// Keeping format!("{}", x) over format!("{x}") for readability with complex exprs
#![allow(clippy::uninlined_format_args)]
// session::SessionStore, session::SessionManager, ...
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod session;
pub(crate) mod utils;

pub use errors::{SessionError, SessionResult};

/// Re-exports for fuzz targets. Not part of the public API.
#[doc(hidden)]
pub mod fuzz_api {
    use crate::session::Session;

    /// Decode session file content under a fixed id.
    pub fn decode_session_file(content: &str) -> anyhow::Result<Session> {
        crate::session::file::codec::decode("fuzz", content)
    }
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
