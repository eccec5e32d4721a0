// ncx-core/src/lib.rs

//! Core of the `ncx` netcat proxy.
//!
//! The pipeline runs strictly downstream:
//! [`resolver`] picks the real binary, [`proxy`] runs it with inherited stdin
//! and captured output, [`transcript`] packages the result, and
//! [`interpret`] asks a chat-completion backend to explain it.

pub mod config;
pub mod errors;
pub mod interpret;
pub mod models;
pub mod proxy;
pub mod resolver;
pub mod transcript;

pub use config::{BackendConfig, ProxyConfig};
pub use errors::{InterpretError, ProxyError, SENTINEL_EXIT_CODE};
pub use interpret::{Interpreter, OpenAiInterpreter};
pub use proxy::CapturedRun;
pub use resolver::{ResolutionSource, ResolvedBinary, Resolver};
pub use transcript::Transcript;
