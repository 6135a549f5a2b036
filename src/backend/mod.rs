//! Backend Layer
//!
//! Abstractions over the remote auth + row store, plus implementations.

mod http;
mod memory;
mod traits;


pub use http::{BackendConfig, HttpBackend};
pub use memory::{MemoryBackend, TaskOp};
pub use traits::{AuthBackend, TaskBackend};
