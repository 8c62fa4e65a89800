//! Environment variable access.
//!
//! ```
//! use hook_std::env::{ReadEnv, SystemEnv};
//!
//! fn listen_port<E: ReadEnv>(env: &E) -> u16 {
//!     env.var("PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(8888)
//! }
//!
//! let _port = listen_port(&SystemEnv);
//! ```

mod in_memory;
mod read_env;
mod system;

#[cfg(any(test, feature = "test-support"))]
pub use in_memory::InMemoryEnv;
pub use read_env::ReadEnv;
pub use system::SystemEnv;
