//! Filesystem reads.
//!
//! ```
//! use hook_std::fs::{ReadFile, SystemFs};
//! use std::path::Path;
//!
//! fn load_secret<F: ReadFile>(fs: &F, path: &Path) -> Option<String> {
//!     fs.read_to_string(path).ok().map(|s| s.trim().to_string())
//! }
//!
//! let _secret = load_secret(&SystemFs, Path::new("/etc/webhook/hmac"));
//! ```

mod mem;
mod read_file;
mod system;

#[cfg(any(test, feature = "test-support"))]
pub use mem::MemFs;
pub use read_file::ReadFile;
pub use system::SystemFs;
