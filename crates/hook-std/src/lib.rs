//! Thin trait seams over `std` so configuration and secret loading can be
//! exercised without touching the real process environment or filesystem.
//!
//! | Concern | Trait | Production | Test |
//! |---------|-------|------------|------|
//! | Env vars | [`ReadEnv`] | [`SystemEnv`] | `InMemoryEnv`* |
//! | Files | [`ReadFile`] | [`SystemFs`] | `MemFs`* |
//!
//! *Available with `#[cfg(test)]` or the `"test-support"` feature.
//!
//! Every type here is `Send + Sync`, so the test doubles can be shared with
//! tasks on a multi-threaded tokio runtime.

pub mod env;
pub mod fs;

pub use env::{ReadEnv, SystemEnv};
pub use fs::{ReadFile, SystemFs};
