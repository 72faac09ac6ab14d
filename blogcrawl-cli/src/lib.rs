//! Library target for the `blogcrawl` package.
//!
//! The deliverable of this package is the `blogcrawl` binary
//! (`src/main.rs`). The engine is re-exported so doc tests can reach it
//! through this package.

#[doc(hidden)]
pub use blogcrawl_engine;
