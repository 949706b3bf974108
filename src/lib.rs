//! # parcache
//!
//! Parallel function-evaluation cache.
//!
//! parcache evaluates an expensive function of a point in `[0, 1]^n` on a
//! bounded worker pool. Callers submit candidate points speculatively, block
//! only on the ones they need, and abort the rest; evaluations that finished
//! anyway are kept.
//!
//! ## Modules
//!
//! - [`cache`] - Function caches (serial and parallel)
//! - [`function`] - Function trait, cancellation and built-in objectives
//! - [`optimizer`] - Multidirectional search optimizer driving the cache
//! - [`cli`] - Command line interface
//! - [`types`] - Points, configuration and errors

pub mod cache;
#[cfg(feature = "cli")]
pub mod cli;
pub mod function;
pub mod optimizer;
pub mod types;

pub use types::config::Config;
pub use types::errors::{ParCacheError, ParCacheResult};
pub use types::point::Point;
