//! Shared types: points, configuration and errors.

pub mod config;
pub mod errors;
pub mod point;
