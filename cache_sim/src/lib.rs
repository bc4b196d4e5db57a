//! Simulation of a single-level direct-mapped cache.
//!
//! [`cache::CacheModel`] decomposes addresses and classifies every read as a
//! hit or a miss; the remaining modules load configurations and traces and
//! render what the model reports.

mod bin;
pub mod cache;
pub mod config;
pub mod geometry;
pub mod report;
pub mod sim;
pub mod trace;

#[cfg(feature = "stat")]
pub mod stat;
