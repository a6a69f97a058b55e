//! Core library for the `loadpace` CLI.
//!
//! `loadpace` generates HTTP load that follows an arrival rate profile. A
//! director reads the profile and drives one or more load generator nodes over
//! a line based control protocol; every node paces its own share of the
//! arrivals and streams per interval results back, which the director merges
//! into a CSV run log.
pub mod args;
pub mod config;
pub mod director;
pub mod error;
pub mod generator;
pub mod profile;
pub mod protocol;
pub mod telemetry;

mod entry;
mod logger;

pub use entry::run;
