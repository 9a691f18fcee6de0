//! Core building blocks for Musegen: configuration, logging setup, and
//! small path/string helpers shared by the provider and CLI crates.

pub mod config;
pub mod logging;
pub mod utils;
