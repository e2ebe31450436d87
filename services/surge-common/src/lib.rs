//! Surge Common - shared plumbing for the Surge turnover screener.
//!
//! This crate provides:
//! - Layered JSON configuration loading and observability settings
//! - Configuration error type
//! - Logging setup

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;

pub use config::{config_dir, config_path, ObservabilityConfig};
pub use error::{Error, Result};
