//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the media session core:
//! - Logging and tracing infrastructure
//! - Session configuration
//! - Diagnostic event bus
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that other modules depend on.
//! It establishes the logging conventions, configuration validation and event
//! broadcasting used throughout the system.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
