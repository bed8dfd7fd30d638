//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the connector:
//! - Logging and tracing configuration
//! - Connector configuration management
//! - Event broadcasting primitives
//!
//! This crate contains the runtime utilities the domain crates depend on. It
//! establishes the logging conventions and event broadcasting mechanism used
//! throughout the workspace.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
