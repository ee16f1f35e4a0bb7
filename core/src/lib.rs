//! A3S Imagetools Core - Foundational Types
//!
//! Error and configuration types shared by the imagetools runtime and CLI.

pub mod config;
pub mod error;

// Re-export commonly used types
pub use config::{ImagetoolsConfig, LogLevel, RegistryProtocol};
pub use error::{Result, ToolsError};

/// A3S Imagetools version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
