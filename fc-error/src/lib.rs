//! Unified error handling for fanctrl
//!
//! This crate provides the single error type shared by the core library and the daemon.
//! It uses thiserror for ergonomic error definitions with proper Display and Error trait impls.

use std::io;
use std::path::PathBuf;

/// Result type alias using FanctrlError
pub type Result<T> = std::result::Result<T, FanctrlError>;

/// Unified error type for all fanctrl operations
#[derive(thiserror::Error, Debug)]
pub enum FanctrlError {
    // ============================================================================
    // File System Errors
    // ============================================================================
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: io::Error,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("File too large: {path} ({size} bytes, max {max_size} bytes)")]
    FileTooLarge {
        path: PathBuf,
        size: u64,
        max_size: u64,
    },

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidConfig {
        field: String,
        reason: String,
    },

    // ============================================================================
    // Hardware Access Errors
    // ============================================================================
    #[error("Failed to read temperature from {path}: {reason}")]
    TemperatureRead {
        path: PathBuf,
        reason: String,
    },

    #[error("Failed to open GPIO chip {chip}: {reason}")]
    GpioChip {
        chip: String,
        reason: String,
    },

    #[error("Failed to request GPIO line {line} on {chip}: {reason}")]
    GpioLine {
        chip: String,
        line: u32,
        reason: String,
    },

    #[error("Failed to write GPIO line {line}: {reason}")]
    GpioWrite {
        line: u32,
        reason: String,
    },

    #[error("Failed to read GPIO line {line}: {reason}")]
    GpioRead {
        line: u32,
        reason: String,
    },

    // ============================================================================
    // Status Server Errors
    // ============================================================================
    #[error("Failed to bind status server to {addr}: {source}")]
    Bind {
        addr: String,
        source: io::Error,
    },
}

impl FanctrlError {
    /// Create an invalid configuration error
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a temperature read error
    pub fn temperature(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::TemperatureRead {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
