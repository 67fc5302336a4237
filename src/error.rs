//! Error handling for the netforge library
//!
//! One crate-wide error type covering configuration mistakes, capacity
//! limits, malformed external input, and OS-level primitive failures.

use thiserror::Error;

/// Main error type for the netforge library
#[derive(Error, Debug)]
pub enum NetforgeError {
    /// I/O related errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid data format or corruption
    #[error("Invalid data: {message}")]
    InvalidData {
        /// Error message describing the issue
        message: String,
    },

    /// Configuration or parameter errors
    #[error("Invalid configuration: {message}")]
    Configuration {
        /// Configuration error message
        message: String,
    },

    /// A structural capacity limit was exceeded
    #[error("Capacity exceeded: requested {requested}, limit {limit}")]
    Capacity {
        /// Number of items requested
        requested: usize,
        /// Hard limit of the structure
        limit: usize,
    },

    /// A cross-thread channel was closed unexpectedly
    #[error("Channel closed: {context}")]
    ChannelClosed {
        /// Description of the channel and operation
        context: String,
    },
}

impl NetforgeError {
    /// Create an invalid data error
    pub fn invalid_data<S: Into<String>>(message: S) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a capacity error
    pub fn capacity(requested: usize, limit: usize) -> Self {
        Self::Capacity { requested, limit }
    }

    /// Create a channel-closed error
    pub fn channel_closed<S: Into<String>>(context: S) -> Self {
        Self::ChannelClosed {
            context: context.into(),
        }
    }

    /// Check if this is a recoverable error
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Io(_) => true,
            Self::ChannelClosed { .. } => false,
            Self::InvalidData { .. } => false,
            Self::Configuration { .. } => false,
            Self::Capacity { .. } => false,
        }
    }

    /// Get the error category for logging/metrics
    pub fn category(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::InvalidData { .. } => "data",
            Self::Configuration { .. } => "config",
            Self::Capacity { .. } => "capacity",
            Self::ChannelClosed { .. } => "channel",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, NetforgeError>;
