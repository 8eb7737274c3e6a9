//! Error types for live sessions.

use thiserror::Error;

/// Result type for live session operations.
pub type Result<T> = std::result::Result<T, LiveError>;

/// Errors that can occur during a live session.
#[derive(Error, Debug)]
pub enum LiveError {
    /// WebSocket connection error (connect, send, or close failure).
    #[error("connection error: {0}")]
    ConnectionError(String),

    /// Malformed inbound payload. The offending frame is dropped; the
    /// connection stays alive.
    #[error("protocol error: {0}")]
    MessageError(String),

    /// Authentication error.
    #[error("authentication error: {0}")]
    AuthError(String),

    /// Session not connected.
    #[error("session not connected")]
    NotConnected,

    /// Session already closed.
    #[error("session already closed")]
    SessionClosed,

    /// Invalid configuration or caller misuse.
    #[error("invalid configuration: {0}")]
    ConfigError(String),

    /// Audio payload error.
    #[error("audio format error: {0}")]
    AudioFormatError(String),

    /// Tool execution error.
    #[error("tool execution error: {0}")]
    ToolError(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Generic IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl LiveError {
    /// Create a new connection error.
    pub fn connection<S: Into<String>>(msg: S) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a new protocol error.
    pub fn protocol<S: Into<String>>(msg: S) -> Self {
        Self::MessageError(msg.into())
    }

    /// Create a new authentication error.
    pub fn auth<S: Into<String>>(msg: S) -> Self {
        Self::AuthError(msg.into())
    }

    /// Create a new configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create a new audio format error.
    pub fn audio<S: Into<String>>(msg: S) -> Self {
        Self::AudioFormatError(msg.into())
    }

    /// Create a new tool execution error.
    pub fn tool<S: Into<String>>(msg: S) -> Self {
        Self::ToolError(msg.into())
    }
}
