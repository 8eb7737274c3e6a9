//! # gemini-live-client
//!
//! Bidirectional, real-time streaming client for the Gemini Live API
//! (`BidiGenerateContent` over WebSocket).
//!
//! A [`LiveSession`] holds a long-lived multi-modal conversation: text and
//! audio turns stream in both directions with mid-turn interruption, live
//! transcription, tool/function-call round-trips, and transparent
//! reconnection over an unreliable network.
//!
//! ## Architecture
//!
//! ```text
//!                      ┌──────────────────────────────┐
//!                      │         LiveSession          │
//!                      │ connect / send_* / disconnect│
//!                      └──────┬────────────┬──────────┘
//!                             │            │ events (bounded mpsc)
//!               ┌─────────────▼───┐   ┌────▼────────────┐
//!               │ConnectionManager│   │InboundDispatcher│
//!               │ dial/send/close │   │  demultiplexing │
//!               └─────────────────┘   └──┬─────────┬────┘
//!                                        │         │
//!                              ┌─────────▼──┐ ┌────▼──────────┐
//!                              │AudioAccum. │ │ToolDispatcher │
//!                              │ per-turn   │ │ batch execute │
//!                              └────────────┘ └───────────────┘
//! ```
//!
//! Inbound frames flow through a single ordered receive path; tool calls
//! execute on a supervised task set so the receive path never blocks.
//! Outbound sends fail with [`LiveError::NotConnected`] unless the
//! transport is running.
//!
//! ## Example
//!
//! ```rust,ignore
//! use gemini_live_client::{ApiKeyAdapter, LiveEvent, LiveSession, SessionConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let adapter = Arc::new(ApiKeyAdapter::new(std::env::var("GOOGLE_API_KEY")?));
//!     let session = LiveSession::builder(adapter)
//!         .config(SessionConfig::new().with_model("models/gemini-2.0-flash-live-001"))
//!         .build();
//!
//!     let mut events = session.connect(true).await?;
//!     session.send_text("Hello!").await?;
//!
//!     while let Some(event) = events.recv().await {
//!         match event {
//!             LiveEvent::TextChunk { text, .. } => print!("{text}"),
//!             LiveEvent::AudioComplete(chunk) => { /* play chunk.data */ }
//!             LiveEvent::Closed => break,
//!             _ => {}
//!         }
//!     }
//!
//!     session.disconnect().await;
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod config;
pub mod connection;
mod dispatch;
pub mod error;
pub mod events;
pub mod platform;
pub mod session;
pub mod tool;
pub mod wire;

// Re-exports
pub use audio::{AudioAccumulator, AudioChunk, AudioFormat};
pub use config::{SessionConfig, ToolDefinition};
pub use connection::{ConnectionManager, ConnectionState, ReconnectConfig};
pub use error::{LiveError, Result};
pub use events::LiveEvent;
pub use platform::{ApiKeyAdapter, BearerTokenAdapter, PlatformAdapter};
pub use session::{LiveSession, LiveSessionBuilder};
pub use tool::{FnTool, LiveTool, ToolDispatcher, UnmatchedCallPolicy};
