//! SO2 Keyer Link
//!
//! This crate owns the serial connection to a WinKeyer-compatible CW keyer.
//! It provides:
//!
//! - **Handshake**: resync, echo test, host open, firmware version and the
//!   startup configuration writes, each step bounded by a timeout
//! - **Command surface**: buffered text, send, cancel, speed and radio select
//! - **Listener**: a spawned task that classifies every byte the keyer sends
//!   and turns it into [`KeyerEvent`]s
//!
//! # Architecture
//!
//! During the handshake the link owns the whole stream and runs lock-step
//! write/read exchanges. Once the keyer is open the stream is split: the read
//! half moves into the listener task, the write half stays with the link.
//! State both sides need (open, sending, speed pot, active radio) lives in
//! atomics behind an `Arc`.
//!
//! # Example
//!
//! ```rust,no_run
//! use so2_keyer::{KeyerConfig, KeyerLink, SerialConnector};
//! use tokio::sync::mpsc;
//!
//! # async fn run() -> Result<(), so2_keyer::KeyerError> {
//! let (event_tx, mut event_rx) = mpsc::channel(64);
//! let config = KeyerConfig::for_device("/dev/ttyUSB0");
//! let mut keyer = KeyerLink::new(SerialConnector::new(&config.device), config, event_tx);
//!
//! keyer.open().await?;
//! keyer.load_buffer(b"CQ TEST")?;
//! keyer.send().await?;
//!
//! while let Some(event) = event_rx.recv().await {
//!     println!("{:?}", event);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod handshake;
pub mod link;
mod listener;
pub mod port;

pub use config::KeyerConfig;
pub use error::KeyerError;
pub use events::KeyerEvent;
pub use handshake::InitPhase;
pub use link::KeyerLink;
pub use port::{Connector, KeyerPort, SerialConnector, KEYER_BAUD};
