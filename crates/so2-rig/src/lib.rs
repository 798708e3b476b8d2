//! SO2 Rig Control
//!
//! This crate controls the one or two transceivers of a two-radio station.
//! It provides:
//!
//! - **RigControl**: the command surface every backend implements, with a
//!   rigctld network client ([`NetRig`]) and a direct Kenwood CAT serial
//!   backend ([`KenwoodRig`])
//! - **RadioLink**: per-radio pending command fields, a drain timer that
//!   issues them under a per-radio guard, periodic status polling and the
//!   `Closed → Opening → Open → Error` lifecycle
//! - **ModelCatalog**: the immutable manufacturer/model table
//!
//! # Architecture
//!
//! Callers record what they want (`set_ptt`, `qsy_exact`, `set_mode`, ...);
//! nothing blocks on the radio. The drain task wakes every `tick_ms`, takes
//! every pending field of a radio at once and issues them in the order they
//! were last set. Repeated requests before a tick collapse into one command.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use so2_protocol::{Passband, Radio, RigMode};
//! use so2_rig::{RadioConfig, RadioLink, RadioLinkConfig};
//! use tokio::sync::mpsc;
//!
//! # async fn run() -> Result<(), so2_rig::RigError> {
//! let mut config = RadioLinkConfig::default();
//! config.radios[0] = Some(RadioConfig::network("localhost", 4532));
//!
//! let (event_tx, _event_rx) = mpsc::channel(64);
//! let link = Arc::new(RadioLink::with_default_factory(config, event_tx));
//! link.open_all().await?;
//! let drain = link.spawn_drain();
//!
//! link.qsy_exact(Radio::A, 14_025_000)?;
//! link.set_mode(Radio::A, RigMode::Cw, Passband::Hz(500))?;
//!
//! drain.stop().await;
//! link.close_all().await;
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod kenwood;
pub mod link;
pub mod net;
pub mod pending;
pub mod state;
pub mod transport;

pub use catalog::{BuiltinModels, ModelCatalog, ModelRegistry, RigModel};
pub use config::{RadioConfig, RadioLinkConfig, RigTransport, DEFAULT_TICK_MS};
pub use error::RigError;
pub use events::RadioEvent;
pub use kenwood::KenwoodRig;
pub use link::{DrainTask, RadioLink};
pub use net::NetRig;
pub use pending::{FrequencyRequest, PendingCommand, PendingFields};
pub use state::{LinkState, RadioState};
pub use transport::{DefaultRigFactory, RigControl, RigFactory};

// Re-exported so backends can implement `RigControl` without naming the crate
pub use async_trait::async_trait;
