//! SO2 Simulation Library
//!
//! Stand-ins for station hardware so the keyer link and the radio link can
//! be exercised without a keyer or transceivers attached:
//!
//! - **VirtualKeyer**: answers the WinKeyer handshake over an in-memory
//!   duplex stream and records every host command
//! - **VirtualRig**: an in-memory transceiver implementing `RigControl`, with
//!   switchable open failures, transport faults and command rejections
//!
//! # Example
//!
//! ```rust
//! use so2_sim::{VirtualKeyer, VirtualKeyerConfig};
//!
//! let mut keyer = VirtualKeyer::new(VirtualKeyerConfig::default());
//!
//! // Echo test comes back verbatim, host open answers with the version
//! assert_eq!(keyer.process(&[0x00, 0x04, 0x55]), vec![0x55]);
//! assert_eq!(keyer.process(&[0x00, 0x02]), vec![31]);
//! ```

pub mod keyer;
pub mod keyer_task;
pub mod rig;

pub use keyer::{VirtualKeyer, VirtualKeyerConfig};
pub use keyer_task::{spawn_virtual_keyer, VirtualKeyerCommand, VirtualKeyerHandle};
pub use rig::{RigCall, VirtualRig, VirtualRigFactory};
