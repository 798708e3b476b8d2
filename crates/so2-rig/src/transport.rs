//! Rig-control capability
//!
//! [`RigControl`] is the command surface every backend offers: the rigctld
//! network client, direct Kenwood CAT over serial, and the simulated rig used
//! in tests. The link only ever holds `Box<dyn RigControl>`, so callers never
//! need to know which transport backs a given radio.

use async_trait::async_trait;
use so2_protocol::{Passband, Radio, RigMode};
use tracing::debug;

use crate::config::{RadioConfig, RigTransport};
use crate::error::RigError;
use crate::kenwood::KenwoodRig;
use crate::net::NetRig;

/// Asynchronous control of one transceiver
///
/// Implementations are not safe for concurrent use; the link serializes all
/// calls for a radio behind that radio's guard.
#[async_trait]
pub trait RigControl: Send {
    /// Open the transport
    async fn open(&mut self) -> Result<(), RigError>;

    /// Close the transport; closing a closed rig is a no-op
    async fn close(&mut self) -> Result<(), RigError>;

    /// Read the current frequency in Hz
    async fn frequency(&mut self) -> Result<u64, RigError>;

    /// Tune to `hz`
    async fn set_frequency(&mut self, hz: u64) -> Result<(), RigError>;

    /// Read the current mode and passband
    async fn mode(&mut self) -> Result<(RigMode, Passband), RigError>;

    /// Change mode and passband
    async fn set_mode(&mut self, mode: RigMode, passband: Passband) -> Result<(), RigError>;

    /// Read the PTT state
    async fn ptt(&mut self) -> Result<bool, RigError>;

    /// Key or unkey the transmitter
    async fn set_ptt(&mut self, on: bool) -> Result<(), RigError>;

    /// Zero the RIT offset
    async fn clear_rit(&mut self) -> Result<(), RigError>;

    /// Intermediate-frequency offset in Hz; 0 when the backend cannot tell
    async fn if_frequency(&mut self) -> Result<i32, RigError> {
        Ok(0)
    }

    /// Pass a raw command through to the radio
    async fn send_raw(&mut self, _bytes: &[u8]) -> Result<(), RigError> {
        Err(RigError::Unsupported("raw commands".to_string()))
    }

    /// Short description for logs
    fn describe(&self) -> String;
}

/// Builds rig transports from configuration
pub trait RigFactory: Send + Sync {
    /// Create an unopened transport for `radio`
    fn create(&self, radio: Radio, config: &RadioConfig) -> Result<Box<dyn RigControl>, RigError>;
}

/// Factory for the real backends
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultRigFactory;

impl RigFactory for DefaultRigFactory {
    fn create(&self, radio: Radio, config: &RadioConfig) -> Result<Box<dyn RigControl>, RigError> {
        debug!("Creating {} transport: {:?}", radio, config.transport);
        let rig: Box<dyn RigControl> = match &config.transport {
            RigTransport::Network { host, port } => {
                Box::new(NetRig::new(host.clone(), *port, config.timeout()))
            }
            RigTransport::Serial { device, baud } => {
                if device.is_empty() {
                    return Err(RigError::InvalidArgument(format!(
                        "{}: no serial device configured",
                        radio
                    )));
                }
                Box::new(KenwoodRig::new(device.clone(), *baud, config.timeout()))
            }
        };
        Ok(rig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_selects_backend() {
        let factory = DefaultRigFactory;

        let rig = factory
            .create(Radio::A, &RadioConfig::network("shack", 4533))
            .unwrap();
        assert_eq!(rig.describe(), "rigctld shack:4533");

        let rig = factory
            .create(Radio::B, &RadioConfig::serial("/dev/ttyUSB1", 38400))
            .unwrap();
        assert_eq!(rig.describe(), "Kenwood CAT /dev/ttyUSB1 @ 38400");

        assert!(matches!(
            factory.create(Radio::B, &RadioConfig::serial("", 9600)),
            Err(RigError::InvalidArgument(_))
        ));
    }
}
