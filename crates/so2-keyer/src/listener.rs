//! Steady-state inbound listener
//!
//! Once the handshake is done the read half of the stream is moved into a
//! spawned task. Every byte is classified in arrival order and turned into
//! cached state and events for the coordinator.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use so2_protocol::{InboundByte, Radio};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::events::KeyerEvent;

/// State shared between the link and its listener task
#[derive(Debug, Default)]
pub(crate) struct SharedState {
    pub open: AtomicBool,
    pub sending: AtomicBool,
    pub speed_pot: AtomicU8,
    pub active_radio: AtomicU8,
}

impl SharedState {
    pub fn active_radio(&self) -> Radio {
        match self.active_radio.load(Ordering::Acquire) {
            1 => Radio::B,
            _ => Radio::A,
        }
    }

    pub fn set_active_radio(&self, radio: Radio) {
        self.active_radio.store(radio.index() as u8, Ordering::Release);
    }

    /// Clear everything back to the closed state
    pub fn reset(&self) {
        self.open.store(false, Ordering::Release);
        self.sending.store(false, Ordering::Release);
        self.speed_pot.store(0, Ordering::Release);
        self.active_radio.store(0, Ordering::Release);
    }
}

/// Apply one inbound byte to the shared state
///
/// Returns the event the byte produces, if any.
pub(crate) fn apply_inbound(shared: &SharedState, byte: u8) -> Option<KeyerEvent> {
    match InboundByte::classify(byte) {
        InboundByte::Status(status) => {
            debug!("Keyer status {:02X}: {:?}", byte, status);
            shared.sending.store(status.busy, Ordering::Release);
            Some(KeyerEvent::Transmit {
                radio: shared.active_radio(),
                sending: status.busy,
            })
        }
        InboundByte::SpeedPot(value) => {
            shared.speed_pot.store(value, Ordering::Release);
            None
        }
        InboundByte::Echo(byte) => Some(KeyerEvent::Echo(byte)),
    }
}

/// Listener loop; runs until the stream fails or the task is aborted
pub(crate) async fn run_listener<R>(
    mut reader: R,
    shared: Arc<SharedState>,
    event_tx: mpsc::Sender<KeyerEvent>,
) where
    R: AsyncRead + Unpin,
{
    info!("Keyer listener started");
    let mut buffer = [0u8; 256];

    loop {
        match reader.read(&mut buffer).await {
            Ok(0) => {
                warn!("Keyer connection closed by device");
                shared.reset();
                let _ = event_tx
                    .send(KeyerEvent::Error("keyer connection closed".to_string()))
                    .await;
                break;
            }
            Ok(n) => {
                for &byte in &buffer[..n] {
                    if let Some(event) = apply_inbound(&shared, byte) {
                        let _ = event_tx.send(event).await;
                    }
                }
            }
            Err(e) => {
                warn!("Keyer read error: {}", e);
                shared.reset();
                let _ = event_tx
                    .send(KeyerEvent::Error(format!("Read error: {}", e)))
                    .await;
                break;
            }
        }
    }

    info!("Keyer listener ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[test]
    fn test_status_sets_sending() {
        let shared = SharedState::default();
        shared.set_active_radio(Radio::B);

        let event = apply_inbound(&shared, 0xc4);
        assert_eq!(
            event,
            Some(KeyerEvent::Transmit {
                radio: Radio::B,
                sending: true
            })
        );
        assert!(shared.sending.load(Ordering::Acquire));

        let event = apply_inbound(&shared, 0xc0);
        assert_eq!(
            event,
            Some(KeyerEvent::Transmit {
                radio: Radio::B,
                sending: false
            })
        );
        assert!(!shared.sending.load(Ordering::Acquire));
    }

    #[test]
    fn test_pot_is_cached_silently() {
        let shared = SharedState::default();
        assert_eq!(apply_inbound(&shared, 0x80 | 22), None);
        assert_eq!(shared.speed_pot.load(Ordering::Acquire), 22);
    }

    #[test]
    fn test_echo_passes_through() {
        let shared = SharedState::default();
        assert_eq!(apply_inbound(&shared, b'K'), Some(KeyerEvent::Echo(b'K')));
        assert!(!shared.sending.load(Ordering::Acquire));
    }

    #[tokio::test]
    async fn test_listener_preserves_order() {
        let (host, mut device) = tokio::io::duplex(64);
        let (event_tx, mut event_rx) = mpsc::channel(16);
        let shared = Arc::new(SharedState::default());
        shared.open.store(true, Ordering::Release);

        let task = tokio::spawn(run_listener(host, shared.clone(), event_tx));

        device.write_all(&[0xc4, b'C', b'Q', 0xc0]).await.unwrap();

        assert_eq!(
            event_rx.recv().await,
            Some(KeyerEvent::Transmit {
                radio: Radio::A,
                sending: true
            })
        );
        assert_eq!(event_rx.recv().await, Some(KeyerEvent::Echo(b'C')));
        assert_eq!(event_rx.recv().await, Some(KeyerEvent::Echo(b'Q')));
        assert_eq!(
            event_rx.recv().await,
            Some(KeyerEvent::Transmit {
                radio: Radio::A,
                sending: false
            })
        );

        drop(device);
        assert!(matches!(event_rx.recv().await, Some(KeyerEvent::Error(_))));
        task.await.unwrap();
        assert!(!shared.open.load(Ordering::Acquire));
    }
}
