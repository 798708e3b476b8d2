//! Synchronous handshake steps
//!
//! During initialization the link owns the whole stream and talks to the
//! keyer in lock-step: write a command, wait for it to drain, then wait a
//! bounded time for a reply. Nothing here runs concurrently with the
//! steady-state listener, which only starts once the handshake has finished.

use std::io;
use std::time::Duration;

use so2_protocol::{InboundByte, ECHO_TEST_BYTE};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::{debug, trace};

/// Handshake progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitPhase {
    /// No handshake attempted, or the link was closed
    #[default]
    NotStarted,
    /// Echo test written, waiting for the echo
    EchoTestSent,
    /// Echo received, host open in progress
    EchoConfirmed,
    /// Handshake complete, link usable
    Opened,
    /// Handshake gave up
    Failed,
}

/// What the keyer said while the handshake was running
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct InitObserver {
    pub echo_confirmed: bool,
    pub version: u8,
    pub speed_pot: Option<u8>,
}

impl InitObserver {
    /// Feed bytes received during initialization
    ///
    /// The echo test byte is recognized verbatim. Status and telemetry bytes
    /// are classified as in steady state; anything else is the version.
    pub fn observe(&mut self, data: &[u8]) {
        for &byte in data {
            if byte == ECHO_TEST_BYTE {
                self.echo_confirmed = true;
                continue;
            }
            match InboundByte::classify(byte) {
                InboundByte::Status(status) => {
                    trace!("Status during init: {:?}", status);
                }
                InboundByte::SpeedPot(value) => self.speed_pot = Some(value),
                InboundByte::Echo(version) => self.version = version,
            }
        }
    }
}

/// Write `bytes` and wait up to `limit` for them to drain
pub(crate) async fn write_bounded<P>(port: &mut P, bytes: &[u8], limit: Duration) -> io::Result<()>
where
    P: AsyncWrite + Unpin,
{
    let write = async {
        port.write_all(bytes).await?;
        port.flush().await
    };
    match timeout(limit, write).await {
        Ok(result) => result,
        Err(_) => Err(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("write not completed within {}ms", limit.as_millis()),
        )),
    }
}

/// One handshake step: write `bytes`, then wait up to `limit` for a reply
///
/// Silence is not an error; the caller decides what a missing reply means
/// by inspecting the observer afterwards.
pub(crate) async fn exchange<P>(
    port: &mut P,
    bytes: &[u8],
    limit: Duration,
    observer: &mut InitObserver,
) -> io::Result<()>
where
    P: AsyncRead + AsyncWrite + Unpin,
{
    write_bounded(port, bytes, limit).await?;

    let mut buf = [0u8; 64];
    match timeout(limit, port.read(&mut buf)).await {
        Ok(Ok(0)) => Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "keyer closed the connection",
        )),
        Ok(Ok(n)) => {
            debug!("Handshake reply to {:02X?}: {:02X?}", bytes, &buf[..n]);
            observer.observe(&buf[..n]);
            Ok(())
        }
        Ok(Err(e)) => Err(e),
        Err(_) => {
            trace!("No reply to {:02X?} within {}ms", bytes, limit.as_millis());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observer_echo_and_version() {
        let mut obs = InitObserver::default();
        obs.observe(&[0x55]);
        assert!(obs.echo_confirmed);
        assert_eq!(obs.version, 0);

        obs.observe(&[23]);
        assert_eq!(obs.version, 23);
    }

    #[test]
    fn test_observer_ignores_status_and_pot() {
        let mut obs = InitObserver::default();
        obs.observe(&[0xc4, 0x8a]);
        assert!(!obs.echo_confirmed);
        assert_eq!(obs.version, 0);
        assert_eq!(obs.speed_pot, Some(0x0a));
    }

    #[tokio::test]
    async fn test_exchange_silent_peer_times_out() {
        let (mut host, _device) = tokio::io::duplex(64);
        let mut obs = InitObserver::default();

        exchange(&mut host, &[0x13], Duration::from_millis(20), &mut obs)
            .await
            .unwrap();

        assert_eq!(obs, InitObserver::default());
    }

    #[tokio::test]
    async fn test_exchange_reads_reply() {
        let (mut host, mut device) = tokio::io::duplex(64);
        device.write_all(&[0x55]).await.unwrap();

        let mut obs = InitObserver::default();
        exchange(&mut host, &[0x00, 0x04, 0x55], Duration::from_millis(200), &mut obs)
            .await
            .unwrap();
        assert!(obs.echo_confirmed);

        let mut sent = [0u8; 3];
        device.read_exact(&mut sent).await.unwrap();
        assert_eq!(sent, [0x00, 0x04, 0x55]);
    }

    #[tokio::test]
    async fn test_exchange_reports_closed_peer() {
        let (mut host, device) = tokio::io::duplex(64);
        drop(device);

        let mut obs = InitObserver::default();
        let result = exchange(&mut host, &[0x13], Duration::from_millis(50), &mut obs).await;
        assert!(result.is_err());
    }
}
