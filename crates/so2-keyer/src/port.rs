//! Byte streams the keyer link can run over
//!
//! The link is generic over the I/O type so the same handshake and listener
//! run against a real serial port and against an in-memory
//! `tokio::io::DuplexStream` wired to a simulated keyer.

use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, DuplexStream};
use tokio_serial::{
    DataBits, FlowControl, Parity, SerialPort, SerialPortBuilderExt, SerialStream, StopBits,
};
use tracing::debug;

/// Fixed keyer baud rate
pub const KEYER_BAUD: u32 = 1200;

/// A duplex byte stream with modem control lines
pub trait KeyerPort: AsyncRead + AsyncWrite + Unpin + Send + 'static {
    /// Drive the RTS and DTR lines
    fn set_control_lines(&mut self, rts: bool, dtr: bool) -> io::Result<()>;
}

impl KeyerPort for SerialStream {
    fn set_control_lines(&mut self, rts: bool, dtr: bool) -> io::Result<()> {
        self.write_request_to_send(rts)?;
        self.write_data_terminal_ready(dtr)?;
        Ok(())
    }
}

impl KeyerPort for DuplexStream {
    fn set_control_lines(&mut self, _rts: bool, _dtr: bool) -> io::Result<()> {
        Ok(())
    }
}

/// Factory for keyer connections
///
/// Called once per `open`, so a restart always gets a fresh port.
pub trait Connector: Send {
    /// Port type produced
    type Port: KeyerPort;

    /// Open a new connection to the keyer
    fn connect(&mut self) -> io::Result<Self::Port>;
}

impl<F, P> Connector for F
where
    F: FnMut() -> io::Result<P> + Send,
    P: KeyerPort,
{
    type Port = P;

    fn connect(&mut self) -> io::Result<P> {
        self()
    }
}

/// Opens the keyer on a serial device at 1200 baud, 8 data bits, 2 stop bits,
/// no parity, no flow control
#[derive(Debug, Clone)]
pub struct SerialConnector {
    device: String,
}

impl SerialConnector {
    /// Connector for the given device path
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
        }
    }

    /// Device path this connector opens
    pub fn device(&self) -> &str {
        &self.device
    }
}

impl Connector for SerialConnector {
    type Port = SerialStream;

    fn connect(&mut self) -> io::Result<SerialStream> {
        debug!("Opening keyer on {} at {} baud", self.device, KEYER_BAUD);
        let stream = tokio_serial::new(&self.device, KEYER_BAUD)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::Two)
            .parity(Parity::None)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_millis(100))
            .open_native_async()?;
        Ok(stream)
    }
}
