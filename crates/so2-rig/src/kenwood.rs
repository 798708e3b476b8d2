//! Kenwood CAT serial backend
//!
//! Set commands are fire-and-forget on Kenwood radios; only queries get an
//! answer, which is read until the `;` terminator and parsed by
//! [`KenwoodCodec`].

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use so2_protocol::kenwood::{kenwood_to_rig_mode, rig_mode_to_kenwood};
use so2_protocol::{
    EncodeCommand, KenwoodCodec, KenwoodCommand, Passband, ProtocolCodec, ProtocolError, RigMode,
};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info, trace};

use crate::error::RigError;
use crate::transport::RigControl;

/// Kenwood CAT client over a byte stream
#[derive(Debug)]
pub struct CatClient<S> {
    stream: S,
    codec: KenwoodCodec,
    timeout: Duration,
}

impl<S> CatClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an open stream
    pub fn new(stream: S, timeout: Duration) -> Self {
        Self {
            stream,
            codec: KenwoodCodec::new(),
            timeout,
        }
    }

    /// Write a command that has no reply
    pub async fn command(&mut self, cmd: &KenwoodCommand) -> Result<(), RigError> {
        self.write(&cmd.encode()).await
    }

    /// Write raw bytes
    pub async fn write(&mut self, bytes: &[u8]) -> Result<(), RigError> {
        trace!("CAT -> {:?}", String::from_utf8_lossy(bytes));
        match timeout(self.timeout, async {
            self.stream.write_all(bytes).await?;
            self.stream.flush().await
        })
        .await
        {
            Ok(result) => Ok(result?),
            Err(_) => Err(timed_out(self.timeout)),
        }
    }

    /// Send a query and wait for the answer with the same prefix
    ///
    /// Unrelated frames (auto-information chatter) are skipped.
    pub async fn query(&mut self, cmd: &KenwoodCommand) -> Result<KenwoodCommand, RigError> {
        self.codec.clear();
        self.command(cmd).await?;

        let limit = self.timeout;
        let wanted = std::mem::discriminant(cmd);
        let read = async {
            let mut buf = [0u8; 128];
            loop {
                while let Some(reply) = self.codec.next_command() {
                    if std::mem::discriminant(&reply) == wanted {
                        return Ok(reply);
                    }
                    trace!("CAT skipping {:?}", reply);
                }
                let n = self.stream.read(&mut buf).await?;
                if n == 0 {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "radio closed the connection",
                    ));
                }
                self.codec.push_bytes(&buf[..n]);
            }
        };

        match timeout(limit, read).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(timed_out(limit)),
        }
    }
}

fn timed_out(limit: Duration) -> RigError {
    RigError::Transport(io::Error::new(
        io::ErrorKind::TimedOut,
        format!("no reply from radio within {}ms", limit.as_millis()),
    ))
}

fn unexpected(reply: KenwoodCommand) -> RigError {
    RigError::Protocol(ProtocolError::InvalidResponse(format!("{:?}", reply)))
}

/// Kenwood radio on a serial port
#[derive(Debug)]
pub struct KenwoodRig {
    device: String,
    baud: u32,
    timeout: Duration,
    client: Option<CatClient<SerialStream>>,
}

impl KenwoodRig {
    /// Unopened rig on `device`
    pub fn new(device: impl Into<String>, baud: u32, timeout: Duration) -> Self {
        Self {
            device: device.into(),
            baud,
            timeout,
            client: None,
        }
    }

    fn client(&mut self) -> Result<&mut CatClient<SerialStream>, RigError> {
        self.client.as_mut().ok_or(RigError::NotOpen)
    }
}

#[async_trait]
impl RigControl for KenwoodRig {
    async fn open(&mut self) -> Result<(), RigError> {
        if self.client.is_some() {
            return Ok(());
        }
        let stream = tokio_serial::new(&self.device, self.baud)
            .timeout(Duration::from_millis(100))
            .open_native_async()
            .map_err(|e| RigError::Connection(format!("{}: {}", self.device, e)))?;
        info!("Opened Kenwood CAT on {} at {} baud", self.device, self.baud);
        self.client = Some(CatClient::new(stream, self.timeout));
        Ok(())
    }

    async fn close(&mut self) -> Result<(), RigError> {
        if self.client.take().is_some() {
            debug!("Closed Kenwood CAT on {}", self.device);
        }
        Ok(())
    }

    async fn frequency(&mut self) -> Result<u64, RigError> {
        match self.client()?.query(&KenwoodCommand::FrequencyA(None)).await? {
            KenwoodCommand::FrequencyA(Some(hz)) => Ok(hz),
            other => Err(unexpected(other)),
        }
    }

    async fn set_frequency(&mut self, hz: u64) -> Result<(), RigError> {
        self.client()?
            .command(&KenwoodCommand::FrequencyA(Some(hz)))
            .await
    }

    async fn mode(&mut self) -> Result<(RigMode, Passband), RigError> {
        match self.client()?.query(&KenwoodCommand::Mode(None)).await? {
            KenwoodCommand::Mode(Some(digit)) => Ok((kenwood_to_rig_mode(digit), Passband::Normal)),
            other => Err(unexpected(other)),
        }
    }

    async fn set_mode(&mut self, mode: RigMode, passband: Passband) -> Result<(), RigError> {
        let digit = rig_mode_to_kenwood(mode).ok_or_else(|| {
            RigError::InvalidArgument(format!("{} has no Kenwood equivalent", mode.name()))
        })?;
        if passband != Passband::Normal && passband != Passband::NoChange {
            debug!("Kenwood CAT ignores passband {:?}", passband);
        }
        self.client()?
            .command(&KenwoodCommand::Mode(Some(digit)))
            .await
    }

    async fn ptt(&mut self) -> Result<bool, RigError> {
        match self.client()?.query(&KenwoodCommand::Info(None)).await? {
            KenwoodCommand::Info(Some(info)) => Ok(info.tx),
            other => Err(unexpected(other)),
        }
    }

    async fn set_ptt(&mut self, on: bool) -> Result<(), RigError> {
        let cmd = if on {
            KenwoodCommand::Transmit
        } else {
            KenwoodCommand::Receive
        };
        self.client()?.command(&cmd).await
    }

    async fn clear_rit(&mut self) -> Result<(), RigError> {
        self.client()?.command(&KenwoodCommand::RitClear).await
    }

    async fn send_raw(&mut self, bytes: &[u8]) -> Result<(), RigError> {
        self.client()?.write(bytes).await
    }

    fn describe(&self) -> String {
        format!("Kenwood CAT {} @ {}", self.device, self.baud)
    }
}
