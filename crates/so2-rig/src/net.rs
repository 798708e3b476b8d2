//! rigctld network backend
//!
//! [`RigctlClient`] speaks the line protocol over any byte stream so it can
//! be exercised against an in-memory duplex; [`NetRig`] owns the TCP
//! connection and implements [`RigControl`] on top of it.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use so2_protocol::rigctl::{self, report_code, RigctlCommand};
use so2_protocol::{EncodeCommand, Passband, RigMode};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, trace};

use crate::error::RigError;
use crate::transport::RigControl;

/// rigctld client over a byte stream
#[derive(Debug)]
pub struct RigctlClient<S> {
    stream: BufReader<S>,
    timeout: Duration,
}

impl<S> RigctlClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an already connected stream
    pub fn new(stream: S, timeout: Duration) -> Self {
        Self {
            stream: BufReader::new(stream),
            timeout,
        }
    }

    /// Send one command and collect its reply lines
    ///
    /// An `RPRT` line ends the reply early, so a failed get returns the
    /// error line alone.
    pub async fn transact(&mut self, cmd: &RigctlCommand) -> Result<Vec<String>, RigError> {
        let bytes = cmd.encode();
        trace!("rigctld -> {:?}", String::from_utf8_lossy(&bytes));

        let limit = self.timeout;
        let exchange = async {
            self.stream.write_all(&bytes).await?;
            self.stream.flush().await?;

            let mut lines = Vec::with_capacity(cmd.reply_lines());
            while lines.len() < cmd.reply_lines() {
                let mut line = String::new();
                if self.stream.read_line(&mut line).await? == 0 {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "rigctld closed the connection",
                    ));
                }
                let is_report = report_code(&line).is_some();
                lines.push(line);
                if is_report {
                    break;
                }
            }
            Ok::<_, io::Error>(lines)
        };

        let lines = match timeout(limit, exchange).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(RigError::Transport(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("no reply from rigctld within {}ms", limit.as_millis()),
                )))
            }
        };
        trace!("rigctld <- {:?}", lines);
        Ok(lines)
    }

    /// Send a set command and check its status report
    pub async fn set(&mut self, cmd: &RigctlCommand) -> Result<(), RigError> {
        let lines = self.transact(cmd).await?;
        let line = lines.first().map(String::as_str).unwrap_or_default();
        rigctl::check_report(line)?;
        Ok(())
    }

    /// Read the frequency
    pub async fn frequency(&mut self) -> Result<u64, RigError> {
        let lines = self.transact(&RigctlCommand::GetFrequency).await?;
        Ok(rigctl::parse_frequency(first_line(&lines))?)
    }

    /// Read mode and passband
    pub async fn mode(&mut self) -> Result<(RigMode, Passband), RigError> {
        let lines = self.transact(&RigctlCommand::GetMode).await?;
        let passband = lines.get(1).map(String::as_str).unwrap_or("0");
        Ok(rigctl::parse_mode(first_line(&lines), passband)?)
    }

    /// Read PTT
    pub async fn ptt(&mut self) -> Result<bool, RigError> {
        let lines = self.transact(&RigctlCommand::GetPtt).await?;
        Ok(rigctl::parse_ptt(first_line(&lines))?)
    }

    /// Shut down the write side
    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.stream.get_mut().shutdown().await
    }
}

fn first_line(lines: &[String]) -> &str {
    lines.first().map(String::as_str).unwrap_or_default()
}

/// Radio behind a rigctld daemon
#[derive(Debug)]
pub struct NetRig {
    host: String,
    port: u16,
    timeout: Duration,
    client: Option<RigctlClient<TcpStream>>,
}

impl NetRig {
    /// Unconnected rig for `host:port`
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
            client: None,
        }
    }

    fn client(&mut self) -> Result<&mut RigctlClient<TcpStream>, RigError> {
        self.client.as_mut().ok_or(RigError::NotOpen)
    }
}

#[async_trait]
impl RigControl for NetRig {
    async fn open(&mut self) -> Result<(), RigError> {
        if self.client.is_some() {
            return Ok(());
        }
        let addr = format!("{}:{}", self.host, self.port);
        let stream = match timeout(self.timeout, TcpStream::connect(addr.as_str())).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(RigError::Connection(format!("{}: {}", addr, e))),
            Err(_) => {
                return Err(RigError::Connection(format!(
                    "{}: connect timed out",
                    addr
                )))
            }
        };
        let _ = stream.set_nodelay(true);
        info!("Connected to rigctld at {}", addr);
        self.client = Some(RigctlClient::new(stream, self.timeout));
        Ok(())
    }

    async fn close(&mut self) -> Result<(), RigError> {
        if let Some(mut client) = self.client.take() {
            if let Err(e) = client.shutdown().await {
                debug!("rigctld shutdown: {}", e);
            }
        }
        Ok(())
    }

    async fn frequency(&mut self) -> Result<u64, RigError> {
        self.client()?.frequency().await
    }

    async fn set_frequency(&mut self, hz: u64) -> Result<(), RigError> {
        self.client()?.set(&RigctlCommand::SetFrequency(hz)).await
    }

    async fn mode(&mut self) -> Result<(RigMode, Passband), RigError> {
        self.client()?.mode().await
    }

    async fn set_mode(&mut self, mode: RigMode, passband: Passband) -> Result<(), RigError> {
        self.client()?
            .set(&RigctlCommand::SetMode { mode, passband })
            .await
    }

    async fn ptt(&mut self) -> Result<bool, RigError> {
        self.client()?.ptt().await
    }

    async fn set_ptt(&mut self, on: bool) -> Result<(), RigError> {
        self.client()?.set(&RigctlCommand::SetPtt(on)).await
    }

    async fn clear_rit(&mut self) -> Result<(), RigError> {
        self.client()?.set(&RigctlCommand::SetRit(0)).await
    }

    async fn send_raw(&mut self, bytes: &[u8]) -> Result<(), RigError> {
        let raw = String::from_utf8_lossy(bytes).trim_end().to_string();
        if raw.contains('\n') {
            return Err(RigError::InvalidArgument(
                "raw command must be a single line".to_string(),
            ));
        }
        self.client()?
            .transact(&RigctlCommand::SendRaw(raw))
            .await
            .map(|_| ())
    }

    fn describe(&self) -> String {
        format!("rigctld {}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, DuplexStream};

    async fn expect_line(daemon: &mut DuplexStream, expected: &str) {
        let mut buf = vec![0u8; expected.len()];
        daemon.read_exact(&mut buf).await.unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), expected);
    }

    #[tokio::test]
    async fn test_set_frequency() {
        let (host, mut daemon) = tokio::io::duplex(256);
        let mut client = RigctlClient::new(host, Duration::from_millis(500));

        let server = tokio::spawn(async move {
            expect_line(&mut daemon, "F 14025000\n").await;
            daemon.write_all(b"RPRT 0\n").await.unwrap();
            daemon
        });

        client
            .set(&RigctlCommand::SetFrequency(14_025_000))
            .await
            .unwrap();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_get_mode_reads_two_lines() {
        let (host, mut daemon) = tokio::io::duplex(256);
        let mut client = RigctlClient::new(host, Duration::from_millis(500));

        let server = tokio::spawn(async move {
            expect_line(&mut daemon, "m\n").await;
            daemon.write_all(b"CW\n500\n").await.unwrap();
            daemon
        });

        assert_eq!(
            client.mode().await.unwrap(),
            (RigMode::Cw, Passband::Hz(500))
        );
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_error_report_ends_reply() {
        let (host, mut daemon) = tokio::io::duplex(256);
        let mut client = RigctlClient::new(host, Duration::from_millis(500));

        let server = tokio::spawn(async move {
            expect_line(&mut daemon, "m\n").await;
            daemon.write_all(b"RPRT -11\n").await.unwrap();
            daemon
        });

        assert!(matches!(client.mode().await, Err(RigError::Protocol(_))));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_silent_daemon_times_out() {
        let (host, _daemon) = tokio::io::duplex(256);
        let mut client = RigctlClient::new(host, Duration::from_millis(30));

        match client.frequency().await {
            Err(RigError::Transport(e)) => assert_eq!(e.kind(), io::ErrorKind::TimedOut),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_closed_daemon_is_a_fault() {
        let (host, daemon) = tokio::io::duplex(256);
        drop(daemon);
        let mut client = RigctlClient::new(host, Duration::from_millis(200));

        let err = client.ptt().await.unwrap_err();
        assert!(err.is_fault());
    }

    #[tokio::test]
    async fn test_unopened_net_rig() {
        let mut rig = NetRig::new("localhost", 4532, Duration::from_millis(100));
        assert!(matches!(rig.frequency().await, Err(RigError::NotOpen)));
        rig.close().await.unwrap();
    }
}
