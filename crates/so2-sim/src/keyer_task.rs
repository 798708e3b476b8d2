//! Virtual keyer actor task
//!
//! Owns the device side of an in-memory duplex stream. Bytes from the host
//! go through [`VirtualKeyer::process`] and the reply is written back; the
//! command channel lets a test inject unsolicited keyer bytes (status
//! changes, speed pot readings) or stop the task.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use so2_protocol::KeyerCommand;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::keyer::{VirtualKeyer, VirtualKeyerConfig};

/// Commands that can be sent to a virtual keyer task
#[derive(Debug, Clone)]
pub enum VirtualKeyerCommand {
    /// Write these bytes to the host as if the keyer sent them
    Inject(Vec<u8>),
    /// Stop the task, closing the stream
    Shutdown,
}

/// Keyer state shared between the task and its handle
#[derive(Debug)]
struct Shared {
    keyer: VirtualKeyer,
    raw: Vec<u8>,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Run the virtual keyer task until the host hangs up or a shutdown arrives
async fn run_virtual_keyer_task<S>(
    mut stream: S,
    shared: Arc<Mutex<Shared>>,
    mut cmd_rx: mpsc::Receiver<VirtualKeyerCommand>,
) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = [0u8; 256];
    info!("Starting virtual keyer task");

    loop {
        tokio::select! {
            result = stream.read(&mut buf) => {
                match result {
                    Ok(0) => {
                        debug!("Virtual keyer stream closed");
                        break;
                    }
                    Ok(n) => {
                        let data = &buf[..n];
                        debug!("Virtual keyer received {} bytes: {:02X?}", n, data);
                        let reply = {
                            let mut shared = lock(&shared);
                            shared.raw.extend_from_slice(data);
                            shared.keyer.process(data)
                        };
                        if !reply.is_empty() {
                            stream.write_all(&reply).await?;
                            stream.flush().await?;
                        }
                    }
                    Err(e) => {
                        warn!("Virtual keyer stream error: {}", e);
                        return Err(e);
                    }
                }
            }

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(VirtualKeyerCommand::Inject(bytes)) => {
                        debug!("Virtual keyer injecting {:02X?}", bytes);
                        stream.write_all(&bytes).await?;
                        stream.flush().await?;
                    }
                    Some(VirtualKeyerCommand::Shutdown) | None => {
                        info!("Virtual keyer shutting down");
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}

/// Handle to a running virtual keyer
#[derive(Debug)]
pub struct VirtualKeyerHandle {
    shared: Arc<Mutex<Shared>>,
    cmd_tx: mpsc::Sender<VirtualKeyerCommand>,
    task: JoinHandle<io::Result<()>>,
}

impl VirtualKeyerHandle {
    /// Commands received from the host so far
    pub fn received(&self) -> Vec<KeyerCommand> {
        lock(&self.shared).keyer.received().to_vec()
    }

    /// Every byte received from the host so far
    pub fn raw(&self) -> Vec<u8> {
        lock(&self.shared).raw.clone()
    }

    /// Whether the host currently holds the keyer open
    pub fn host_open(&self) -> bool {
        lock(&self.shared).keyer.host_open()
    }

    /// Send unsolicited bytes to the host
    pub async fn inject(&self, bytes: Vec<u8>) {
        let _ = self.cmd_tx.send(VirtualKeyerCommand::Inject(bytes)).await;
    }

    /// Stop the task and wait for it
    pub async fn shutdown(self) {
        let _ = self.cmd_tx.send(VirtualKeyerCommand::Shutdown).await;
        let _ = self.task.await;
    }
}

/// Spawn a virtual keyer, returning the host end of its stream
pub fn spawn_virtual_keyer(config: VirtualKeyerConfig) -> (DuplexStream, VirtualKeyerHandle) {
    let (host, device) = tokio::io::duplex(1024);
    let (cmd_tx, cmd_rx) = mpsc::channel(16);
    let shared = Arc::new(Mutex::new(Shared {
        keyer: VirtualKeyer::new(config),
        raw: Vec::new(),
    }));

    let task = tokio::spawn(run_virtual_keyer_task(device, Arc::clone(&shared), cmd_rx));
    (
        host,
        VirtualKeyerHandle {
            shared,
            cmd_tx,
            task,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echo_over_stream() {
        let (mut host, keyer) = spawn_virtual_keyer(VirtualKeyerConfig::default());

        host.write_all(&[0x00, 0x04, 0x55]).await.unwrap();
        let mut byte = [0u8; 1];
        host.read_exact(&mut byte).await.unwrap();
        assert_eq!(byte[0], 0x55);
        assert_eq!(keyer.raw(), vec![0x00, 0x04, 0x55]);

        keyer.inject(vec![0xc4]).await;
        host.read_exact(&mut byte).await.unwrap();
        assert_eq!(byte[0], 0xc4);

        keyer.shutdown().await;
    }
}
