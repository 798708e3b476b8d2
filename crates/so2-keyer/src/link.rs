//! Keyer link: handshake, command surface and session state

use std::io;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use so2_protocol::keyer::speed_in_range;
use so2_protocol::{EncodeCommand, KeyerCommand, Radio};
use tokio::io::{AsyncWriteExt, WriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::KeyerConfig;
use crate::error::KeyerError;
use crate::events::KeyerEvent;
use crate::handshake::{exchange, write_bounded, InitObserver, InitPhase};
use crate::listener::{run_listener, SharedState};
use crate::port::{Connector, KeyerPort};

/// Connection to a keyer
///
/// The link never panics on hardware trouble. Failures leave it closed, are
/// reported through [`KeyerEvent::Error`], and are also returned to the
/// caller. There is no automatic retry; call [`KeyerLink::open`] again.
///
/// Prefer [`KeyerLink::close`] over dropping an open link. Dropping it inside
/// a runtime still sends host close, but nothing waits for the write.
pub struct KeyerLink<C: Connector> {
    connector: C,
    config: KeyerConfig,
    event_tx: mpsc::Sender<KeyerEvent>,
    phase: InitPhase,
    version: u8,
    buffer: Vec<u8>,
    writer: Option<WriteHalf<C::Port>>,
    listener: Option<JoinHandle<()>>,
    shared: Arc<SharedState>,
}

impl<C: Connector> KeyerLink<C> {
    /// Create a closed link
    pub fn new(connector: C, config: KeyerConfig, event_tx: mpsc::Sender<KeyerEvent>) -> Self {
        Self {
            connector,
            config,
            event_tx,
            phase: InitPhase::NotStarted,
            version: 0,
            buffer: Vec::new(),
            writer: None,
            listener: None,
            shared: Arc::new(SharedState::default()),
        }
    }

    /// Returns true once the handshake has completed and the link is healthy
    pub fn is_open(&self) -> bool {
        self.phase == InitPhase::Opened
            && self.writer.is_some()
            && self.shared.open.load(Ordering::Acquire)
    }

    /// Returns true while the keyer reports it is sending
    pub fn is_sending(&self) -> bool {
        self.is_open() && self.shared.sending.load(Ordering::Acquire)
    }

    /// Firmware version reported during the handshake (0 = unknown)
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Current handshake phase
    ///
    /// A link whose device went away reports [`InitPhase::NotStarted`] even
    /// before [`KeyerLink::close`] is called.
    pub fn phase(&self) -> InitPhase {
        if self.phase == InitPhase::Opened && !self.shared.open.load(Ordering::Acquire) {
            return InitPhase::NotStarted;
        }
        self.phase
    }

    /// Last speed pot reading
    pub fn speed_pot(&self) -> u8 {
        self.shared.speed_pot.load(Ordering::Acquire)
    }

    /// Radio selected on the keyer's output port
    pub fn active_radio(&self) -> Radio {
        self.shared.active_radio()
    }

    /// Number of bytes waiting in the outbound buffer
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Configuration this link was created with
    pub fn config(&self) -> &KeyerConfig {
        &self.config
    }

    /// Open the keyer and run the initialization handshake
    ///
    /// If the link is already open it is closed and a fresh connection is
    /// made. Returns the firmware version on success.
    pub async fn open(&mut self) -> Result<u8, KeyerError> {
        if self.writer.is_some() || self.phase != InitPhase::NotStarted {
            self.close().await;
        }

        let mut port = match self.connector.connect() {
            Ok(port) => port,
            Err(e) => {
                let err = KeyerError::Connection(e.to_string());
                warn!("Keyer open failed: {}", e);
                self.emit(KeyerEvent::Error(err.to_string())).await;
                return Err(err);
            }
        };

        match self.handshake(&mut port).await {
            Ok(observer) => {
                let (reader, writer) = tokio::io::split(port);
                self.shared.reset();
                if let Some(pot) = observer.speed_pot {
                    self.shared.speed_pot.store(pot, Ordering::Release);
                }
                self.shared.open.store(true, Ordering::Release);
                self.writer = Some(writer);
                self.listener = Some(tokio::spawn(run_listener(
                    reader,
                    self.shared.clone(),
                    self.event_tx.clone(),
                )));
                self.version = observer.version;
                self.phase = InitPhase::Opened;

                info!("Keyer opened, firmware version {}", self.version);
                self.emit(KeyerEvent::Version(self.version)).await;
                Ok(self.version)
            }
            Err(err) => {
                warn!("Keyer handshake failed: {}", err);
                drop(port);
                self.phase = InitPhase::Failed;
                self.version = 0;
                self.buffer.clear();
                self.shared.reset();
                self.emit(KeyerEvent::Error(err.to_string())).await;
                Err(err)
            }
        }
    }

    /// Handshake steps on the unsplit stream
    async fn handshake(&mut self, port: &mut C::Port) -> Result<InitObserver, KeyerError> {
        let limit = self.config.step_timeout();
        let mut observer = InitObserver::default();

        // RTS low, DTR high powers the keyer's interface
        port.set_control_lines(false, true)
            .map_err(|e| KeyerError::Connection(e.to_string()))?;

        // Three no-ops resynchronize the keyer's command parser
        let null = KeyerCommand::Null.encode();
        for _ in 0..3 {
            exchange(port, &null, limit, &mut observer).await?;
        }

        self.phase = InitPhase::EchoTestSent;
        debug!("Keyer echo test");
        exchange(
            port,
            &KeyerCommand::EchoTest(so2_protocol::ECHO_TEST_BYTE).encode(),
            limit,
            &mut observer,
        )
        .await?;

        if !observer.echo_confirmed {
            return Err(KeyerError::Initialization(
                "echo test failed: no response from keyer".to_string(),
            ));
        }
        self.phase = InitPhase::EchoConfirmed;

        exchange(port, &KeyerCommand::HostOpen.encode(), limit, &mut observer).await?;

        if observer.version == 0 {
            let _ = write_bounded(port, &KeyerCommand::HostClose.encode(), limit).await;
            return Err(KeyerError::Initialization(
                "could not read firmware version".to_string(),
            ));
        }

        for cmd in self.config.startup_commands() {
            debug!("Keyer setup: {:?}", cmd);
            write_bounded(port, &cmd.encode(), limit).await?;
        }

        Ok(observer)
    }

    /// Close the link
    ///
    /// Sends host close best-effort, then drops the connection and resets
    /// all session state. Closing a closed link is a no-op.
    pub async fn close(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            let limit = self.config.step_timeout();
            if let Err(e) = write_bounded(&mut writer, &KeyerCommand::HostClose.encode(), limit).await
            {
                debug!("Host close not delivered: {}", e);
            }
            let _ = writer.shutdown().await;
            info!("Keyer closed");
        }
        self.teardown();
    }

    fn teardown(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
        self.writer = None;
        self.phase = InitPhase::NotStarted;
        self.buffer.clear();
        self.shared.reset();
    }

    /// Append text to the outbound buffer without writing it
    pub fn load_buffer(&mut self, bytes: &[u8]) -> Result<(), KeyerError> {
        if !self.is_open() {
            return Err(KeyerError::NotOpen);
        }
        self.buffer.extend_from_slice(bytes);
        Ok(())
    }

    /// Write the whole outbound buffer, then clear it
    pub async fn send(&mut self) -> Result<(), KeyerError> {
        let data = std::mem::take(&mut self.buffer);
        if data.is_empty() {
            return Ok(());
        }
        debug!("Keyer send {} bytes", data.len());
        self.write_command(&data).await
    }

    /// Abort sending
    ///
    /// The local sending flag and buffer are cleared immediately, whether or
    /// not the keyer acknowledges.
    pub async fn cancel(&mut self) -> Result<(), KeyerError> {
        self.buffer.clear();
        self.shared.sending.store(false, Ordering::Release);
        self.write_command(&KeyerCommand::Cancel.encode()).await
    }

    /// Set keying speed in WPM (5-99)
    pub async fn set_speed(&mut self, wpm: u32) -> Result<(), KeyerError> {
        if !speed_in_range(wpm) {
            return Err(KeyerError::InvalidArgument(format!(
                "speed {} WPM outside 5-99",
                wpm
            )));
        }
        if !self.is_open() {
            return Err(KeyerError::NotOpen);
        }
        self.write_command(&KeyerCommand::SetSpeed(wpm as u8).encode())
            .await
    }

    /// Route keying and PTT to radio `index` (0 or 1)
    pub async fn switch_active_radio(&mut self, index: usize) -> Result<(), KeyerError> {
        let radio = Radio::try_from(index)
            .map_err(|e| KeyerError::InvalidArgument(e.to_string()))?;
        if !self.is_open() {
            return Err(KeyerError::NotOpen);
        }
        self.shared.set_active_radio(radio);
        self.write_command(&KeyerCommand::select_radio(radio).encode())
            .await
    }

    async fn write_command(&mut self, bytes: &[u8]) -> Result<(), KeyerError> {
        if !self.is_open() {
            return Err(KeyerError::NotOpen);
        }
        let Some(writer) = self.writer.as_mut() else {
            return Err(KeyerError::NotOpen);
        };

        let result: io::Result<()> = async {
            writer.write_all(bytes).await?;
            writer.flush().await
        }
        .await;

        if let Err(e) = result {
            warn!("Keyer write failed: {}", e);
            self.teardown();
            self.emit(KeyerEvent::Error(format!("Write error: {}", e)))
                .await;
            return Err(KeyerError::Transport(e));
        }
        Ok(())
    }

    async fn emit(&self, event: KeyerEvent) {
        let _ = self.event_tx.send(event).await;
    }
}

impl<C: Connector> Drop for KeyerLink<C> {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
        let Some(mut writer) = self.writer.take() else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("Keyer dropped outside a runtime, host close not sent");
            return;
        };
        let limit = self.config.step_timeout();
        runtime.spawn(async move {
            if let Err(e) = write_bounded(&mut writer, &KeyerCommand::HostClose.encode(), limit).await
            {
                debug!("Host close not delivered: {}", e);
            }
            let _ = writer.shutdown().await;
        });
    }
}

impl<C: Connector> std::fmt::Debug for KeyerLink<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyerLink")
            .field("device", &self.config.device)
            .field("phase", &self.phase)
            .field("version", &self.version)
            .field("buffered", &self.buffer.len())
            .finish()
    }
}
