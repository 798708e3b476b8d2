//! Simulated transceiver
//!
//! [`VirtualRig`] implements [`RigControl`] against in-memory state shared
//! with the test that created it. Every call is logged, and failures can be
//! switched on to exercise the link's error paths: a refused open, a
//! transport fault, or a command the radio rejects.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use so2_protocol::{Passband, ProtocolError, Radio, RigMode};
use so2_rig::{async_trait, RadioConfig, RigControl, RigError, RigFactory};
use tracing::debug;

/// One call made on a virtual rig
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RigCall {
    Open,
    Close,
    Frequency,
    SetFrequency(u64),
    Mode,
    SetMode(RigMode, Passband),
    Ptt,
    SetPtt(bool),
    ClearRit,
    IfFrequency,
    SendRaw(Vec<u8>),
}

impl RigCall {
    /// Whether the call changes radio state
    pub fn is_set(&self) -> bool {
        matches!(
            self,
            RigCall::SetFrequency(_)
                | RigCall::SetMode(..)
                | RigCall::SetPtt(_)
                | RigCall::ClearRit
                | RigCall::SendRaw(_)
        )
    }
}

#[derive(Debug)]
struct RigState {
    name: String,
    open: bool,
    frequency_hz: u64,
    mode: RigMode,
    passband: Passband,
    ptt: bool,
    rit_hz: i32,
    if_frequency: i32,
    fail_open: bool,
    fault: bool,
    reject: bool,
    calls: Vec<RigCall>,
}

/// In-memory transceiver; clones share the same radio
#[derive(Debug, Clone)]
pub struct VirtualRig {
    state: Arc<Mutex<RigState>>,
}

impl VirtualRig {
    /// A closed rig tuned to `frequency_hz` in `mode`
    pub fn new(name: impl Into<String>, frequency_hz: u64, mode: RigMode) -> Self {
        Self {
            state: Arc::new(Mutex::new(RigState {
                name: name.into(),
                open: false,
                frequency_hz,
                mode,
                passband: Passband::Normal,
                ptt: false,
                rit_hz: 0,
                if_frequency: 0,
                fail_open: false,
                fault: false,
                reject: false,
                calls: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RigState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make `open` fail with a connection error
    pub fn set_fail_open(&self, fail: bool) {
        self.lock().fail_open = fail;
    }

    /// Make every command fail with a broken-pipe transport error
    pub fn set_fault(&self, fault: bool) {
        self.lock().fault = fault;
    }

    /// Make every command fail with a protocol rejection
    pub fn set_reject(&self, reject: bool) {
        self.lock().reject = reject;
    }

    /// Change the frequency from the front panel
    pub fn tune(&self, hz: u64) {
        self.lock().frequency_hz = hz;
    }

    /// Set the reported IF offset
    pub fn set_if_frequency(&self, hz: i32) {
        self.lock().if_frequency = hz;
    }

    /// Put a RIT offset on the radio
    pub fn set_rit(&self, hz: i32) {
        self.lock().rit_hz = hz;
    }

    /// Whether the transport is open
    pub fn is_open(&self) -> bool {
        self.lock().open
    }

    /// Current frequency in Hz
    pub fn frequency_hz(&self) -> u64 {
        self.lock().frequency_hz
    }

    /// Current mode and passband
    pub fn mode(&self) -> (RigMode, Passband) {
        let state = self.lock();
        (state.mode, state.passband)
    }

    /// Current PTT state
    pub fn ptt(&self) -> bool {
        self.lock().ptt
    }

    /// Current RIT offset
    pub fn rit_hz(&self) -> i32 {
        self.lock().rit_hz
    }

    /// Every call made so far
    pub fn calls(&self) -> Vec<RigCall> {
        self.lock().calls.clone()
    }

    /// Calls that change radio state, in order
    pub fn set_calls(&self) -> Vec<RigCall> {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.is_set())
            .cloned()
            .collect()
    }

    /// Forget the call log
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Log `call` and check whether it may go through
    fn begin(&self, call: RigCall) -> Result<MutexGuard<'_, RigState>, RigError> {
        let mut state = self.lock();
        debug!("{}: {:?}", state.name, call);
        state.calls.push(call);
        if !state.open {
            return Err(RigError::NotOpen);
        }
        if state.fault {
            return Err(RigError::Transport(io::Error::new(
                io::ErrorKind::BrokenPipe,
                format!("{} stopped responding", state.name),
            )));
        }
        if state.reject {
            return Err(RigError::Protocol(ProtocolError::Rejected(format!(
                "{} refused the command",
                state.name
            ))));
        }
        Ok(state)
    }
}

#[async_trait]
impl RigControl for VirtualRig {
    async fn open(&mut self) -> Result<(), RigError> {
        let mut state = self.lock();
        state.calls.push(RigCall::Open);
        if state.fail_open {
            return Err(RigError::Connection(format!("{} is not answering", state.name)));
        }
        state.open = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), RigError> {
        let mut state = self.lock();
        state.calls.push(RigCall::Close);
        state.open = false;
        Ok(())
    }

    async fn frequency(&mut self) -> Result<u64, RigError> {
        Ok(self.begin(RigCall::Frequency)?.frequency_hz)
    }

    async fn set_frequency(&mut self, hz: u64) -> Result<(), RigError> {
        self.begin(RigCall::SetFrequency(hz))?.frequency_hz = hz;
        Ok(())
    }

    async fn mode(&mut self) -> Result<(RigMode, Passband), RigError> {
        let state = self.begin(RigCall::Mode)?;
        Ok((state.mode, state.passband))
    }

    async fn set_mode(&mut self, mode: RigMode, passband: Passband) -> Result<(), RigError> {
        let mut state = self.begin(RigCall::SetMode(mode, passband))?;
        state.mode = mode;
        if passband != Passband::NoChange {
            state.passband = passband;
        }
        Ok(())
    }

    async fn ptt(&mut self) -> Result<bool, RigError> {
        Ok(self.begin(RigCall::Ptt)?.ptt)
    }

    async fn set_ptt(&mut self, on: bool) -> Result<(), RigError> {
        self.begin(RigCall::SetPtt(on))?.ptt = on;
        Ok(())
    }

    async fn clear_rit(&mut self) -> Result<(), RigError> {
        self.begin(RigCall::ClearRit)?.rit_hz = 0;
        Ok(())
    }

    async fn if_frequency(&mut self) -> Result<i32, RigError> {
        Ok(self.begin(RigCall::IfFrequency)?.if_frequency)
    }

    async fn send_raw(&mut self, bytes: &[u8]) -> Result<(), RigError> {
        drop(self.begin(RigCall::SendRaw(bytes.to_vec()))?);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("virtual {}", self.lock().name)
    }
}

/// Factory handing out the same two virtual rigs on every `create`
#[derive(Debug, Clone)]
pub struct VirtualRigFactory {
    rigs: [VirtualRig; 2],
}

impl VirtualRigFactory {
    /// Factory for radios A and B
    pub fn new(a: VirtualRig, b: VirtualRig) -> Self {
        Self { rigs: [a, b] }
    }

    /// The rig behind `radio`
    pub fn rig(&self, radio: Radio) -> &VirtualRig {
        &self.rigs[radio.index()]
    }
}

impl Default for VirtualRigFactory {
    fn default() -> Self {
        Self::new(
            VirtualRig::new("rig A", 14_025_000, RigMode::Cw),
            VirtualRig::new("rig B", 7_025_000, RigMode::Cw),
        )
    }
}

impl RigFactory for VirtualRigFactory {
    fn create(&self, radio: Radio, config: &RadioConfig) -> Result<Box<dyn RigControl>, RigError> {
        debug!("Creating virtual {} (model {})", radio, config.model);
        Ok(Box::new(self.rigs[radio.index()].clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_closed_rig_refuses_commands() {
        let mut rig = VirtualRig::new("test", 14_000_000, RigMode::Usb);
        assert!(matches!(rig.set_ptt(true).await, Err(RigError::NotOpen)));

        rig.open().await.unwrap();
        rig.set_ptt(true).await.unwrap();
        assert!(rig.ptt());
        assert_eq!(rig.set_calls(), vec![RigCall::SetPtt(true), RigCall::SetPtt(true)]);
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let mut rig = VirtualRig::new("test", 14_000_000, RigMode::Usb);
        rig.set_fail_open(true);
        assert!(matches!(rig.open().await, Err(RigError::Connection(_))));

        rig.set_fail_open(false);
        rig.open().await.unwrap();

        rig.set_reject(true);
        let err = rig.set_frequency(7_000_000).await.unwrap_err();
        assert!(!err.is_fault());
        assert_eq!(rig.frequency_hz(), 14_000_000);

        rig.set_reject(false);
        rig.set_fault(true);
        assert!(rig.frequency().await.unwrap_err().is_fault());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let factory = VirtualRigFactory::default();
        let mut rig = factory
            .create(Radio::B, &RadioConfig::network("localhost", 4532))
            .unwrap();
        rig.open().await.unwrap();
        rig.set_mode(RigMode::Lsb, Passband::Hz(2400)).await.unwrap();

        assert!(factory.rig(Radio::B).is_open());
        assert_eq!(factory.rig(Radio::B).mode(), (RigMode::Lsb, Passband::Hz(2400)));
        assert!(!factory.rig(Radio::A).is_open());
    }
}
