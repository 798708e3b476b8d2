//! Two-radio link: lifecycle, pending-command drain and status polling
//!
//! Each radio owns three things:
//!
//! - pending command fields behind a short `std::sync::Mutex`, so setters
//!   never wait on I/O
//! - a cached [`RadioState`], also behind a short lock
//! - its transport behind a `tokio::sync::Mutex`, held for the whole of any
//!   command or status read
//!
//! The drain tick takes a radio's transport guard first and only then takes
//! its pending fields, so anything set while a drain is running waits for
//! the next tick. The two radios drain concurrently and never share a guard.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use so2_protocol::{ModeGroup, Passband, Radio, RigMode};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::config::RadioLinkConfig;
use crate::error::RigError;
use crate::events::RadioEvent;
use crate::pending::{FrequencyRequest, PendingCommand, PendingFields};
use crate::state::{LinkState, RadioState};
use crate::transport::{DefaultRigFactory, RigControl, RigFactory};

type RigSlot = Option<Box<dyn RigControl>>;

struct RadioSlot {
    pending: Mutex<PendingFields>,
    state: Mutex<RadioState>,
    rig: tokio::sync::Mutex<RigSlot>,
    ticks: AtomicU64,
}

impl RadioSlot {
    fn new(radio: Radio) -> Self {
        Self {
            pending: Mutex::new(PendingFields::default()),
            state: Mutex::new(RadioState::new(radio)),
            rig: tokio::sync::Mutex::new(None),
            ticks: AtomicU64::new(0),
        }
    }
}

/// Lock, recovering the data from a poisoned mutex
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Control of up to two radios
///
/// Share it behind an `Arc`: the drain task and callers use it concurrently.
pub struct RadioLink {
    slots: [RadioSlot; 2],
    config: RadioLinkConfig,
    factory: Arc<dyn RigFactory>,
    event_tx: mpsc::Sender<RadioEvent>,
}

impl RadioLink {
    /// Create a link with every radio closed
    pub fn new(
        config: RadioLinkConfig,
        factory: Arc<dyn RigFactory>,
        event_tx: mpsc::Sender<RadioEvent>,
    ) -> Self {
        Self {
            slots: [RadioSlot::new(Radio::A), RadioSlot::new(Radio::B)],
            config,
            factory,
            event_tx,
        }
    }

    /// Create a link using the rigctld and Kenwood backends
    pub fn with_default_factory(config: RadioLinkConfig, event_tx: mpsc::Sender<RadioEvent>) -> Self {
        Self::new(config, Arc::new(DefaultRigFactory), event_tx)
    }

    fn slot(&self, radio: Radio) -> &RadioSlot {
        &self.slots[radio.index()]
    }

    fn update_state<R>(&self, radio: Radio, f: impl FnOnce(&mut RadioState) -> R) -> R {
        f(&mut lock(&self.slot(radio).state))
    }

    fn update_pending<R>(&self, radio: Radio, f: impl FnOnce(&mut PendingFields) -> R) -> R {
        f(&mut lock(&self.slot(radio).pending))
    }

    /// Configuration this link was created with
    pub fn config(&self) -> &RadioLinkConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Open `radio`'s transport
    ///
    /// Opening an open radio is a no-op. A failure leaves the radio closed,
    /// emits [`RadioEvent::Error`] and never touches the other radio.
    pub async fn open_rig(&self, radio: Radio) -> Result<(), RigError> {
        let config = self
            .config
            .radio(radio)
            .ok_or_else(|| RigError::InvalidArgument(format!("{} is not configured", radio)))?;

        let mut guard = self.slot(radio).rig.lock().await;
        if guard.is_some() && self.link_state(radio) == LinkState::Open {
            return Ok(());
        }
        if let Some(mut stale) = guard.take() {
            let _ = stale.close().await;
        }

        self.update_state(radio, |s| s.reset(LinkState::Opening));
        self.update_pending(radio, PendingFields::clear);

        let opened = async {
            let mut rig = self.factory.create(radio, config)?;
            rig.open().await?;
            Ok::<_, RigError>(rig)
        }
        .await;

        match opened {
            Ok(rig) => {
                info!("{} opened: {}", radio, rig.describe());
                *guard = Some(rig);
                self.update_state(radio, |s| {
                    s.link = LinkState::Open;
                    s.touch();
                });
                self.emit(RadioEvent::Opened(radio));
                Ok(())
            }
            Err(e) => {
                warn!("{} failed to open: {}", radio, e);
                self.update_state(radio, |s| s.reset(LinkState::Closed));
                self.emit(RadioEvent::Error {
                    radio,
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Close `radio`'s transport; closing a closed radio is a no-op
    pub async fn close_rig(&self, radio: Radio) {
        let mut guard = self.slot(radio).rig.lock().await;
        if let Some(mut rig) = guard.take() {
            if let Err(e) = rig.close().await {
                debug!("{} close: {}", radio, e);
            }
        }
        self.update_pending(radio, PendingFields::clear);
        let previous = self.update_state(radio, |s| {
            let previous = s.link;
            s.reset(LinkState::Closed);
            previous
        });
        if previous != LinkState::Closed {
            info!("{} closed", radio);
            self.emit(RadioEvent::Closed(radio));
        }
    }

    /// Open every configured radio
    ///
    /// Every radio is attempted; the first failure is returned.
    pub async fn open_all(&self) -> Result<(), RigError> {
        let mut first_error = None;
        for radio in Radio::ALL {
            if self.config.radio(radio).is_none() {
                continue;
            }
            if let Err(e) = self.open_rig(radio).await {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Close both radios
    pub async fn close_all(&self) {
        for radio in Radio::ALL {
            self.close_rig(radio).await;
        }
    }

    // ------------------------------------------------------------------
    // Requests (never block on I/O)
    // ------------------------------------------------------------------

    /// Request PTT on or off; replaces any pending PTT request
    pub fn set_ptt(&self, radio: Radio, on: bool) {
        self.update_pending(radio, |p| p.set_ptt(on));
    }

    /// Request an absolute frequency
    pub fn qsy_exact(&self, radio: Radio, hz: u64) -> Result<(), RigError> {
        if hz == 0 {
            return Err(RigError::InvalidArgument("frequency must be non-zero".into()));
        }
        self.update_pending(radio, |p| p.set_frequency(hz));
        Ok(())
    }

    /// Request a move relative to the current frequency
    pub fn qsy_delta(&self, radio: Radio, delta_hz: i64) {
        if delta_hz != 0 {
            self.update_pending(radio, |p| p.add_frequency_delta(delta_hz));
        }
    }

    /// Request a mode and passband change
    pub fn set_mode(&self, radio: Radio, mode: RigMode, passband: Passband) -> Result<(), RigError> {
        if mode == RigMode::None {
            return Err(RigError::InvalidArgument("cannot set mode NONE".into()));
        }
        self.update_pending(radio, |p| p.set_mode(mode, passband));
        Ok(())
    }

    /// Request a RIT clear
    pub fn clear_rit(&self, radio: Radio) {
        self.update_pending(radio, PendingFields::request_clear_rit);
    }

    /// Send a raw command right away, holding the radio's guard
    pub async fn send_raw(&self, radio: Radio, bytes: &[u8]) -> Result<(), RigError> {
        let mut guard = self.slot(radio).rig.lock().await;
        let Some(rig) = guard.as_mut() else {
            return Err(RigError::NotOpen);
        };
        let result = rig.send_raw(bytes).await;
        let mut events = Vec::new();
        if let Err(e) = &result {
            self.handle_error(radio, &mut guard, e, &mut events).await;
        }
        drop(guard);
        for event in events {
            self.emit(event);
        }
        result
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Snapshot of `radio`'s cached state
    pub fn state(&self, radio: Radio) -> RadioState {
        lock(&self.slot(radio).state).clone()
    }

    /// Whether `radio` is open and usable
    pub fn radio_open(&self, radio: Radio) -> bool {
        self.link_state(radio) == LinkState::Open
    }

    /// Connection state of `radio`
    pub fn link_state(&self, radio: Radio) -> LinkState {
        lock(&self.slot(radio).state).link
    }

    /// Last confirmed frequency in Hz
    pub fn frequency(&self, radio: Radio) -> Option<u64> {
        lock(&self.slot(radio).state).frequency_hz
    }

    /// Raw mode
    pub fn mode(&self, radio: Radio) -> RigMode {
        lock(&self.slot(radio).state).mode
    }

    /// Short mode name (`PKT` for every packet mode)
    pub fn mode_str(&self, radio: Radio) -> &'static str {
        self.mode(radio).short_name()
    }

    /// Semantic mode group
    pub fn mode_group(&self, radio: Radio) -> ModeGroup {
        self.mode(radio).group()
    }

    /// Passband that goes with the mode
    pub fn passband(&self, radio: Radio) -> Passband {
        lock(&self.slot(radio).state).passband
    }

    /// Last IF offset reading in Hz
    pub fn if_frequency(&self, radio: Radio) -> i32 {
        lock(&self.slot(radio).state).if_frequency
    }

    /// Pending PTT request, if any
    pub fn ptt_pending(&self, radio: Radio) -> Option<bool> {
        lock(&self.slot(radio).pending).ptt()
    }

    /// Whether a RIT clear is waiting for the next tick
    pub fn rit_clear_pending(&self, radio: Radio) -> bool {
        lock(&self.slot(radio).pending).rit_clear()
    }

    // ------------------------------------------------------------------
    // Drain
    // ------------------------------------------------------------------

    /// Run one drain tick for both radios
    pub async fn drain_once(&self) {
        tokio::join!(self.drain_tick(Radio::A), self.drain_tick(Radio::B));
    }

    /// Run one drain tick for `radio`
    ///
    /// Events are queued while the radio's guard is held and only sent once
    /// it has been released.
    async fn drain_tick(&self, radio: Radio) {
        let tick = self.slot(radio).ticks.fetch_add(1, Ordering::Relaxed) + 1;
        let every = u64::from(self.config.poll_every);
        let poll = every > 0 && tick % every == 0;

        let mut events = Vec::new();
        self.drain_radio(radio, poll, &mut events).await;
        for event in events {
            self.emit(event);
        }
    }

    async fn drain_radio(&self, radio: Radio, poll: bool, events: &mut Vec<RadioEvent>) {
        let slot = self.slot(radio);
        let mut guard = slot.rig.lock().await;

        let commands = self.update_pending(radio, PendingFields::take);
        if guard.is_none() {
            if !commands.is_empty() {
                debug!("{} not open, dropping {} pending commands", radio, commands.len());
            }
            return;
        }

        for cmd in commands {
            let Some(rig) = guard.as_mut() else {
                return;
            };
            trace!("{} issuing {:?}", radio, cmd);
            if let Err(e) = self.issue(radio, rig.as_mut(), cmd).await {
                if self.handle_error(radio, &mut guard, &e, events).await {
                    return;
                }
            }
        }

        if poll {
            if let Some(rig) = guard.as_mut() {
                match self.poll_status(radio, rig.as_mut()).await {
                    Ok(status) => events.extend(status),
                    Err(e) => {
                        self.handle_error(radio, &mut guard, &e, events).await;
                    }
                }
            }
        }
    }

    async fn issue(
        &self,
        radio: Radio,
        rig: &mut dyn RigControl,
        cmd: PendingCommand,
    ) -> Result<(), RigError> {
        match cmd {
            PendingCommand::Ptt(on) => rig.set_ptt(on).await,
            PendingCommand::Frequency(request) => {
                let mut current = self.frequency(radio);
                if current.is_none() && matches!(request, FrequencyRequest::Delta(_)) {
                    current = Some(rig.frequency().await?);
                }
                let Some(hz) = request.resolve(current) else {
                    return Ok(());
                };
                if hz == 0 {
                    return Err(RigError::InvalidArgument(format!(
                        "{:?} from {:?} Hz leaves no frequency",
                        request, current
                    )));
                }
                rig.set_frequency(hz).await?;
                self.update_state(radio, |s| {
                    s.frequency_hz = Some(hz);
                    s.touch();
                });
                Ok(())
            }
            PendingCommand::Mode(mode, passband) => {
                rig.set_mode(mode, passband).await?;
                self.update_state(radio, |s| {
                    s.mode = mode;
                    s.passband = passband;
                    s.touch();
                });
                Ok(())
            }
            PendingCommand::ClearRit => rig.clear_rit().await,
        }
    }

    /// Read status; returns the event to emit if anything changed
    async fn poll_status(
        &self,
        radio: Radio,
        rig: &mut dyn RigControl,
    ) -> Result<Option<RadioEvent>, RigError> {
        let hz = rig.frequency().await?;
        let (mode, passband) = rig.mode().await?;
        let if_hz = rig.if_frequency().await?;

        let changed = self.update_state(radio, |s| {
            let changed = s.frequency_hz != Some(hz) || s.mode != mode || s.passband != passband;
            s.frequency_hz = Some(hz);
            s.mode = mode;
            s.passband = passband;
            s.if_frequency = if_hz;
            s.touch();
            changed
        });

        if !changed {
            return Ok(None);
        }
        debug!("{} status: {} Hz {}", radio, hz, mode.name());
        Ok(Some(RadioEvent::Status {
            radio,
            frequency_hz: Some(hz),
            mode,
            passband,
        }))
    }

    /// Record a command failure and queue its event; returns true if the
    /// transport was dropped
    async fn handle_error(
        &self,
        radio: Radio,
        guard: &mut RigSlot,
        error: &RigError,
        events: &mut Vec<RadioEvent>,
    ) -> bool {
        let fault = error.is_fault();
        if fault {
            warn!("{} transport fault: {}", radio, error);
            if let Some(mut rig) = guard.take() {
                let _ = rig.close().await;
            }
            self.update_pending(radio, PendingFields::clear);
            self.update_state(radio, |s| s.reset(LinkState::Error));
        } else {
            warn!("{} command failed: {}", radio, error);
            self.update_state(radio, |s| s.healthy = false);
        }
        events.push(RadioEvent::Error {
            radio,
            message: error.to_string(),
        });
        fault
    }

    /// Queue an event for the coordinator without waiting
    ///
    /// A full channel drops the event; the link never stalls on a slow reader.
    fn emit(&self, event: RadioEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!("Radio event channel full, dropping {:?}", event);
            }
            Err(TrySendError::Closed(_)) => {}
        }
    }

    /// Start the drain timers, one task per radio
    ///
    /// Each radio ticks every `tick_ms` on its own, so a slow radio never
    /// delays the other. Ticks missed while a radio is busy are skipped rather
    /// than bunched up.
    pub fn spawn_drain(self: &Arc<Self>) -> DrainTask {
        let (stop_tx, stop_rx) = watch::channel(false);

        let handles = Radio::ALL
            .into_iter()
            .map(|radio| {
                let link = Arc::clone(self);
                let mut stop_rx = stop_rx.clone();
                tokio::spawn(async move {
                    let mut ticker = interval(link.config.tick());
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                    info!("{} drain started ({:?} tick)", radio, link.config.tick());

                    loop {
                        tokio::select! {
                            _ = stop_rx.changed() => break,
                            _ = ticker.tick() => link.drain_tick(radio).await,
                        }
                    }

                    info!("{} drain stopped", radio);
                })
            })
            .collect();

        DrainTask { stop_tx, handles }
    }
}

impl std::fmt::Debug for RadioLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RadioLink")
            .field("a", &self.link_state(Radio::A))
            .field("b", &self.link_state(Radio::B))
            .field("ticks_a", &self.slot(Radio::A).ticks.load(Ordering::Relaxed))
            .field("ticks_b", &self.slot(Radio::B).ticks.load(Ordering::Relaxed))
            .finish()
    }
}

/// Handle to the running drain timers
#[derive(Debug)]
pub struct DrainTask {
    stop_tx: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl DrainTask {
    /// Stop the timers and wait for in-flight ticks to finish
    pub async fn stop(mut self) {
        let _ = self.stop_tx.send(true);
        for handle in self.handles.drain(..) {
            let _ = handle.await;
        }
    }
}

impl Drop for DrainTask {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}
