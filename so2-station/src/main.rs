//! SO2 Station Console
//!
//! Opens the CW keyer and up to two radios from saved settings, then bridges
//! operator commands typed on stdin to the keyer and radio links and prints
//! the events both links report.

mod console;
mod settings;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use console::{ConsoleCommand, HELP};
use settings::Settings;
use so2_keyer::{KeyerEvent, KeyerLink, SerialConnector};
use so2_protocol::Radio;
use so2_rig::{BuiltinModels, ModelCatalog, RadioEvent, RadioLink};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

struct Station {
    keyer: KeyerLink<SerialConnector>,
    radios: Arc<RadioLink>,
    catalog: ModelCatalog,
}

impl Station {
    async fn open(&mut self) {
        if self.keyer.config().device.is_empty() {
            info!("No keyer device configured");
        } else if let Err(e) = self.keyer.open().await {
            warn!("Keyer not available: {}", e);
        }
        if let Err(e) = self.radios.open_all().await {
            warn!("Radio open failed: {}", e);
        }
    }

    async fn close(&mut self) {
        self.keyer.close().await;
        self.radios.close_all().await;
    }

    /// Run one command; returns false when the operator quits
    async fn execute(&mut self, cmd: ConsoleCommand) -> Result<bool> {
        match cmd {
            ConsoleCommand::Open => self.open().await,
            ConsoleCommand::Close => self.close().await,
            ConsoleCommand::Cw(text) => {
                self.keyer.load_buffer(text.as_bytes())?;
                self.keyer.send().await?;
            }
            ConsoleCommand::Cancel => self.keyer.cancel().await?,
            ConsoleCommand::Speed(wpm) => self.keyer.set_speed(wpm).await?,
            ConsoleCommand::Focus(radio) => self.keyer.switch_active_radio(radio.index()).await?,
            ConsoleCommand::Ptt(radio, on) => self.radios.set_ptt(radio, on),
            ConsoleCommand::Qsy(radio, hz) => self.radios.qsy_exact(radio, hz)?,
            ConsoleCommand::QsyDelta(radio, delta) => self.radios.qsy_delta(radio, delta),
            ConsoleCommand::Mode(radio, mode, passband) => {
                self.radios.set_mode(radio, mode, passband)?
            }
            ConsoleCommand::ClearRit(radio) => self.radios.clear_rit(radio),
            ConsoleCommand::Raw(radio, text) => self.radios.send_raw(radio, text.as_bytes()).await?,
            ConsoleCommand::Status => self.print_status(),
            ConsoleCommand::Models => self.print_models(),
            ConsoleCommand::Help => println!("{}", HELP),
            ConsoleCommand::Quit => return Ok(false),
        }
        Ok(true)
    }

    fn print_status(&self) {
        if self.keyer.is_open() {
            println!(
                "keyer: v{} focus {} pot {}{}",
                self.keyer.version(),
                self.keyer.active_radio().index(),
                self.keyer.speed_pot(),
                if self.keyer.is_sending() { " sending" } else { "" }
            );
        } else {
            println!("keyer: {:?}", self.keyer.phase());
        }

        for radio in Radio::ALL {
            let state = self.radios.state(radio);
            let model = self
                .radios
                .config()
                .radio(radio)
                .and_then(|c| self.catalog.describe(c.model))
                .unwrap_or_else(|| "-".to_string());
            let freq = state
                .frequency_hz
                .map_or_else(|| "?".to_string(), |hz| hz.to_string());
            println!(
                "{}: {} [{}] {} Hz {} ({})",
                radio,
                state.link.name(),
                model,
                freq,
                state.mode.short_name(),
                state.mode_group().name()
            );
        }
    }

    fn print_models(&self) {
        for mfg in 0..self.catalog.n_mfg() {
            let name = self.catalog.mfg_name(mfg).unwrap_or_default();
            for model in 0..self.catalog.n_models(mfg) {
                if let (Some(id), Some(model_name)) = (
                    self.catalog.model_id(mfg, model),
                    self.catalog.model_name(mfg, model),
                ) {
                    println!("{:>6}  {} {}", id, name, model_name);
                }
            }
        }
    }
}

fn print_keyer_event(event: &KeyerEvent) {
    match event {
        KeyerEvent::Version(v) => println!("keyer: firmware version {}", v),
        KeyerEvent::Transmit { radio, sending } => {
            println!("keyer: {} {}", radio, if *sending { "TX" } else { "RX" })
        }
        KeyerEvent::Echo(c) => println!("keyer: sent '{}'", char::from(*c)),
        KeyerEvent::Error(msg) => println!("keyer error: {}", msg),
    }
}

fn print_radio_event(event: &RadioEvent) {
    match event {
        RadioEvent::Opened(radio) => println!("{}: open", radio),
        RadioEvent::Closed(radio) => println!("{}: closed", radio),
        RadioEvent::Status {
            radio,
            frequency_hz,
            mode,
            ..
        } => println!(
            "{}: {} Hz {}",
            radio,
            frequency_hz.unwrap_or_default(),
            mode.short_name()
        ),
        RadioEvent::Error { radio, message } => println!("{} error: {}", radio, message),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "so2link=info,so2_protocol=info,so2_keyer=info,so2_rig=info".into()
            }),
        )
        .init();

    info!("Starting so2link");

    let path = match std::env::args().nth(1) {
        Some(arg) => PathBuf::from(arg),
        None => Settings::settings_path().context("Could not determine settings path")?,
    };
    let settings = Settings::load_or_create(&path)?;
    info!("Settings from {}", path.display());

    let (keyer_tx, mut keyer_rx) = mpsc::channel(64);
    let (radio_tx, mut radio_rx) = mpsc::channel(64);

    let connector = SerialConnector::new(settings.keyer.device.clone());
    let mut station = Station {
        keyer: KeyerLink::new(connector, settings.keyer, keyer_tx),
        radios: Arc::new(RadioLink::with_default_factory(settings.radios, radio_tx)),
        catalog: ModelCatalog::from_registry(&BuiltinModels),
    };

    station.open().await;
    let drain = station.radios.spawn_drain();
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let keep_going = match line.parse::<ConsoleCommand>() {
                    Ok(cmd) => station.execute(cmd).await.unwrap_or_else(|e| {
                        println!("error: {}", e);
                        true
                    }),
                    Err(e) => {
                        println!("error: {}", e);
                        true
                    }
                };
                if !keep_going {
                    break;
                }
            }
            Some(event) = keyer_rx.recv() => print_keyer_event(&event),
            Some(event) = radio_rx.recv() => print_radio_event(&event),
        }
    }

    drain.stop().await;
    station.close().await;
    info!("so2link stopped");
    Ok(())
}
