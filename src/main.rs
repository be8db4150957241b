//! AppCore host simulation.
//!
//! Runs one device app against simulated hardware: a scripted sequence of
//! button edges, identify requests and stack callbacks goes through the
//! real event queue, dispatcher and stack thread, and the published
//! attributes are reported at the end.
//!
//! ```text
//! appcore [pump|room|leak|flow] [config.json]
//! ```
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  SimButton ─┐                         ┌─ SimSensorBus        │
//! │  Identify  ─┼─▶ EventQueue ─▶ app ────┼─▶ DeferredWork       │
//! │  Stack cb  ─┘     (10)       thread   │     │                │
//! │                                       │     ▼                │
//! │                                       └─ stack thread        │
//! │                                          (attribute store)   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use core::fmt;
use core::str::FromStr;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use log::{error, info, warn};

use appcore::actions::{Action, ActionStateMachine, Actor, LeakAlarm, OnOffPublisher};
use appcore::adapters::attribute_store::MemoryAttributeStore;
use appcore::adapters::commissioning::SimCommissioning;
use appcore::adapters::sim_sensors::{SimReadings, SimSensorBus};
use appcore::adapters::time::MonotonicClock;
use appcore::app::base::DeviceBase;
use appcore::app::flow_sensor::FlowSensorApp;
use appcore::app::leak_detector::LeakDetectorApp;
use appcore::app::ports::{Attribute, AttributeStore, EndpointId};
use appcore::app::pump::PumpApp;
use appcore::app::room_sensor::RoomSensorApp;
use appcore::config::{AppConfig, EndpointMap};
use appcore::context::{AppContext, EventProducer};
use appcore::drivers::button::{ButtonDriver, ButtonEvents, ButtonId};
use appcore::drivers::led::{SimPin, StatusLed};
use appcore::drivers::pump::SimulatedPump;
use appcore::events::{AppHandler, Event};
use appcore::identify::IdentifyEffect;
use appcore::sensors::sampler::PeriodicSampler;

/// How long a simulated click holds the button down.
const CLICK_HOLD: Duration = Duration::from_millis(80);
/// Slack after each scripted step for the stack thread to catch up.
const SETTLE: Duration = Duration::from_millis(200);

// ── Device selection ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeviceKind {
    Pump,
    RoomSensor,
    LeakDetector,
    FlowSensor,
}

impl DeviceKind {
    /// Attributes worth reporting after a run.
    fn published(self, ep: &EndpointMap) -> Vec<(EndpointId, Attribute)> {
        match self {
            Self::Pump => vec![(ep.on_off, Attribute::OnOff)],
            Self::RoomSensor => vec![
                (ep.temperature, Attribute::TemperatureMeasuredValue),
                (ep.humidity, Attribute::HumidityMeasuredValue),
                (ep.illuminance, Attribute::IlluminanceMeasuredValue),
                (ep.pressure, Attribute::PressureMeasuredValue),
            ],
            Self::LeakDetector => vec![
                (ep.leak, Attribute::BooleanStateValue),
                (ep.leak, Attribute::AlarmsActive),
            ],
            Self::FlowSensor => vec![(ep.flow, Attribute::FlowMeasuredValue)],
        }
    }
}

impl FromStr for DeviceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pump" => Ok(Self::Pump),
            "room" => Ok(Self::RoomSensor),
            "leak" => Ok(Self::LeakDetector),
            "flow" => Ok(Self::FlowSensor),
            other => bail!("unknown device '{}' (expected pump, room, leak or flow)", other),
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pump => "pump",
            Self::RoomSensor => "room sensor",
            Self::LeakDetector => "leak detector",
            Self::FlowSensor => "flow sensor",
        };
        f.write_str(name)
    }
}

// ── Simulated button ──────────────────────────────────────────

/// Feeds press/release edges through the real button driver, the way the
/// GPIO interrupt would.
struct SimButton {
    driver: ButtonDriver,
    clock: MonotonicClock,
}

impl SimButton {
    fn new(id: ButtonId, producer: &EventProducer, long_press_ms: u32) -> Self {
        let mut driver = ButtonDriver::open(id);
        driver.set_callback(ButtonEvents::all(), long_press_ms, producer.button_callback());
        Self {
            driver,
            clock: MonotonicClock::new(),
        }
    }

    fn click(&mut self) {
        self.driver.on_press(self.clock.now_ms());
        thread::sleep(CLICK_HOLD);
        self.driver.on_release(self.clock.now_ms());
        thread::sleep(SETTLE);
    }
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. Bootstrap ──────────────────────────────────────────
    init_logging()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  AppCore v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let (device, config_path) = parse_args(std::env::args().skip(1))?;
    let config = match config_path {
        Some(path) => load_config(&path)?,
        None => AppConfig::default(),
    };
    let endpoints = config.endpoints;

    // ── 3. Context: event queue + stack run loop ──────────────
    let store = MemoryAttributeStore::with_endpoints(&endpoints);
    let ctx = AppContext::init(config, store).unwrap_or_else(|e| halt(&e));

    // ── 4. Device app ─────────────────────────────────────────
    info!("Simulating {}", device);
    let outcome = match device {
        DeviceKind::Pump => run_pump(&ctx),
        DeviceKind::RoomSensor => run_room_sensor(&ctx),
        DeviceKind::LeakDetector => run_leak_detector(&ctx),
        DeviceKind::FlowSensor => run_flow_sensor(&ctx),
    };
    if let Err(e) = &outcome {
        error!("{} run failed: {:#}", device, e);
    }

    // ── 5. Teardown + report ──────────────────────────────────
    match ctx.shutdown() {
        Some(store) => report(&store, &device.published(&endpoints)),
        None => warn!("attribute store lost at shutdown"),
    }
    outcome
}

#[cfg(feature = "espidf")]
fn init_logging() -> Result<()> {
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;
    Ok(())
}

#[cfg(not(feature = "espidf"))]
#[allow(clippy::unnecessary_wraps)]
fn init_logging() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    Ok(())
}

/// `<device> [config.json]`; the device defaults to the room sensor.
fn parse_args(mut args: impl Iterator<Item = String>) -> Result<(DeviceKind, Option<String>)> {
    let device = match args.next() {
        Some(arg) => arg.parse()?,
        None => DeviceKind::RoomSensor,
    };
    Ok((device, args.next()))
}

fn load_config(path: &str) -> Result<AppConfig> {
    let json = std::fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
    let config = AppConfig::from_json(&json).with_context(|| format!("parsing {}", path))?;
    info!("Config loaded from {}", path);
    Ok(config)
}

/// Initialisation failed: nothing runs half-initialised.
fn halt(err: &dyn fmt::Display) -> ! {
    error!("Init failed: {}, halting", err);
    loop {
        thread::park();
    }
}

fn device_base(ctx: &AppContext) -> DeviceBase<SimPin, SimCommissioning> {
    ctx.device_base(StatusLed::new(SimPin::new()), SimCommissioning::new())
}

fn ms(v: u32) -> Duration {
    Duration::from_millis(u64::from(v))
}

fn report(store: &MemoryAttributeStore, attributes: &[(EndpointId, Attribute)]) {
    for &(endpoint, attribute) in attributes {
        match store.get(endpoint, attribute) {
            Ok(value) => info!("  ep{} {:?} = {:?}", endpoint, attribute, value),
            Err(status) => warn!("  ep{} {:?}: {}", endpoint, attribute, status),
        }
    }
    info!("{} attribute write(s)", store.write_count());
}

// ── Device scripts ────────────────────────────────────────────

fn run_pump(ctx: &AppContext) -> Result<()> {
    let config = ctx.config();
    let actuation = ms(config.pump_actuation_ms);
    let publisher = OnOffPublisher::new(ctx.queue().clone(), ctx.channel(), config.endpoints.on_off);
    let machine = ActionStateMachine::new("pump", Arc::new(publisher));
    let app = PumpApp::new(
        device_base(ctx),
        StatusLed::new(SimPin::new()),
        machine,
        SimulatedPump::new(actuation),
    );
    let task = ctx.spawn_dispatcher(app).unwrap_or_else(|e| halt(&e));

    let producer = ctx.producer();
    producer.device_operational();
    let mut right = SimButton::new(ButtonId::Right, &producer, config.long_press_ms);

    // Local start, then a second click while still initiating.
    right.click();
    right.click();
    thread::sleep(actuation + SETTLE);

    // Remote stop: completes without touching the OnOff attribute.
    producer.post(Event::callback(AppHandler::ActuatorCommand {
        action: Action::Stop,
        actor: Actor::Remote,
    }));
    thread::sleep(actuation + SETTLE);

    right.click();
    thread::sleep(actuation + SETTLE);

    let app = task.stop().context("pump dispatcher")?;
    info!(
        "pump: motor running={}, state {:?}, LED on={}",
        app.driver().is_running(),
        app.state(),
        app.pump_led().is_on()
    );
    Ok(())
}

fn run_room_sensor(ctx: &AppContext) -> Result<()> {
    let config = ctx.config();
    let period = ms(config.sample_period_ms);
    let sampler = PeriodicSampler::new(ctx.channel(), config.endpoints);
    let mut app = RoomSensorApp::new(device_base(ctx), sampler);

    let (bus, sensors) = SimSensorBus::new(true);
    app.start_sampling(period, bus)?;
    let task = ctx.spawn_dispatcher(app).unwrap_or_else(|e| halt(&e));

    let producer = ctx.producer();
    producer.device_operational();
    let identify = producer.identify_callbacks();
    identify.on_identify_start();
    thread::sleep(SETTLE);
    identify.on_identify_stop();
    identify.on_trigger_identify_effect(IdentifyEffect::Blink.id(), 0);

    thread::sleep(period + SETTLE);
    sensors.set(SimReadings {
        lux: 1_000.0,
        humidity_milli: 52_500,
        ..SimReadings::default()
    });
    thread::sleep(period);

    let mut app = task.stop().context("room sensor dispatcher")?;
    app.stop_sampling();
    info!("room sensor: sampler {:?}", app.sampler_state());
    Ok(())
}

fn run_leak_detector(ctx: &AppContext) -> Result<()> {
    let config = ctx.config();
    let alarm = LeakAlarm::new(config.endpoints.leak, ctx.channel(), ctx.queue().clone());
    let app = LeakDetectorApp::new(device_base(ctx), StatusLed::new(SimPin::new()), alarm);
    let task = ctx.spawn_dispatcher(app).unwrap_or_else(|e| halt(&e));

    let producer = ctx.producer();
    producer.device_operational();
    let mut right = SimButton::new(ButtonId::Right, &producer, config.long_press_ms);
    right.click();
    right.click();
    right.click();

    let app = task.stop().context("leak detector dispatcher")?;
    info!(
        "leak detector: alarm {:?}, alarm LED on={}",
        app.alarm_state(),
        app.alarm_led().is_on()
    );
    Ok(())
}

fn run_flow_sensor(ctx: &AppContext) -> Result<()> {
    let config = ctx.config();
    let app = FlowSensorApp::new(device_base(ctx), ctx.channel(), config.endpoints.flow, config.flow_step);
    let task = ctx.spawn_dispatcher(app).unwrap_or_else(|e| halt(&e));

    let producer = ctx.producer();
    producer.device_operational();
    let mut left = SimButton::new(ButtonId::Left, &producer, config.long_press_ms);
    let mut right = SimButton::new(ButtonId::Right, &producer, config.long_press_ms);

    // First step initialises the null value to the midpoint.
    right.click();
    right.click();
    right.click();
    left.click();

    let app = task.stop().context("flow sensor dispatcher")?;
    info!(
        "flow sensor: {} commissioning window(s) opened",
        app.base().commissioning().windows_opened()
    );
    Ok(())
}
