//! Integration tests for periodic sampling and the full application
//! context: timer thread → deferred work → stack thread.

use std::time::Duration;

use appcore::adapters::attribute_store::MemoryAttributeStore;
use appcore::adapters::commissioning::SimCommissioning;
use appcore::adapters::stack::StackRunLoop;
use appcore::app::ports::{Attribute, AttributeStore, AttributeValue, EndpointId};
use appcore::app::room_sensor::RoomSensorApp;
use appcore::config::{AppConfig, EndpointMap};
use appcore::context::AppContext;
use appcore::drivers::led::{SimPin, StatusLed};
use appcore::error::AttributeStatus;
use appcore::sensors::sampler::{PeriodicSampler, SamplerState};

use crate::mock_hw::{MockReadings, MockSensorBus, wait_until};

const PERIOD: Duration = Duration::from_millis(20);
const WAIT: Duration = Duration::from_secs(2);

fn stack() -> StackRunLoop {
    StackRunLoop::spawn(MemoryAttributeStore::with_endpoints(&EndpointMap::default())).unwrap()
}

fn read(stack: &StackRunLoop, endpoint: EndpointId, attribute: Attribute) -> Result<AttributeValue, AttributeStatus> {
    stack.with_store(move |s| s.get(endpoint, attribute)).unwrap()
}

#[test]
fn sampler_publishes_converted_measurements() {
    let stack = stack();
    let ep = EndpointMap::default();
    let mut sampler = PeriodicSampler::new(stack.channel(), ep);
    let bus = MockSensorBus::new(MockReadings::default());

    sampler.start(PERIOD, bus.clone()).unwrap();
    assert_eq!(sampler.state(), SamplerState::Running);
    assert!(wait_until(WAIT, || {
        read(&stack, ep.pressure, Attribute::PressureMeasuredValue) == Ok(AttributeValue::I16(1013))
    }));
    sampler.cancel();

    assert_eq!(
        read(&stack, ep.temperature, Attribute::TemperatureMeasuredValue),
        Ok(AttributeValue::I16(2100))
    );
    assert_eq!(
        read(&stack, ep.humidity, Attribute::HumidityMeasuredValue),
        Ok(AttributeValue::U16(4000))
    );
    assert_eq!(
        read(&stack, ep.illuminance, Attribute::IlluminanceMeasuredValue),
        Ok(AttributeValue::U16(30_001))
    );
}

#[test]
fn failed_reads_publish_zero_and_sampling_continues() {
    let stack = stack();
    let ep = EndpointMap::default();
    let mut sampler = PeriodicSampler::new(stack.channel(), ep);
    let bus = MockSensorBus::new(MockReadings {
        fail_rht: true,
        fail_lux: true,
        ..MockReadings::default()
    });

    sampler.start(PERIOD, bus.clone()).unwrap();
    assert!(wait_until(WAIT, || bus.captures() >= 2));
    sampler.cancel();

    assert_eq!(
        read(&stack, ep.humidity, Attribute::HumidityMeasuredValue),
        Ok(AttributeValue::U16(0))
    );
    // Only the pressure die reading contributes to the average.
    assert_eq!(
        read(&stack, ep.temperature, Attribute::TemperatureMeasuredValue),
        Ok(AttributeValue::I16(1050))
    );
    assert_eq!(
        read(&stack, ep.illuminance, Attribute::IlluminanceMeasuredValue),
        Ok(AttributeValue::U16(0))
    );
}

#[test]
fn cancel_is_idempotent_and_stops_captures() {
    let stack = stack();
    let mut sampler = PeriodicSampler::new(stack.channel(), EndpointMap::default());
    let bus = MockSensorBus::new(MockReadings::default());

    sampler.cancel();
    assert_eq!(sampler.state(), SamplerState::Stopped);

    sampler.start(PERIOD, bus.clone()).unwrap();
    assert!(wait_until(WAIT, || bus.captures() >= 1));
    sampler.cancel();
    sampler.cancel();
    assert_eq!(sampler.state(), SamplerState::Stopped);

    let seen = bus.captures();
    std::thread::sleep(PERIOD * 4);
    assert_eq!(bus.captures(), seen);
}

#[test]
fn readings_change_between_samples() {
    let stack = stack();
    let ep = EndpointMap::default();
    let mut sampler = PeriodicSampler::new(stack.channel(), ep);
    let bus = MockSensorBus::new(MockReadings::default());
    sampler.start(PERIOD, bus.clone()).unwrap();

    bus.set(MockReadings {
        lux: 10.0,
        ..MockReadings::default()
    });
    assert!(wait_until(WAIT, || {
        read(&stack, ep.illuminance, Attribute::IlluminanceMeasuredValue)
            == Ok(AttributeValue::U16(10_001))
    }));
}

// ── Whole context ────────────────────────────────────────────

#[test]
fn context_runs_room_sensor_and_returns_store() {
    let config = AppConfig {
        sample_period_ms: 20,
        ..AppConfig::default()
    };
    let ep = config.endpoints;
    let ctx = AppContext::init(config, MemoryAttributeStore::with_endpoints(&ep)).unwrap();

    let sampler = PeriodicSampler::new(ctx.channel(), ep);
    let base = ctx.device_base(StatusLed::new(SimPin::new()), SimCommissioning::new());
    let mut app = RoomSensorApp::new(base, sampler);
    app.start_sampling(PERIOD, MockSensorBus::new(MockReadings::default()))
        .unwrap();
    let task = ctx.spawn_dispatcher(app).unwrap();

    let producer = ctx.producer();
    assert!(producer.device_operational());
    assert!(wait_until(WAIT, || {
        ctx.stack()
            .with_store(move |s| s.get(ep.humidity, Attribute::HumidityMeasuredValue))
            == Some(Ok(AttributeValue::U16(4000)))
    }));

    let mut app = task.stop().unwrap();
    assert!(app.base().commissioning().ota_ready());
    app.stop_sampling();
    assert_eq!(app.sampler_state(), SamplerState::Stopped);

    let store = ctx.shutdown().unwrap();
    assert_eq!(
        store.get(ep.pressure, Attribute::PressureMeasuredValue),
        Ok(AttributeValue::I16(1013))
    );
    assert!(store.write_count() >= 4);
}
