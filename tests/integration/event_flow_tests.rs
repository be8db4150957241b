//! Integration tests for the producer → queue → dispatcher → app path.

use std::sync::Arc;
use std::time::Duration;

use appcore::app::base::DeviceBase;
use appcore::app::room_sensor::RoomSensorApp;
use appcore::config::AppConfig;
use appcore::deferred::{DeferredWorkChannel, StackWorkQueue};
use appcore::dispatcher::{Dispatcher, EventHandler};
use appcore::drivers::button::{ButtonDriver, ButtonEvents, ButtonId, queue_callback};
use appcore::drivers::led::{SimPin, StatusLed};
use appcore::events::{AppEventQueue, AppHandler, ButtonEdge, ButtonPayload, CallbackPayload, Event};
use appcore::identify::{IdentifyCallbacks, IdentifyEffect};
use appcore::sensors::sampler::PeriodicSampler;

use crate::mock_hw::{CommissioningCall, MockCommissioning, wait_until};

#[derive(Default)]
struct Recorder {
    buttons: Vec<(ButtonId, ButtonEdge)>,
    callbacks: Vec<AppHandler>,
    operational: u32,
}

impl EventHandler for Recorder {
    fn on_button(&mut self, button: ButtonId, payload: ButtonPayload) {
        self.buttons.push((button, payload.edge));
    }

    fn on_device_operational(&mut self) {
        self.operational += 1;
    }

    fn on_callback(&mut self, payload: CallbackPayload) {
        self.callbacks.push(payload.handler);
    }
}

fn marker(i: u8) -> Event {
    Event::callback(AppHandler::IdentifyEffect {
        effect: IdentifyEffect::Blink,
        variant: i,
    })
}

fn room_app(queue: &Arc<AppEventQueue>) -> RoomSensorApp<SimPin, MockCommissioning> {
    let config = AppConfig::default();
    let base = DeviceBase::new(
        StatusLed::new(SimPin::new()),
        MockCommissioning::new(),
        queue.clone(),
        &config,
    );
    let channel = DeferredWorkChannel::new(Arc::new(StackWorkQueue::<16>::new()));
    RoomSensorApp::new(base, PeriodicSampler::new(channel, config.endpoints))
}

// ── Queue capacity under an interrupt burst ──────────────────

#[test]
fn burst_of_eleven_dispatches_ten_and_drops_one() {
    let queue = Arc::new(AppEventQueue::new());
    let accepted = (0..11u8).filter(|&i| queue.try_push(marker(i))).count();
    assert_eq!(accepted, 10);
    assert_eq!(queue.dropped(), 1);

    let mut dispatcher = Dispatcher::new(queue.clone(), Recorder::default());
    assert_eq!(dispatcher.drain(), 10);

    let variants: Vec<u8> = dispatcher
        .handler()
        .callbacks
        .iter()
        .map(|h| match h {
            AppHandler::IdentifyEffect { variant, .. } => *variant,
            other => panic!("unexpected handler {:?}", other),
        })
        .collect();
    assert_eq!(variants, (0..10).collect::<Vec<_>>(), "FIFO, newest dropped");
    assert!(queue.is_empty());
}

#[test]
fn queue_accepts_again_after_drain() {
    let queue = Arc::new(AppEventQueue::new());
    for i in 0..10 {
        assert!(queue.try_push(marker(i)));
    }
    assert!(!queue.try_push(marker(10)));
    assert_eq!(queue.try_pop(), Some(marker(0)));
    assert!(queue.try_push(marker(11)));
    assert_eq!(queue.len(), 10);
}

// ── Button driver to handler ─────────────────────────────────

#[test]
fn button_edges_reach_the_handler_classified() {
    let queue = Arc::new(AppEventQueue::new());
    let mut left = ButtonDriver::open(ButtonId::Left);
    left.set_callback(ButtonEvents::all(), 5_000, queue_callback(queue.clone()));
    let mut right = ButtonDriver::open(ButtonId::Right);
    right.set_callback(ButtonEvents::CLICKED, 5_000, queue_callback(queue.clone()));

    left.on_press(0);
    left.on_release(120);
    right.on_press(200);
    right.on_release(320);
    left.on_press(1_000);
    left.poll(6_000);
    left.on_release(6_500);
    // Long press not in the right button's mask.
    right.on_press(7_000);
    right.on_release(13_000);

    let mut dispatcher = Dispatcher::new(queue.clone(), Recorder::default());
    dispatcher.drain();
    assert_eq!(
        dispatcher.handler().buttons,
        vec![
            (ButtonId::Left, ButtonEdge::Clicked),
            (ButtonId::Right, ButtonEdge::Clicked),
            (ButtonId::Left, ButtonEdge::LongPressed),
        ]
    );
}

#[test]
fn bounce_shorter_than_debounce_is_ignored() {
    let queue = Arc::new(AppEventQueue::new());
    let mut btn = ButtonDriver::open(ButtonId::Generic);
    btn.set_callback(ButtonEvents::all(), 5_000, queue_callback(queue.clone()));
    btn.on_press(100);
    btn.on_release(110);
    assert!(queue.is_empty());
}

// ── Threaded dispatcher ──────────────────────────────────────

#[test]
fn dispatcher_thread_handles_events_until_stopped() {
    let queue = Arc::new(AppEventQueue::new());
    let mut dispatcher = Dispatcher::new(queue.clone(), Recorder::default());
    let stop = dispatcher.stop_handle();
    let handle = std::thread::spawn(move || {
        dispatcher.run();
        dispatcher.into_handler()
    });

    assert!(queue.post(Event::DeviceOperational));
    assert!(queue.post(Event::None));
    assert!(queue.post(Event::callback(AppHandler::ActionCompleted(
        appcore::actions::Action::Start
    ))));
    assert!(wait_until(Duration::from_secs(2), || queue.is_empty()));

    stop.stop();
    let handler = handle.join().unwrap();
    assert_eq!(handler.operational, 1);
    assert_eq!(
        handler.callbacks,
        vec![AppHandler::ActionCompleted(appcore::actions::Action::Start)]
    );
}

// ── Function button and identify through a device app ────────

#[test]
fn function_button_toggles_advertising_and_factory_resets() {
    let queue = Arc::new(AppEventQueue::new());
    let mut dispatcher = Dispatcher::new(queue.clone(), room_app(&queue));

    let click = ButtonPayload::new(ButtonEdge::Clicked);
    dispatcher.dispatch(Event::GenericButton(click));
    dispatcher.dispatch(Event::GenericButton(click));
    dispatcher.dispatch(Event::ButtonLeft(ButtonPayload::new(ButtonEdge::LongPressed)));
    dispatcher.dispatch(Event::DeviceOperational);

    let commissioning = dispatcher.handler().base().commissioning();
    assert_eq!(
        commissioning.calls,
        vec![
            CommissioningCall::OpenWindow,
            CommissioningCall::SetAdvertising(false),
            CommissioningCall::FactoryReset,
            CommissioningCall::OtaRequestor,
        ]
    );
}

#[test]
fn right_button_is_ignored_by_room_sensor() {
    let queue = Arc::new(AppEventQueue::new());
    let mut dispatcher = Dispatcher::new(queue.clone(), room_app(&queue));
    dispatcher.dispatch(Event::ButtonRight(ButtonPayload::new(ButtonEdge::Clicked)));
    assert!(dispatcher.handler().base().commissioning().calls.is_empty());
}

#[test]
fn identify_session_drives_status_led() {
    let queue = Arc::new(AppEventQueue::new());
    let identify = IdentifyCallbacks::new(queue.clone());
    let mut dispatcher = Dispatcher::new(queue.clone(), room_app(&queue));

    assert!(identify.on_identify_start());
    dispatcher.drain();
    assert!(dispatcher.handler().base().is_identifying());
    assert!(dispatcher.handler().base().status_led().is_animating());

    // Stop effect while identifying falls back to the identify blink.
    assert!(identify.on_trigger_identify_effect(IdentifyEffect::Okay.id(), 0));
    assert!(identify.on_trigger_identify_effect(IdentifyEffect::StopEffect.id(), 0));
    dispatcher.drain();
    assert!(dispatcher.handler().base().status_led().is_animating());

    assert!(identify.on_identify_stop());
    dispatcher.drain();
    assert!(!dispatcher.handler().base().is_identifying());
    assert!(!dispatcher.handler().base().status_led().is_animating());
    assert!(!dispatcher.handler().base().status_led().is_on());
}

#[test]
fn retriggered_effect_outlives_earlier_expiry() {
    let queue = Arc::new(AppEventQueue::new());
    let mut dispatcher = Dispatcher::new(queue.clone(), room_app(&queue));
    let blink = Event::callback(AppHandler::IdentifyEffect {
        effect: IdentifyEffect::Blink,
        variant: 0,
    });

    dispatcher.dispatch(blink);
    dispatcher.dispatch(blink);
    // Expiry of the first arming arriving after the second.
    dispatcher.dispatch(Event::callback(AppHandler::IdentifyEffectDone { generation: 1 }));
    assert!(dispatcher.handler().base().status_led().is_animating());

    dispatcher.dispatch(Event::callback(AppHandler::IdentifyEffectDone { generation: 2 }));
    assert!(!dispatcher.handler().base().status_led().is_animating());
}

#[test]
fn unknown_identify_effect_is_not_queued() {
    let queue = Arc::new(AppEventQueue::new());
    let identify = IdentifyCallbacks::new(queue.clone());
    assert!(!identify.on_trigger_identify_effect(0x42, 0));
    assert!(queue.is_empty());
}
