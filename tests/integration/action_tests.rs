//! Integration tests for actuator actions, the leak alarm and the flow
//! sensor: everything that publishes through the stack thread.

use std::sync::Arc;
use std::time::Duration;

use appcore::actions::{
    Action, ActionStateMachine, ActuatorState, Actor, AlarmState, LeakAlarm, OnOffPublisher,
};
use appcore::adapters::attribute_store::MemoryAttributeStore;
use appcore::adapters::stack::StackRunLoop;
use appcore::app::base::DeviceBase;
use appcore::app::flow_sensor::FlowSensorApp;
use appcore::app::leak_detector::LeakDetectorApp;
use appcore::app::ports::{ALARM_AUDIBLE, ALARM_VISUAL, Attribute, AttributeValue};
use appcore::app::pump::PumpApp;
use appcore::config::{AppConfig, EndpointMap};
use appcore::dispatcher::Dispatcher;
use appcore::drivers::led::{SimPin, StatusLed};
use appcore::drivers::pump::SimulatedPump;
use appcore::error::{ActionError, AttributeStatus};
use appcore::events::{AppEventQueue, AppHandler, ButtonEdge, ButtonPayload, Event};

use crate::mock_hw::{ListenerCall, ManualActuator, MockCommissioning, RecordingListener, wait_until};

const EP: u16 = 1;
const WAIT: Duration = Duration::from_secs(2);

fn stack() -> StackRunLoop {
    StackRunLoop::spawn(MemoryAttributeStore::with_endpoints(&EndpointMap::default())).unwrap()
}

fn read(stack: &StackRunLoop, attribute: Attribute) -> Result<AttributeValue, AttributeStatus> {
    stack.with_store(move |s| s.get(EP, attribute)).unwrap()
}

fn base(queue: &Arc<AppEventQueue>) -> DeviceBase<SimPin, MockCommissioning> {
    DeviceBase::new(
        StatusLed::new(SimPin::new()),
        MockCommissioning::new(),
        queue.clone(),
        &AppConfig::default(),
    )
}

fn click() -> ButtonPayload {
    ButtonPayload::new(ButtonEdge::Clicked)
}

// ── Action state machine ─────────────────────────────────────

#[test]
fn toggle_publishes_on_off_only_after_completion() {
    let stack = stack();
    let queue = Arc::new(AppEventQueue::new());
    let publisher = OnOffPublisher::new(queue.clone(), stack.channel(), EP);
    let machine = ActionStateMachine::new("pump", Arc::new(publisher));
    let mut actuator = ManualActuator::new();

    assert_eq!(machine.toggle(Actor::Button, &mut actuator), Ok(Action::Start));
    assert_eq!(machine.state(), ActuatorState::InitiatingStart);
    assert_eq!(read(&stack, Attribute::OnOff), Ok(AttributeValue::Bool(false)));
    assert!(queue.is_empty());

    assert_eq!(actuator.finish_next(), Some(Action::Start));
    assert_eq!(machine.state(), ActuatorState::Started);
    assert_eq!(read(&stack, Attribute::OnOff), Ok(AttributeValue::Bool(true)));
    assert_eq!(
        queue.try_pop(),
        Some(Event::callback(AppHandler::ActionCompleted(Action::Start)))
    );
}

#[test]
fn completion_without_initiation_changes_nothing() {
    let stack = stack();
    let queue = Arc::new(AppEventQueue::new());
    let publisher = OnOffPublisher::new(queue.clone(), stack.channel(), EP);
    let machine = ActionStateMachine::new("pump", Arc::new(publisher));

    assert_eq!(
        machine.on_completed(Action::Start, Actor::Remote),
        Err(ActionError::NoPendingInitiation)
    );
    assert_eq!(machine.state(), ActuatorState::Stopped);
    assert!(queue.is_empty());

    let store = stack.shutdown().unwrap();
    assert_eq!(store.write_count(), 0);
}

#[test]
fn request_while_initiating_is_rejected_not_queued() {
    let listener = Arc::new(RecordingListener::default());
    let machine = ActionStateMachine::new("valve", listener.clone());
    let mut actuator = ManualActuator::new();

    machine.request_action(Action::Start, Actor::Button, &mut actuator).unwrap();
    assert_eq!(
        machine.request_action(Action::Stop, Actor::Remote, &mut actuator),
        Err(ActionError::Busy)
    );
    assert_eq!(machine.toggle(Actor::Button, &mut actuator), Err(ActionError::Busy));
    assert_eq!(actuator.pending.len(), 1);

    actuator.finish_next();
    assert_eq!(
        machine.request_action(Action::Start, Actor::Remote, &mut actuator),
        Err(ActionError::AlreadyInState)
    );
    assert_eq!(
        listener.calls(),
        vec![
            ListenerCall::Initiated(Action::Start, Actor::Button),
            ListenerCall::Completed(Action::Start, Actor::Button),
        ]
    );
}

#[test]
fn remote_actor_completion_does_not_republish() {
    let stack = stack();
    let queue = Arc::new(AppEventQueue::new());
    let publisher = OnOffPublisher::new(queue.clone(), stack.channel(), EP);
    let machine = ActionStateMachine::new("pump", Arc::new(publisher));
    let mut actuator = ManualActuator::new();

    machine.request_action(Action::Start, Actor::Remote, &mut actuator).unwrap();
    actuator.finish_next();
    assert_eq!(machine.state(), ActuatorState::Started);
    assert_eq!(read(&stack, Attribute::OnOff), Ok(AttributeValue::Bool(false)));
    assert_eq!(queue.len(), 1, "local indication still refreshed");
}

// ── Pump app end to end ──────────────────────────────────────

#[test]
fn pump_click_runs_motor_and_publishes() {
    let stack = stack();
    let queue = Arc::new(AppEventQueue::new());
    let publisher = OnOffPublisher::new(queue.clone(), stack.channel(), EP);
    let app = PumpApp::new(
        base(&queue),
        StatusLed::new(SimPin::new()),
        ActionStateMachine::new("pump", Arc::new(publisher)),
        SimulatedPump::new(Duration::from_millis(20)),
    );
    let mut dispatcher = Dispatcher::new(queue.clone(), app);

    dispatcher.dispatch(Event::ButtonRight(click()));
    assert_eq!(dispatcher.handler().state(), ActuatorState::InitiatingStart);
    assert!(dispatcher.handler().pump_led().is_animating());

    // The completion is posted before the write is scheduled.
    assert!(wait_until(WAIT, || {
        read(&stack, Attribute::OnOff) == Ok(AttributeValue::Bool(true))
    }));
    dispatcher.drain();
    let app = dispatcher.handler();
    assert_eq!(app.state(), ActuatorState::Started);
    assert!(app.driver().is_running());
    assert!(app.pump_led().is_on());
    assert!(!app.pump_led().is_animating());
}

#[test]
fn pump_remote_command_leaves_on_off_to_the_stack() {
    let stack = stack();
    let queue = Arc::new(AppEventQueue::new());
    let publisher = OnOffPublisher::new(queue.clone(), stack.channel(), EP);
    let app = PumpApp::new(
        base(&queue),
        StatusLed::new(SimPin::new()),
        ActionStateMachine::new("pump", Arc::new(publisher)),
        SimulatedPump::new(Duration::from_millis(20)),
    );
    let mut dispatcher = Dispatcher::new(queue.clone(), app);

    dispatcher.dispatch(Event::callback(AppHandler::ActuatorCommand {
        action: Action::Start,
        actor: Actor::Remote,
    }));
    assert!(wait_until(WAIT, || !queue.is_empty()));
    dispatcher.drain();
    assert_eq!(dispatcher.handler().state(), ActuatorState::Started);
    assert!(dispatcher.handler().pump_led().is_on());
    assert_eq!(read(&stack, Attribute::OnOff), Ok(AttributeValue::Bool(false)));
}

// ── Leak alarm ───────────────────────────────────────────────

#[test]
fn leak_click_publishes_alarm_and_lights_indicator() {
    let stack = stack();
    let queue = Arc::new(AppEventQueue::new());
    let alarm = LeakAlarm::new(EP, stack.channel(), queue.clone());
    let app = LeakDetectorApp::new(base(&queue), StatusLed::new(SimPin::new()), alarm);
    let mut dispatcher = Dispatcher::new(queue.clone(), app);

    dispatcher.dispatch(Event::ButtonRight(click()));
    assert_eq!(dispatcher.handler().alarm_state(), AlarmState::Triggered);
    assert!(wait_until(WAIT, || !queue.is_empty()));
    dispatcher.drain();
    assert!(dispatcher.handler().alarm_led().is_on());
    assert_eq!(read(&stack, Attribute::BooleanStateValue), Ok(AttributeValue::Bool(true)));
    assert_eq!(
        read(&stack, Attribute::AlarmsActive),
        Ok(AttributeValue::U8(ALARM_VISUAL | ALARM_AUDIBLE))
    );

    dispatcher.dispatch(Event::ButtonRight(click()));
    assert_eq!(dispatcher.handler().alarm_state(), AlarmState::Idle);
    assert!(wait_until(WAIT, || !queue.is_empty()));
    dispatcher.drain();
    assert!(!dispatcher.handler().alarm_led().is_on());
    assert_eq!(read(&stack, Attribute::AlarmsActive), Ok(AttributeValue::U8(0)));
}

#[test]
fn leak_sensor_input_sets_and_clears_alarm() {
    let stack = stack();
    let queue = Arc::new(AppEventQueue::new());
    let alarm = LeakAlarm::new(EP, stack.channel(), queue.clone());
    let app = LeakDetectorApp::new(base(&queue), StatusLed::new(SimPin::new()), alarm);
    let mut dispatcher = Dispatcher::new(queue.clone(), app);

    dispatcher.handler_mut().set_leak(true);
    assert_eq!(dispatcher.handler().alarm_state(), AlarmState::Triggered);
    assert!(wait_until(WAIT, || !queue.is_empty()));
    dispatcher.drain();
    assert!(dispatcher.handler().alarm_led().is_on());
    assert_eq!(read(&stack, Attribute::BooleanStateValue), Ok(AttributeValue::Bool(true)));

    dispatcher.handler_mut().set_leak(false);
    assert_eq!(dispatcher.handler().alarm_state(), AlarmState::Idle);
    assert!(wait_until(WAIT, || !queue.is_empty()));
    dispatcher.drain();
    assert!(!dispatcher.handler().alarm_led().is_on());
    assert_eq!(read(&stack, Attribute::BooleanStateValue), Ok(AttributeValue::Bool(false)));
}

#[test]
fn leak_alarm_respects_enabled_modes() {
    let mut store = MemoryAttributeStore::with_endpoints(&EndpointMap::default());
    store.declare(EP, Attribute::AlarmsEnabled, AttributeValue::U8(ALARM_AUDIBLE));
    let stack = StackRunLoop::spawn(store).unwrap();
    let queue = Arc::new(AppEventQueue::new());
    let mut alarm = LeakAlarm::new(EP, stack.channel(), queue.clone());

    alarm.trigger().unwrap();
    assert!(wait_until(WAIT, || !queue.is_empty()));
    assert_eq!(
        queue.try_pop(),
        Some(Event::callback(AppHandler::AlarmIndicator { on: false }))
    );
    assert_eq!(read(&stack, Attribute::AlarmsActive), Ok(AttributeValue::U8(ALARM_AUDIBLE)));
}

// ── Flow sensor ──────────────────────────────────────────────

#[test]
fn flow_buttons_step_the_published_value() {
    let stack = stack();
    let queue = Arc::new(AppEventQueue::new());
    let app = FlowSensorApp::new(base(&queue), stack.channel(), EP, 100);
    let mut dispatcher = Dispatcher::new(queue.clone(), app);

    dispatcher.dispatch(Event::ButtonRight(click()));
    assert_eq!(read(&stack, Attribute::FlowMeasuredValue), Ok(AttributeValue::U16(0x7FFF)));

    dispatcher.dispatch(Event::ButtonRight(click()));
    dispatcher.dispatch(Event::ButtonRight(click()));
    dispatcher.dispatch(Event::ButtonLeft(click()));
    assert_eq!(
        read(&stack, Attribute::FlowMeasuredValue),
        Ok(AttributeValue::U16(0x7FFF + 100))
    );
}
