//! Actuator action state machines.
//!
//! ## Pump-style actuators
//!
//! ```text
//!            request(Start)              complete(Start)
//!  Stopped ───────────────▶ InitiatingStart ───────────────▶ Started
//!     ▲                                                        │
//!     │      complete(Stop)              request(Stop)         │
//!     └─────────────────── InitiatingStop ◀────────────────────┘
//! ```
//!
//! A request is accepted only from a settled state and is bracketed by
//! [`ActionListener::on_initiated`] (synchronous, dispatcher thread) and
//! [`ActionListener::on_completed`] (whenever the driver finishes, on
//! whatever thread it finishes on).  A completion that does not match a
//! pending initiation is logged and ignored.
//!
//! ## Alarm-style actuators
//!
//! [`LeakAlarm`] has no physical latency: trigger/untrigger set state and
//! schedule the attribute update at once.

use core::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use log::{info, warn};

use crate::app::ports::{ALARM_VISUAL, Attribute, AttributeStore, AttributeValue, EndpointId};
use crate::deferred::DeferredWorkChannel;
use crate::error::{ActionError, ScheduleError};
use crate::events::{AppEventQueue, AppHandler, Event};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Start,
    Stop,
}

impl Action {
    /// The action that undoes this one.
    pub const fn inverse(self) -> Self {
        match self {
            Self::Start => Self::Stop,
            Self::Stop => Self::Start,
        }
    }
}

/// Who caused an action.
///
/// The actor, not the event that triggered it, decides whether the
/// outcome is published to the data model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    /// A local user button.
    Button,
    /// A remote controller writing through the stack.  The stack already
    /// updated the attribute, so nothing is published back.
    Remote,
    /// The appliance itself (timer, safety cut-off).
    Appliance,
}

impl Actor {
    /// Whether completing an action by this actor must publish state.
    pub const fn publishes_state(self) -> bool {
        matches!(self, Self::Button | Self::Appliance)
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorState {
    Stopped = 0,
    InitiatingStart = 1,
    Started = 2,
    InitiatingStop = 3,
}

impl ActuatorState {
    const fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::InitiatingStart,
            2 => Self::Started,
            3 => Self::InitiatingStop,
            _ => Self::Stopped,
        }
    }

    /// `true` when no action is in flight.
    pub const fn is_settled(self) -> bool {
        matches!(self, Self::Stopped | Self::Started)
    }

    const fn initiating(action: Action) -> Self {
        match action {
            Action::Start => Self::InitiatingStart,
            Action::Stop => Self::InitiatingStop,
        }
    }

    const fn settled(action: Action) -> Self {
        match action {
            Action::Start => Self::Started,
            Action::Stop => Self::Stopped,
        }
    }
}

/// Brackets every accepted action.
pub trait ActionListener: Send + Sync {
    /// Called synchronously from `request_action`, on the dispatcher thread.
    fn on_initiated(&self, action: Action, actor: Actor);

    /// Called once the driver reports the action finished.  May run on any
    /// thread, so implementations must not touch attribute storage here.
    fn on_completed(&self, action: Action, actor: Actor);
}

/// The physical actuator.  Must eventually call
/// [`CompletionToken::complete`] for each token it receives.
pub trait ActuatorDriver {
    fn actuate(&mut self, action: Action, done: CompletionToken);
}

struct Shared {
    name: &'static str,
    state: AtomicU8,
    listener: Arc<dyn ActionListener>,
}

impl Shared {
    fn state(&self) -> ActuatorState {
        ActuatorState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn complete(&self, action: Action, actor: Actor) -> Result<(), ActionError> {
        let from = ActuatorState::initiating(action);
        let to = ActuatorState::settled(action);
        if let Err(actual) =
            self.state
                .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
        {
            warn!(
                "{}: completion of {:?} without pending initiation (state {:?}), ignored",
                self.name,
                action,
                ActuatorState::from_u8(actual)
            );
            return Err(ActionError::NoPendingInitiation);
        }
        info!("{}: {:?} completed by {:?}", self.name, action, actor);
        self.listener.on_completed(action, actor);
        Ok(())
    }
}

/// Per-actuator state machine.  Requests come from the dispatcher;
/// completions may arrive from any thread.
pub struct ActionStateMachine {
    shared: Arc<Shared>,
}

impl ActionStateMachine {
    pub fn new(name: &'static str, listener: Arc<dyn ActionListener>) -> Self {
        Self {
            shared: Arc::new(Shared {
                name,
                state: AtomicU8::new(ActuatorState::Stopped as u8),
                listener,
            }),
        }
    }

    pub fn state(&self) -> ActuatorState {
        self.shared.state()
    }

    /// Begin `action`.  Rejected with [`ActionError::Busy`] while another
    /// action is in flight; no second action is queued.
    pub fn request_action(
        &self,
        action: Action,
        actor: Actor,
        driver: &mut dyn ActuatorDriver,
    ) -> Result<(), ActionError> {
        let from = ActuatorState::settled(action.inverse());
        let to = ActuatorState::initiating(action);
        if let Err(actual) =
            self.shared
                .state
                .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
        {
            let actual = ActuatorState::from_u8(actual);
            return Err(if actual == ActuatorState::settled(action) {
                ActionError::AlreadyInState
            } else {
                ActionError::Busy
            });
        }

        info!("{}: {:?} initiated by {:?}", self.shared.name, action, actor);
        self.shared.listener.on_initiated(action, actor);
        driver.actuate(
            action,
            CompletionToken {
                shared: self.shared.clone(),
                action,
                actor,
            },
        );
        Ok(())
    }

    /// Start if stopped, stop if started.  Returns the requested action.
    pub fn toggle(&self, actor: Actor, driver: &mut dyn ActuatorDriver) -> Result<Action, ActionError> {
        let action = match self.state() {
            ActuatorState::Stopped => Action::Start,
            ActuatorState::Started => Action::Stop,
            _ => return Err(ActionError::Busy),
        };
        self.request_action(action, actor, driver)?;
        Ok(action)
    }

    /// Raw completion entry point for drivers that report completion
    /// without a token (e.g. a vendor callback).
    pub fn on_completed(&self, action: Action, actor: Actor) -> Result<(), ActionError> {
        self.shared.complete(action, actor)
    }
}

/// Handed to the driver with each accepted action.
pub struct CompletionToken {
    shared: Arc<Shared>,
    action: Action,
    actor: Actor,
}

impl CompletionToken {
    pub fn action(&self) -> Action {
        self.action
    }

    pub fn actor(&self) -> Actor {
        self.actor
    }

    /// Report the physical actuation finished.
    pub fn complete(self) -> Result<(), ActionError> {
        self.shared.complete(self.action, self.actor)
    }
}

// ── Listener: publish on/off ──────────────────────────────────

/// Listener for on/off actuators.
///
/// On completion it posts [`AppHandler::ActionCompleted`] so the
/// dispatcher refreshes local indication, and, when the actor publishes
/// state, schedules the `OnOff` write on the stack thread.
pub struct OnOffPublisher {
    queue: Arc<AppEventQueue>,
    channel: DeferredWorkChannel,
    endpoint: EndpointId,
}

impl OnOffPublisher {
    pub fn new(queue: Arc<AppEventQueue>, channel: DeferredWorkChannel, endpoint: EndpointId) -> Self {
        Self {
            queue,
            channel,
            endpoint,
        }
    }
}

impl ActionListener for OnOffPublisher {
    fn on_initiated(&self, _action: Action, _actor: Actor) {}

    fn on_completed(&self, action: Action, actor: Actor) {
        self.queue.post(Event::callback(AppHandler::ActionCompleted(action)));
        if actor.publishes_state() {
            let _ = self.channel.schedule(
                publish_on_off,
                (self.endpoint, action == Action::Start),
            );
        }
    }
}

fn publish_on_off(store: &mut dyn AttributeStore, (endpoint, on): (EndpointId, bool)) {
    if let Err(status) = store.set(endpoint, Attribute::OnOff, AttributeValue::Bool(on)) {
        warn!("publish OnOff ep{}: {}", endpoint, status);
    }
}

// ── Leak alarm ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmState {
    Idle,
    Triggered,
}

/// Boolean-state alarm.  Dispatcher thread only.
pub struct LeakAlarm {
    state: AlarmState,
    endpoint: EndpointId,
    channel: DeferredWorkChannel,
    queue: Arc<AppEventQueue>,
}

impl LeakAlarm {
    pub fn new(endpoint: EndpointId, channel: DeferredWorkChannel, queue: Arc<AppEventQueue>) -> Self {
        Self {
            state: AlarmState::Idle,
            endpoint,
            channel,
            queue,
        }
    }

    pub fn state(&self) -> AlarmState {
        self.state
    }

    /// Enter `Triggered` and publish it.
    pub fn trigger(&mut self) -> Result<(), ScheduleError> {
        self.set(AlarmState::Triggered)
    }

    /// Return to `Idle` and publish it.
    pub fn untrigger(&mut self) -> Result<(), ScheduleError> {
        self.set(AlarmState::Idle)
    }

    pub fn toggle(&mut self) -> Result<AlarmState, ScheduleError> {
        let next = match self.state {
            AlarmState::Idle => AlarmState::Triggered,
            AlarmState::Triggered => AlarmState::Idle,
        };
        self.set(next)?;
        Ok(next)
    }

    /// Local state only moves once the publish is queued.
    fn set(&mut self, state: AlarmState) -> Result<(), ScheduleError> {
        let queue = self.queue.clone();
        self.channel.schedule(
            move |store, (endpoint, triggered): (EndpointId, bool)| {
                let visual = publish_alarm(store, endpoint, triggered);
                queue.post(Event::callback(AppHandler::AlarmIndicator { on: visual }));
            },
            (self.endpoint, state == AlarmState::Triggered),
        )?;
        self.state = state;
        info!("leak: {:?}", state);
        Ok(())
    }
}

/// Write the boolean state and alarm attributes.  Returns whether the
/// visual alarm is now active.
fn publish_alarm(store: &mut dyn AttributeStore, endpoint: EndpointId, triggered: bool) -> bool {
    if let Err(status) = store.set(
        endpoint,
        Attribute::BooleanStateValue,
        AttributeValue::Bool(triggered),
    ) {
        warn!("publish BooleanState ep{}: {}", endpoint, status);
    }

    let active = if triggered {
        match store.get(endpoint, Attribute::AlarmsEnabled) {
            Ok(v) => v.as_u8().unwrap_or(0),
            Err(status) => {
                warn!("read AlarmsEnabled ep{}: {}", endpoint, status);
                0
            }
        }
    } else {
        0
    };
    if let Err(status) = store.set(endpoint, Attribute::AlarmsActive, AttributeValue::U8(active)) {
        warn!("publish AlarmsActive ep{}: {}", endpoint, status);
    }
    active & ALARM_VISUAL != 0
}
