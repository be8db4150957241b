//! Process-wide application context.
//!
//! Built once at startup and passed to whatever needs it; nothing in the
//! crate reaches for a global.
//!
//! Startup order: validate config → event queue → stack run loop →
//! (caller builds drivers and the app) → dispatcher thread.  Teardown is
//! the reverse: dispatcher, then stack.  Any startup failure is fatal to
//! the caller; nothing runs half-initialised.

use std::sync::Arc;
use std::thread::JoinHandle;

use embedded_hal::digital::OutputPin;
use log::{info, warn};

use crate::adapters::attribute_store::MemoryAttributeStore;
use crate::adapters::stack::StackRunLoop;
use crate::app::base::DeviceBase;
use crate::app::ports::CommissioningPort;
use crate::config::AppConfig;
use crate::deferred::DeferredWorkChannel;
use crate::dispatcher::{Dispatcher, EventHandler, StopHandle};
use crate::drivers::button::{ButtonCallback, queue_callback};
use crate::drivers::led::StatusLed;
use crate::error::{Error, Result};
use crate::events::{AppEventQueue, Event};
use crate::identify::IdentifyCallbacks;

/// Push-side handle to the event queue for ISR, timer and stack
/// callbacks.  Cheap to clone.
#[derive(Clone)]
pub struct EventProducer {
    queue: Arc<AppEventQueue>,
}

impl EventProducer {
    /// ISR-safe push.  No logging.
    pub fn try_push(&self, event: Event) -> bool {
        self.queue.try_push(event)
    }

    /// Task-context push; logs a drop.
    pub fn post(&self, event: Event) -> bool {
        self.queue.post(event)
    }

    /// The stack finished bring-up.
    pub fn device_operational(&self) -> bool {
        self.queue.post(Event::DeviceOperational)
    }

    /// Button driver callback feeding this queue.
    pub fn button_callback(&self) -> ButtonCallback {
        queue_callback(self.queue.clone())
    }

    pub fn identify_callbacks(&self) -> IdentifyCallbacks {
        IdentifyCallbacks::new(self.queue.clone())
    }
}

/// A dispatcher running on its own thread.
pub struct DispatcherTask<H> {
    stop: StopHandle,
    handle: JoinHandle<H>,
}

impl<H> DispatcherTask<H> {
    /// Stop the loop and take the handler back.
    pub fn stop(self) -> Option<H> {
        self.stop.stop();
        match self.handle.join() {
            Ok(h) => Some(h),
            Err(_) => {
                warn!("dispatcher: thread panicked");
                None
            }
        }
    }
}

pub struct AppContext {
    config: AppConfig,
    queue: Arc<AppEventQueue>,
    stack: StackRunLoop,
}

impl AppContext {
    pub fn init(config: AppConfig, store: MemoryAttributeStore) -> Result<Self> {
        config.validate()?;
        let queue = Arc::new(AppEventQueue::new());
        let stack = StackRunLoop::spawn(store)?;
        info!(
            "context: queue capacity {}, sample period {} ms",
            queue.capacity(),
            config.sample_period_ms
        );
        Ok(Self {
            config,
            queue,
            stack,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn queue(&self) -> &Arc<AppEventQueue> {
        &self.queue
    }

    pub fn producer(&self) -> EventProducer {
        EventProducer {
            queue: self.queue.clone(),
        }
    }

    pub fn channel(&self) -> DeferredWorkChannel {
        self.stack.channel()
    }

    pub fn stack(&self) -> &StackRunLoop {
        &self.stack
    }

    /// The shared part of every device app, wired to this context.
    pub fn device_base<P: OutputPin, C: CommissioningPort>(
        &self,
        status_led: StatusLed<P>,
        commissioning: C,
    ) -> DeviceBase<P, C> {
        DeviceBase::new(status_led, commissioning, self.queue.clone(), &self.config)
    }

    /// Start the dispatcher for `handler` on a thread named "app".
    pub fn spawn_dispatcher<H>(&self, handler: H) -> Result<DispatcherTask<H>>
    where
        H: EventHandler + Send + 'static,
    {
        let mut dispatcher = Dispatcher::new(self.queue.clone(), handler);
        let stop = dispatcher.stop_handle();
        let handle = std::thread::Builder::new()
            .name("app".into())
            .spawn(move || {
                dispatcher.run();
                dispatcher.into_handler()
            })
            .map_err(|_| Error::Init("dispatcher thread"))?;
        Ok(DispatcherTask { stop, handle })
    }

    /// Stop the stack and hand back its attribute store.  Stop the
    /// dispatcher first.
    pub fn shutdown(self) -> Option<MemoryAttributeStore> {
        let dropped = self.queue.dropped();
        if dropped > 0 {
            warn!("context: {} event(s) dropped during run", dropped);
        }
        info!("context: shutting down");
        self.stack.shutdown()
    }
}
