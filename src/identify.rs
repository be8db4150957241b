//! Identify support.
//!
//! The stack calls [`IdentifyCallbacks`] from its own thread; each call is
//! translated into one queued event and nothing else.  The dispatcher side
//! ([`IdentifyEffectRunner`]) times the triggered effect and reports its
//! end back through the queue as [`AppHandler::IdentifyEffectDone`].

use core::time::Duration;
use std::sync::Arc;

use log::{info, warn};

use crate::drivers::timer::OneShotTimer;
use crate::error::Result;
use crate::events::{AppEventQueue, AppHandler, Event};

/// How long a Blink/Breathe/Okay effect runs.
pub const EFFECT_DURATION: Duration = Duration::from_secs(5);
/// Remaining time granted by FinishEffect.
pub const FINISH_DURATION: Duration = Duration::from_secs(1);

/// Identify effect identifiers, with their wire values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifyEffect {
    Blink,
    Breathe,
    Okay,
    ChannelChange,
    FinishEffect,
    StopEffect,
}

impl IdentifyEffect {
    pub const fn from_id(id: u8) -> Option<Self> {
        match id {
            0x00 => Some(Self::Blink),
            0x01 => Some(Self::Breathe),
            0x02 => Some(Self::Okay),
            0x0B => Some(Self::ChannelChange),
            0xFE => Some(Self::FinishEffect),
            0xFF => Some(Self::StopEffect),
            _ => None,
        }
    }

    pub const fn id(self) -> u8 {
        match self {
            Self::Blink => 0x00,
            Self::Breathe => 0x01,
            Self::Okay => 0x02,
            Self::ChannelChange => 0x0B,
            Self::FinishEffect => 0xFE,
            Self::StopEffect => 0xFF,
        }
    }

    /// LED toggle period while the effect runs.
    pub const fn blink_rate_ms(self) -> u32 {
        match self {
            Self::Breathe => 1000,
            Self::Okay => 100,
            _ => 500,
        }
    }
}

// ── Stack-side callbacks ──────────────────────────────────────

/// Entry points the protocol stack invokes.  Cheap to clone.
#[derive(Clone)]
pub struct IdentifyCallbacks {
    queue: Arc<AppEventQueue>,
}

impl IdentifyCallbacks {
    pub fn new(queue: Arc<AppEventQueue>) -> Self {
        Self { queue }
    }

    pub fn on_identify_start(&self) -> bool {
        info!("identify: start");
        self.queue.post(Event::IdentifyStart)
    }

    pub fn on_identify_stop(&self) -> bool {
        info!("identify: stop");
        self.queue.post(Event::IdentifyStop)
    }

    /// Returns `false` if the effect id is unknown or the queue is full.
    pub fn on_trigger_identify_effect(&self, effect_id: u8, variant: u8) -> bool {
        let Some(effect) = IdentifyEffect::from_id(effect_id) else {
            warn!("identify: unknown effect 0x{:02x}", effect_id);
            return false;
        };
        self.queue
            .post(Event::callback(AppHandler::IdentifyEffect { effect, variant }))
    }
}

// ── Dispatcher-side runner ────────────────────────────────────

/// What the owning app should do with its identify indication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectCommand {
    /// Start showing `effect`.
    Show(IdentifyEffect),
    /// Keep the current indication; its end was rescheduled.
    Keep,
    /// Stop showing any effect.
    Clear,
    /// Nothing to do.
    Ignore,
}

/// Times the active effect.  Dispatcher thread only.
pub struct IdentifyEffectRunner {
    timer: OneShotTimer,
    queue: Arc<AppEventQueue>,
    active: Option<IdentifyEffect>,
    generation: u32,
}

impl IdentifyEffectRunner {
    pub fn new(queue: Arc<AppEventQueue>) -> Self {
        Self {
            timer: OneShotTimer::new("identify"),
            queue,
            active: None,
            generation: 0,
        }
    }

    pub fn active(&self) -> Option<IdentifyEffect> {
        self.active
    }

    /// Apply a triggered effect.  ChannelChange is not supported; its
    /// variant is interpreted as the effect instead.
    pub fn apply(&mut self, effect: IdentifyEffect, variant: u8) -> Result<EffectCommand> {
        let effect = if effect == IdentifyEffect::ChannelChange {
            info!("identify: channel change unsupported, using variant {}", variant);
            match IdentifyEffect::from_id(variant) {
                Some(e) if e != IdentifyEffect::ChannelChange => e,
                _ => {
                    info!("identify: no effect");
                    return Ok(EffectCommand::Ignore);
                }
            }
        } else {
            effect
        };

        match effect {
            IdentifyEffect::Blink | IdentifyEffect::Breathe | IdentifyEffect::Okay => {
                self.arm(EFFECT_DURATION)?;
                self.active = Some(effect);
                Ok(EffectCommand::Show(effect))
            }
            IdentifyEffect::FinishEffect => {
                if self.active.is_none() {
                    return Ok(EffectCommand::Ignore);
                }
                self.arm(FINISH_DURATION)?;
                Ok(EffectCommand::Keep)
            }
            IdentifyEffect::StopEffect => {
                self.timer.cancel();
                self.generation = self.generation.wrapping_add(1);
                self.active = None;
                Ok(EffectCommand::Clear)
            }
            IdentifyEffect::ChannelChange => Ok(EffectCommand::Ignore),
        }
    }

    /// The effect timer expired.  Returns the effect that ended, or
    /// `None` if the expiry belongs to an earlier arming.
    pub fn on_done(&mut self, generation: u32) -> Option<IdentifyEffect> {
        if generation != self.generation {
            info!("identify: stale expiry {} (current {})", generation, self.generation);
            return None;
        }
        self.active.take()
    }

    fn arm(&mut self, after: Duration) -> Result<()> {
        self.generation = self.generation.wrapping_add(1);
        let generation = self.generation;
        let queue = self.queue.clone();
        self.timer.start(after, move || {
            queue.post(Event::callback(AppHandler::IdentifyEffectDone { generation }));
        })
    }
}
