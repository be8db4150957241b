//! AppCore device application library.
//!
//! The event-driven core shared by every device app: a bounded event
//! queue fed from interrupt, timer and stack context, a single dispatcher
//! that routes events to a device handler, and a deferred-work channel
//! that moves every attribute access onto the stack thread.
//!
//! ```text
//!   ISR / timers / stack callbacks
//!            │ try_push / post
//!            ▼
//!      ┌────────────┐   pop    ┌────────────┐  schedule  ┌─────────────┐
//!      │ EventQueue │ ───────▶ │ Dispatcher │ ─────────▶ │ stack thread│
//!      └────────────┘          │ + handler  │            │ (attributes)│
//!                              └────────────┘            └─────────────┘
//! ```
//!
//! ESP-IDF specifics are gated behind the `espidf` feature; everything
//! else builds and runs on the host.

#![deny(unused_must_use)]

pub mod actions;
pub mod adapters;
pub mod app;
pub mod config;
pub mod context;
pub mod deferred;
pub mod dispatcher;
pub mod drivers;
pub mod error;
pub mod events;
pub mod identify;
pub mod sensors;
