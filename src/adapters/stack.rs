//! Host simulation of the protocol stack's run loop.
//!
//! On a device the stack owns a thread and a work queue of its own.  On
//! the host this adapter plays that role: one named thread owns the
//! [`MemoryAttributeStore`] and runs queued [`WorkItem`](crate::deferred::WorkItem)s
//! until shut down, then hands the store back for inspection.

use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;
use std::sync::{Arc, mpsc};
use std::thread::JoinHandle;

use log::{info, warn};

use crate::adapters::attribute_store::MemoryAttributeStore;
use crate::app::ports::AttributeStore;
use crate::deferred::{DeferredWorkChannel, STACK_WORK_QUEUE_SIZE, StackWorkQueue};
use crate::error::{Error, Result};

pub type StackQueue = StackWorkQueue<STACK_WORK_QUEUE_SIZE>;

/// Poll interval for the shutdown flag while the queue is idle.
const IDLE_POLL: Duration = Duration::from_millis(20);

/// The authoritative thread.
pub struct StackRunLoop {
    queue: Arc<StackQueue>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<MemoryAttributeStore>>,
}

impl StackRunLoop {
    /// Start the stack thread owning `store`.
    pub fn spawn(store: MemoryAttributeStore) -> Result<Self> {
        let queue = Arc::new(StackQueue::new());
        let stop = Arc::new(AtomicBool::new(false));

        let thread_queue = queue.clone();
        let thread_stop = stop.clone();
        let handle = std::thread::Builder::new()
            .name("stack".into())
            .spawn(move || {
                let mut store = store;
                while !thread_stop.load(Ordering::Acquire) {
                    thread_queue.run_next(&mut store, Some(IDLE_POLL));
                }
                let late = thread_queue.drain(&mut store);
                if late > 0 {
                    info!("stack: ran {} item(s) queued before shutdown", late);
                }
                store
            })
            .map_err(|_| Error::Init("stack thread"))?;

        queue.start();
        info!("stack: run loop started");
        Ok(Self {
            queue,
            stop,
            handle: Some(handle),
        })
    }

    /// A channel feeding this run loop.
    pub fn channel(&self) -> DeferredWorkChannel {
        DeferredWorkChannel::new(self.queue.clone())
    }

    pub fn queue(&self) -> &Arc<StackQueue> {
        &self.queue
    }

    /// Run `f` on the stack thread and wait for its result.
    ///
    /// Returns `None` if the work could not be scheduled.  Must not be
    /// called from the stack thread itself.
    pub fn with_store<R, F>(&self, f: F) -> Option<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut dyn AttributeStore) -> R + Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel(1);
        self.channel()
            .schedule(
                move |store, tx: mpsc::SyncSender<R>| {
                    let _ = tx.send(f(store));
                },
                tx,
            )
            .ok()?;
        rx.recv().ok()
    }

    /// Stop accepting work, run what is already queued, and return the store.
    pub fn shutdown(mut self) -> Option<MemoryAttributeStore> {
        self.stop_thread()
    }

    fn stop_thread(&mut self) -> Option<MemoryAttributeStore> {
        self.queue.stop();
        self.stop.store(true, Ordering::Release);
        let handle = self.handle.take()?;
        match handle.join() {
            Ok(store) => Some(store),
            Err(_) => {
                warn!("stack: run loop panicked");
                None
            }
        }
    }
}

impl Drop for StackRunLoop {
    fn drop(&mut self) {
        let _ = self.stop_thread();
    }
}
