// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use async_channel::Sender;
use log::{debug, warn};
use serde::Serialize;
use serde_json::Value;

use crate::codec::{into_argument_list, ArgumentList, Codec, JsonCodec};
use crate::error::DispatchError;
use crate::global_config::DispatcherConfig;
use crate::job_engine::handler::{HandlerRef, JobContext};
use crate::job_engine::job::JobDescriptor;
use crate::job_engine::worker_manager::{self, ManagerHandle, ManagerMessage};

thread_local! {
    // number of performs currently on this thread's stack
    static PERFORM_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Logs a job transition at info level in verbose mode and at debug level otherwise.
macro_rules! transition {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            log::info!($($arg)+)
        } else {
            log::debug!($($arg)+)
        }
    };
}

/// Entry point for jobs. Runs them inline, or hands them to the worker manager of the
/// async scope that is currently attached.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

struct Inner {
    config: DispatcherConfig,
    codec: Box<dyn Codec>,
    discard: AtomicBool,
    // sender of the attached worker manager; `Some` means async mode
    manager: Mutex<Option<Sender<ManagerMessage>>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DispatcherConfig::default())
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("async", &self.is_async())
            .field("discard", &self.is_discarding())
            .field("config", &self.inner.config)
            .finish()
    }
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig) -> Self {
        Self::with_codec(config, JsonCodec)
    }

    pub fn with_codec(config: DispatcherConfig, codec: impl Codec) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                codec: Box::new(codec),
                discard: AtomicBool::new(false),
                manager: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.inner.config
    }

    /// True while an async scope is active on this dispatcher.
    pub fn is_async(&self) -> bool {
        self.manager_slot().is_some()
    }

    pub fn is_discarding(&self) -> bool {
        self.inner.discard.load(Ordering::SeqCst)
    }

    pub fn set_discard(&self, discard: bool) {
        self.inner.discard.store(discard, Ordering::SeqCst);
    }

    /// Runs `work` with discarding enabled and disables it again afterwards,
    /// also when `work` panics.
    pub fn discard<T>(&self, work: impl FnOnce(&Dispatcher) -> T) -> T {
        struct DiscardReset<'a>(&'a Dispatcher);

        impl Drop for DiscardReset<'_> {
            fn drop(&mut self) {
                self.0.set_discard(false);
            }
        }

        self.set_discard(true);
        let _reset = DiscardReset(self);
        work(self)
    }

    pub fn enqueue<A: Serialize>(&self, handler: &HandlerRef, args: A) -> Result<(), DispatchError> {
        self.enqueue_with_delay(None, handler, args)
    }

    pub fn enqueue_in<A: Serialize>(
        &self,
        delay: Duration,
        handler: &HandlerRef,
        args: A,
    ) -> Result<(), DispatchError> {
        self.enqueue_with_delay(Some(delay), handler, args)
    }

    fn enqueue_with_delay<A: Serialize>(
        &self,
        delay: Option<Duration>,
        handler: &HandlerRef,
        args: A,
    ) -> Result<(), DispatchError> {
        let queue = handler.require_queue()?;

        if self.is_discarding() {
            debug!("Discarding job {} for queue {}", handler.name(), queue);
            return Ok(());
        }

        let args = into_argument_list(args)?;
        transition!(
            self.inner.config.verbose,
            "Mock enqueue{}: async={}, depth={}, {}, [{}]",
            delay.map(|d| format!(" in {d:?}")).unwrap_or_default(),
            self.is_async(),
            PERFORM_DEPTH.with(Cell::get),
            handler.name(),
            DisplayArgs(&args)
        );
        self.defer(handler, args, delay)
    }

    /// Queues the job into the attached worker manager, or performs it right away
    /// when no async scope is active. In the latter case a delay blocks the caller.
    pub fn defer(
        &self,
        handler: &HandlerRef,
        args: ArgumentList,
        delay: Option<Duration>,
    ) -> Result<(), DispatchError> {
        let manager = self.manager_slot().clone();
        let Some(manager) = manager else {
            return self.perform_inline(handler, args, delay);
        };

        let job = JobDescriptor::new(handler.clone(), args, delay);
        debug!("Deferring job {}", job.desc());
        match manager.send_blocking(ManagerMessage::Enqueue(job)) {
            Ok(()) => Ok(()),
            Err(err) => match err.into_inner() {
                // the manager has already drained and the scope is detaching it
                ManagerMessage::Enqueue(job) => {
                    warn!("Worker manager already stopped, performing {} inline", job.desc());
                    let (_, handler, args, delay) = job.into_parts();
                    self.perform_inline(&handler, args, delay)
                }
                _ => Ok(()),
            },
        }
    }

    fn perform_inline(
        &self,
        handler: &HandlerRef,
        args: ArgumentList,
        delay: Option<Duration>,
    ) -> Result<(), DispatchError> {
        if let Some(delay) = delay {
            thread::sleep(delay);
        }
        self.perform_now(handler, args, None)
    }

    /// Roundtrips the arguments through the codec and calls `perform` on this thread.
    pub(crate) fn perform_now(
        &self,
        handler: &HandlerRef,
        args: ArgumentList,
        job_id: Option<u64>,
    ) -> Result<(), DispatchError> {
        let verbose = self.inner.config.verbose;
        transition!(verbose, "Mock perform: {}(*[{}])", handler.name(), DisplayArgs(&args));
        let args = self.inner.codec.roundtrip(&args)?;

        let _depth = DepthGuard::enter();
        let ctx = JobContext::new(self, handler, job_id);
        handler
            .perform(&ctx, args)
            .map_err(|source| DispatchError::Job {
                handler: handler.name().to_string(),
                source,
            })?;
        transition!(verbose, "Mock exit: {}", handler.name());
        Ok(())
    }

    /// Starts a worker manager and attaches it, which switches this dispatcher into async mode.
    pub(crate) fn attach_manager(&self) -> Result<ManagerHandle, DispatchError> {
        let mut slot = self.manager_slot();
        if slot.is_some() {
            return Err(DispatchError::ScopeActive);
        }
        let handle = worker_manager::start(self)?;
        *slot = Some(handle.sender());
        Ok(handle)
    }

    pub(crate) fn detach_manager(&self) {
        self.manager_slot().take();
    }

    fn manager_slot(&self) -> MutexGuard<'_, Option<Sender<ManagerMessage>>> {
        // the slot only ever holds a sender, so a poisoned lock still has valid contents
        self.inner
            .manager
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

struct DepthGuard;

impl DepthGuard {
    fn enter() -> Self {
        PERFORM_DEPTH.with(|depth| depth.set(depth.get() + 1));
        DepthGuard
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        PERFORM_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

struct DisplayArgs<'a>(&'a [Value]);

impl fmt::Display for DisplayArgs<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{arg}")?;
        }
        Ok(())
    }
}
