// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use log::error;

use crate::error::DispatchError;
use crate::job_engine::dispatcher::Dispatcher;
use crate::job_engine::worker_manager::ManagerHandle;

/// Keeps a worker manager attached to a dispatcher. Dropping it without
/// [`AsyncScope::finish`] (e.g. while unwinding) still drains and detaches.
struct AsyncScope<'a> {
    dispatcher: &'a Dispatcher,
    manager: Option<ManagerHandle>,
}

impl<'a> AsyncScope<'a> {
    fn enter(dispatcher: &'a Dispatcher) -> Result<Self, DispatchError> {
        let manager = dispatcher.attach_manager()?;
        Ok(Self {
            dispatcher,
            manager: Some(manager),
        })
    }

    fn finish(mut self) -> Result<(), DispatchError> {
        self.teardown()
    }

    fn teardown(&mut self) -> Result<(), DispatchError> {
        let Some(manager) = self.manager.take() else {
            return Ok(());
        };
        let drained = manager.shutdown();
        self.dispatcher.detach_manager();
        drained
    }
}

impl Drop for AsyncScope<'_> {
    fn drop(&mut self) {
        if let Err(failure) = self.teardown() {
            error!("Job failure while leaving async scope abnormally: {failure}");
        }
    }
}

impl Dispatcher {
    /// Runs `work` with every enqueue deferred to background job runners, then waits
    /// until all of them (including jobs they enqueued) are done.
    ///
    /// The dispatcher is back in synchronous mode when this returns. An error from
    /// `work` is returned as is; otherwise the first failed job is returned.
    ///
    /// ```
    /// use jobmock::{ClosureHandler, Dispatcher, DispatchError, HandlerRef};
    ///
    /// let dispatcher = Dispatcher::default();
    /// let job = HandlerRef::new(ClosureHandler::new("default", |_ctx, _args| Ok(())));
    /// dispatcher
    ///     .async_scope(|d| {
    ///         d.enqueue(&job, ("hello", "there"))?;
    ///         Ok::<_, DispatchError>(())
    ///     })
    ///     .unwrap();
    /// assert!(!dispatcher.is_async());
    /// ```
    pub fn async_scope<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&Dispatcher) -> Result<T, E>,
        E: From<DispatchError>,
    {
        let scope = AsyncScope::enter(self)?;
        let outcome = work(self);
        let drained = scope.finish();

        match (outcome, drained) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(failure)) => Err(failure.into()),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(failure)) => {
                error!("Job failed inside an async scope that failed itself: {failure}");
                Err(err)
            }
        }
    }
}
