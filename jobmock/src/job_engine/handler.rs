// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::ops::Deref;
use std::sync::Arc;

use serde::Serialize;

use crate::codec::ArgumentList;
use crate::error::DispatchError;
use crate::job_engine::dispatcher::Dispatcher;

/// Something that can be enqueued and performed.
pub trait Handler: Send + Sync + 'static {
    /// Free-form name, used for logging and error messages
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// The queue this handler belongs to. Handlers without one cannot be enqueued.
    fn queue_name(&self) -> Option<&str>;

    /// Runs the job with arguments that went through the codec.
    fn perform(&self, ctx: &JobContext<'_>, args: ArgumentList) -> anyhow::Result<()>;
}

impl std::fmt::Debug for dyn Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.name())
            .field("queue", &self.queue_name())
            .finish()
    }
}

/// Shared reference to a handler.
#[derive(Clone, Debug)]
pub struct HandlerRef(Arc<dyn Handler>);

impl HandlerRef {
    pub fn new<H: Handler>(handler: H) -> Self {
        Self(Arc::new(handler))
    }

    /// Resolves the queue name, failing with [`DispatchError::NoQueue`] if there is none.
    pub fn require_queue(&self) -> Result<&str, DispatchError> {
        self.0.queue_name().ok_or_else(|| DispatchError::NoQueue {
            handler: self.0.name().to_string(),
        })
    }
}

impl<H: Handler> From<Arc<H>> for HandlerRef {
    fn from(handler: Arc<H>) -> Self {
        Self(handler)
    }
}

impl From<Arc<dyn Handler>> for HandlerRef {
    fn from(handler: Arc<dyn Handler>) -> Self {
        Self(handler)
    }
}

impl Deref for HandlerRef {
    type Target = dyn Handler;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

/// What a handler gets to see while it is performed.
#[derive(Debug)]
pub struct JobContext<'a> {
    dispatcher: &'a Dispatcher,
    handler: &'a HandlerRef,
    job_id: Option<u64>,
}

impl<'a> JobContext<'a> {
    pub(crate) fn new(
        dispatcher: &'a Dispatcher,
        handler: &'a HandlerRef,
        job_id: Option<u64>,
    ) -> Self {
        Self {
            dispatcher,
            handler,
            job_id,
        }
    }

    /// The dispatcher that runs this job. Jobs enqueued through it follow the current mode.
    pub fn dispatcher(&self) -> &'a Dispatcher {
        self.dispatcher
    }

    pub fn handler(&self) -> &'a HandlerRef {
        self.handler
    }

    /// Id of the queued job, `None` when performed synchronously.
    pub fn job_id(&self) -> Option<u64> {
        self.job_id
    }

    /// Enqueues the handler that is currently performed again.
    pub fn enqueue_self<A: Serialize>(&self, args: A) -> Result<(), DispatchError> {
        self.dispatcher.enqueue(self.handler, args)
    }
}
