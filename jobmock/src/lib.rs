// SPDX-License-Identifier: MIT
// jobmock: in-process job dispatcher for tests and harnesses
//
// - Runs enqueued jobs inline by default.
// - Inside an async scope, fans them out to background runners and waits for all of them.
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::time::Duration;

use serde::Serialize;

pub mod codec;
pub mod error;
pub mod global_config;
pub mod job_engine;
pub mod jobs;

pub use codec::{ArgumentList, Codec, JsonCodec};
pub use error::DispatchError;
pub use global_config::{DispatcherConfig, FailurePolicy};
pub use job_engine::closure_job::ClosureHandler;
pub use job_engine::handler::{Handler, HandlerRef, JobContext};
pub use job_engine::{global_dispatcher, Dispatcher};

/// Enqueues on the process-wide dispatcher.
pub fn enqueue<A: Serialize>(handler: &HandlerRef, args: A) -> Result<(), DispatchError> {
    global_dispatcher().enqueue(handler, args)
}

/// Enqueues with a delay on the process-wide dispatcher.
pub fn enqueue_in<A: Serialize>(
    delay: Duration,
    handler: &HandlerRef,
    args: A,
) -> Result<(), DispatchError> {
    global_dispatcher().enqueue_in(delay, handler, args)
}

pub fn async_scope<T, E, F>(work: F) -> Result<T, E>
where
    F: FnOnce(&Dispatcher) -> Result<T, E>,
    E: From<DispatchError>,
{
    global_dispatcher().async_scope(work)
}

pub fn is_async() -> bool {
    global_dispatcher().is_async()
}

pub fn set_discard(discard: bool) {
    global_dispatcher().set_discard(discard)
}

pub fn discard<T>(work: impl FnOnce(&Dispatcher) -> T) -> T {
    global_dispatcher().discard(work)
}
