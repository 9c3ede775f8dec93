// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use async_channel::Sender;
use log::debug;

use crate::error::{panic_message, DispatchError};
use crate::job_engine::dispatcher::Dispatcher;
use crate::job_engine::job::JobDescriptor;
use crate::job_engine::worker_manager::ManagerMessage;

/// Runs one job on its own thread and reports the outcome to the worker manager.
/// If the manager no longer accepts messages, a failure is returned from the thread
/// instead.
pub(crate) fn spawn(
    job: JobDescriptor,
    dispatcher: Dispatcher,
    notify: Sender<ManagerMessage>,
) -> Result<JoinHandle<Option<DispatchError>>, DispatchError> {
    let thread_handle = thread::Builder::new()
        .name(format!("jobmock-job-{}", job.id()))
        .spawn(move || {
            let id = job.id();
            let outcome = run(job, &dispatcher);
            match notify.send_blocking(ManagerMessage::RunnerFinished { id, outcome }) {
                Ok(()) => None,
                Err(err) => match err.into_inner() {
                    ManagerMessage::RunnerFinished { outcome, .. } => {
                        debug!("Worker manager stopped listening, job #{id} reports on join");
                        outcome.err()
                    }
                    _ => None,
                },
            }
        })?;
    Ok(thread_handle)
}

/// Delay, argument roundtrip, perform. Panics are turned into errors so they reach
/// the async scope instead of taking the process down.
pub(crate) fn run(job: JobDescriptor, dispatcher: &Dispatcher) -> Result<(), DispatchError> {
    let desc = job.desc();
    let (id, handler, args, delay) = job.into_parts();

    if let Some(delay) = delay {
        debug!("Job {desc} sleeping for {delay:?}");
        thread::sleep(delay);
    }

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        dispatcher.perform_now(&handler, args, Some(id))
    }));

    match outcome {
        Ok(result) => {
            debug!("Job {desc} finished");
            result
        }
        Err(payload) => Err(DispatchError::Panicked {
            handler: handler.name().to_string(),
            message: panic_message(payload.as_ref()),
        }),
    }
}
