// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::codec::ArgumentList;
use crate::job_engine::handler::HandlerRef;

static NEXT_JOB_ID: AtomicU64 = AtomicU64::new(1);

/// A job that has been deferred into a worker manager.
/// Created once by the dispatcher and consumed by exactly one job runner.
#[derive(Debug)]
pub struct JobDescriptor {
    id: u64,
    handler: HandlerRef,
    args: ArgumentList,
    delay: Option<Duration>,
}

impl JobDescriptor {
    pub fn new(handler: HandlerRef, args: ArgumentList, delay: Option<Duration>) -> Self {
        Self {
            id: NEXT_JOB_ID.fetch_add(1, Ordering::Relaxed),
            handler,
            args,
            delay,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn handler(&self) -> &HandlerRef {
        &self.handler
    }

    pub fn args(&self) -> &ArgumentList {
        &self.args
    }

    pub fn delay(&self) -> Option<Duration> {
        self.delay
    }

    pub fn into_parts(self) -> (u64, HandlerRef, ArgumentList, Option<Duration>) {
        (self.id, self.handler, self.args, self.delay)
    }

    /// Free-form description, used for logging
    pub fn desc(&self) -> String {
        match self.delay {
            Some(delay) => format!("#{} {} in {:?}", self.id, self.handler.name(), delay),
            None => format!("#{} {}", self.id, self.handler.name()),
        }
    }
}
