// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::sync::{Arc, Mutex};

use jobmock::{ArgumentList, Handler, HandlerRef, JobContext};
use serde_json::{json, Value};

use crate::test_log::{LoggedPerform, TestLog};

pub const PERFORMER_QUEUE: &str = "performings";

/// Records every perform. A first argument of the form `{"runs": n}` makes it
/// enqueue itself again with `n - 1` until `n` reaches 1.
#[derive(Debug, Default)]
pub struct Performer {
    log: Mutex<TestLog>,
}

impl Performer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn handler(self: &Arc<Self>) -> HandlerRef {
        HandlerRef::from(self.clone())
    }

    pub fn log(&self) -> TestLog {
        self.log.lock().unwrap().clone()
    }

    pub fn runs(&self) -> usize {
        self.log().runs()
    }

    pub fn is_run(&self) -> bool {
        self.runs() > 0
    }

    pub fn args(&self) -> Option<Vec<Value>> {
        self.log().last_args().cloned()
    }
}

impl Handler for Performer {
    fn name(&self) -> &str {
        "Performer"
    }

    fn queue_name(&self) -> Option<&str> {
        Some(PERFORMER_QUEUE)
    }

    fn perform(&self, ctx: &JobContext<'_>, args: ArgumentList) -> anyhow::Result<()> {
        let runs_left = args
            .first()
            .and_then(|options| options.get("runs"))
            .and_then(Value::as_i64);

        self.log.lock().unwrap().performs.push(LoggedPerform {
            job_id: ctx.job_id(),
            was_async: ctx.dispatcher().is_async(),
            args,
        });

        if let Some(runs_left) = runs_left {
            let runs_left = runs_left - 1;
            if runs_left > 0 {
                ctx.enqueue_self((json!({ "runs": runs_left }),))?;
            }
        }
        Ok(())
    }
}

/// Always fails with "hello".
#[derive(Debug, Default)]
pub struct BadPerformer;

impl BadPerformer {
    pub fn handler() -> HandlerRef {
        HandlerRef::new(BadPerformer)
    }
}

impl Handler for BadPerformer {
    fn name(&self) -> &str {
        "BadPerformer"
    }

    fn queue_name(&self) -> Option<&str> {
        Some(PERFORMER_QUEUE)
    }

    fn perform(&self, _ctx: &JobContext<'_>, _args: ArgumentList) -> anyhow::Result<()> {
        anyhow::bail!("hello")
    }
}

/// A performer without a queue, so it cannot be enqueued.
#[derive(Debug, Default)]
pub struct QueuelessPerformer {
    inner: Performer,
}

impl QueuelessPerformer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn handler(self: &Arc<Self>) -> HandlerRef {
        HandlerRef::from(self.clone())
    }

    pub fn is_run(&self) -> bool {
        self.inner.is_run()
    }
}

impl Handler for QueuelessPerformer {
    fn name(&self) -> &str {
        "QueuelessPerformer"
    }

    fn queue_name(&self) -> Option<&str> {
        None
    }

    fn perform(&self, ctx: &JobContext<'_>, args: ArgumentList) -> anyhow::Result<()> {
        self.inner.perform(ctx, args)
    }
}
