// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use crate::codec::ArgumentList;
use crate::job_engine::handler::{Handler, JobContext};

type PerformFn = dyn Fn(&JobContext<'_>, ArgumentList) -> anyhow::Result<()> + Send + Sync + 'static;

/// A handler built from a closure, for ad-hoc jobs.
pub struct ClosureHandler {
    desc: String,
    queue: Option<String>,
    perform: Box<PerformFn>,
}

impl ClosureHandler {
    pub fn new(
        queue: impl Into<String>,
        f: impl Fn(&JobContext<'_>, ArgumentList) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            desc: "closure job".to_string(),
            queue: Some(queue.into()),
            perform: Box::new(f),
        }
    }

    /// A handler without a queue. Enqueuing it fails.
    pub fn queueless(
        f: impl Fn(&JobContext<'_>, ArgumentList) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            desc: "queueless closure job".to_string(),
            queue: None,
            perform: Box::new(f),
        }
    }

    pub fn with_desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = desc.into();
        self
    }
}

impl Handler for ClosureHandler {
    fn name(&self) -> &str {
        &self.desc
    }

    fn queue_name(&self) -> Option<&str> {
        self.queue.as_deref()
    }

    fn perform(&self, ctx: &JobContext<'_>, args: ArgumentList) -> anyhow::Result<()> {
        (self.perform)(ctx, args)
    }
}

/// Example usage
#[test]
pub fn example() {
    use crate::job_engine::dispatcher::Dispatcher;
    use crate::job_engine::handler::HandlerRef;
    use std::sync::{Arc, Mutex};

    let dispatcher = Dispatcher::default();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let seen_in_job = seen.clone();
    let job = HandlerRef::new(
        ClosureHandler::new("maintenance", move |_ctx, args| {
            seen_in_job.lock().unwrap().extend(args);
            Ok(())
        })
        .with_desc("Host maintenance"),
    );

    dispatcher
        .async_scope(|d| d.enqueue(&job, ("disk", 1)))
        .unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![serde_json::json!("disk"), serde_json::json!(1)]);
}
