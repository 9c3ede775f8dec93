// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Context;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::codec::ArgumentList;
use crate::job_engine::handler::{Handler, JobContext};

pub const COUNTDOWN_QUEUE: &str = "countdown";

/// Argument of a [`CountdownJob`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Countdown {
    pub runs: u64,
}

/// Performs itself `runs` times by enqueuing a new job with one run less.
#[derive(Debug, Default)]
pub struct CountdownJob {
    performed: AtomicU64,
}

impl CountdownJob {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn performed(&self) -> u64 {
        self.performed.load(Ordering::SeqCst)
    }
}

impl Handler for CountdownJob {
    fn name(&self) -> &str {
        "CountdownJob"
    }

    fn queue_name(&self) -> Option<&str> {
        Some(COUNTDOWN_QUEUE)
    }

    fn perform(&self, ctx: &JobContext<'_>, args: ArgumentList) -> anyhow::Result<()> {
        let first = args.into_iter().next().context("countdown needs an argument")?;
        let countdown: Countdown =
            serde_json::from_value(first).context("countdown argument must be {\"runs\": n}")?;

        self.performed.fetch_add(1, Ordering::SeqCst);
        debug!("Countdown at {}", countdown.runs);

        if countdown.runs > 1 {
            ctx.enqueue_self((Countdown {
                runs: countdown.runs - 1,
            },))?;
        }
        Ok(())
    }
}
