// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::io::Write;
use std::sync::Mutex;

use crate::codec::ArgumentList;
use crate::job_engine::handler::{Handler, JobContext};

pub const ECHO_QUEUE: &str = "echo";

/// Writes its arguments as one JSON line.
pub struct EchoJob {
    out: Mutex<Box<dyn Write + Send>>,
}

impl EchoJob {
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }
}

impl Handler for EchoJob {
    fn name(&self) -> &str {
        "EchoJob"
    }

    fn queue_name(&self) -> Option<&str> {
        Some(ECHO_QUEUE)
    }

    fn perform(&self, _ctx: &JobContext<'_>, args: ArgumentList) -> anyhow::Result<()> {
        let line = serde_json::to_string(&args)?;
        let mut out = self
            .out
            .lock()
            .map_err(|_| anyhow::anyhow!("echo output lock poisoned"))?;
        writeln!(out, "{line}")?;
        out.flush()?;
        Ok(())
    }
}
