// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use thiserror::Error;

/// Everything that can go wrong while enqueuing or running a job.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The handler does not expose a queue name. Raised before anything is queued or run.
    #[error("no queue could be determined for {handler}")]
    NoQueue { handler: String },

    /// The handler's `perform` returned an error.
    #[error("job {handler} failed: {source}")]
    Job {
        handler: String,
        #[source]
        source: anyhow::Error,
    },

    /// The handler's `perform` panicked on a runner thread.
    #[error("job {handler} panicked: {message}")]
    Panicked { handler: String, message: String },

    #[error("arguments could not be encoded or decoded: {0}")]
    Codec(#[from] serde_json::Error),

    /// `async_scope` was entered while another scope is attached to the same dispatcher.
    #[error("an async scope is already active on this dispatcher")]
    ScopeActive,

    #[error("failed to spawn thread: {0}")]
    Spawn(#[from] std::io::Error),
}

impl DispatchError {
    /// Name of the handler involved, if the error belongs to a specific job.
    pub fn handler(&self) -> Option<&str> {
        match self {
            DispatchError::NoQueue { handler }
            | DispatchError::Job { handler, .. }
            | DispatchError::Panicked { handler, .. } => Some(handler),
            _ => None,
        }
    }
}

/// Turns a panic payload into something printable.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
