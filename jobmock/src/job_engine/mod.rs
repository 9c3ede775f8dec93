// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>
//! # Design: Scoped Job Dispatcher
//!
//! ## Overview
//! Jobs are enqueued through a [`Dispatcher`]. Outside of an async scope they are
//! performed inline, on the caller's thread. Inside [`Dispatcher::async_scope`] they
//! are handed to a worker manager that runs each of them on its own thread.
//!
//! - One worker manager per async scope, running on a dedicated thread.
//! - All enqueues, runner completions and the exit request arrive on one unbounded channel.
//! - The manager exits only when exit was requested, no runner is alive and nothing is queued.
//! - The scope blocks until the manager is gone, then switches the dispatcher back to sync mode.
//! - Arguments always cross the codec before `perform`, like they would in a real queue.
//!
//! ```text
//!         +--------------------------------------+
//!         |              Dispatcher              |
//!         +----------+---------------------------+
//!           sync     |                     | async
//!                    v                     v
//!         +----------+-----------+  +----------------+
//!         |   perform inline     |  | worker manager |
//!         +----------------------+  +-------+--------+
//!                                           |
//!                                  +--------+--------+
//!                                  |        |        |
//!                              +---v--+ +---v--+ +---v--+
//!                              |runner| |runner| |runner|
//!                              +------+ +------+ +------+
//! ```

use std::sync::OnceLock;

use crate::global_config::DispatcherConfig;

mod async_scope;
pub mod closure_job;
pub mod dispatcher;
pub mod handler;
pub mod job;
pub(crate) mod job_runner;
pub(crate) mod worker_manager;

pub use dispatcher::Dispatcher;

/// Process-wide dispatcher, configured from the environment on first use.
pub static JOB_DISPATCHER: OnceLock<Dispatcher> = OnceLock::new();

pub fn global_dispatcher() -> &'static Dispatcher {
    JOB_DISPATCHER.get_or_init(|| Dispatcher::new(DispatcherConfig::from_env()))
}
