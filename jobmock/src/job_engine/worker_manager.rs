// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::collections::{HashMap, VecDeque};
use std::pin::pin;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use async_channel::{Receiver, Sender};
use async_io::Timer;
use futures::executor::LocalPool;
use futures::future::{self, Either};
use log::{debug, error, warn};

use crate::error::{panic_message, DispatchError};
use crate::global_config::FailurePolicy;
use crate::job_engine::dispatcher::Dispatcher;
use crate::job_engine::job::JobDescriptor;
use crate::job_engine::job_runner;

/// Everything the worker manager reacts to. All of it arrives on one channel,
/// so a runner's own enqueues are always seen before its completion.
#[derive(Debug)]
pub(crate) enum ManagerMessage {
    Enqueue(JobDescriptor),
    RunnerFinished {
        id: u64,
        outcome: Result<(), DispatchError>,
    },
    Exit,
}

/// Owned by the async scope that started the manager.
#[derive(Debug)]
pub(crate) struct ManagerHandle {
    tx: Sender<ManagerMessage>,
    thread_handle: JoinHandle<Option<DispatchError>>,
}

impl ManagerHandle {
    pub(crate) fn sender(&self) -> Sender<ManagerMessage> {
        self.tx.clone()
    }

    /// Requests exit and blocks until every queued and running job is done.
    /// Returns the first job failure the manager saw.
    pub(crate) fn shutdown(self) -> Result<(), DispatchError> {
        if self.tx.send_blocking(ManagerMessage::Exit).is_err() {
            warn!("Worker manager stopped before exit was requested");
        }
        match self.thread_handle.join() {
            Ok(None) => Ok(()),
            Ok(Some(failure)) => Err(failure),
            Err(payload) => Err(DispatchError::Panicked {
                handler: "worker manager".to_string(),
                message: panic_message(payload.as_ref()),
            }),
        }
    }
}

/// Starts the control loop on a dedicated thread.
pub(crate) fn start(dispatcher: &Dispatcher) -> Result<ManagerHandle, DispatchError> {
    let (tx, rx) = async_channel::unbounded();
    let config = dispatcher.config();
    let manager = WorkerManager {
        dispatcher: dispatcher.clone(),
        tx: tx.clone(),
        rx,
        poll_interval: config.poll_interval,
        max_concurrency: config.max_concurrency,
        failure_policy: config.failure_policy,
        pending: VecDeque::new(),
        live: HashMap::new(),
        exit_requested: false,
        first_failure: None,
        spawned: 0,
    };

    let thread_handle = thread::Builder::new()
        .name("jobmock-manager".to_string())
        .spawn(move || {
            let mut pool = LocalPool::new();
            pool.run_until(manager.run())
        })?;

    Ok(ManagerHandle { tx, thread_handle })
}

struct WorkerManager {
    dispatcher: Dispatcher,
    // handed to runners so they can report back
    tx: Sender<ManagerMessage>,
    rx: Receiver<ManagerMessage>,
    poll_interval: Duration,
    max_concurrency: Option<usize>,
    failure_policy: FailurePolicy,
    pending: VecDeque<JobDescriptor>,
    live: HashMap<u64, JoinHandle<Option<DispatchError>>>,
    exit_requested: bool,
    first_failure: Option<DispatchError>,
    spawned: u64,
}

impl WorkerManager {
    async fn run(mut self) -> Option<DispatchError> {
        debug!("Worker manager started");
        loop {
            self.reap_finished();
            while let Ok(message) = self.rx.try_recv() {
                self.handle(message);
            }
            self.spawn_pending();

            // jobs may enqueue more jobs, so this is re-checked after every drain
            if self.exit_requested && self.live.is_empty() && self.pending.is_empty() {
                if self.rx.is_closed() {
                    break;
                }
                // later senders get an error and perform inline, anything that got in
                // before the close is picked up by the next drain
                self.rx.close();
                continue;
            }

            let message = self.wait_for_message().await;
            if let Some(message) = message {
                self.handle(message);
            }
        }
        debug!("Worker manager drained after running {} jobs", self.spawned);
        self.first_failure
    }

    /// Waits for the next message, but no longer than the poll interval.
    async fn wait_for_message(&self) -> Option<ManagerMessage> {
        if self.rx.is_closed() {
            // late runners cannot report back, they are reaped once their threads end
            Timer::after(self.poll_interval).await;
            return None;
        }
        let recv = pin!(self.rx.recv());
        match future::select(recv, Timer::after(self.poll_interval)).await {
            Either::Left((Ok(message), _)) => Some(message),
            // cannot happen while `self.tx` is alive
            Either::Left((Err(_), _)) => None,
            Either::Right(_) => None,
        }
    }

    fn handle(&mut self, message: ManagerMessage) {
        match message {
            ManagerMessage::Enqueue(job) => {
                if self.stop_spawning() {
                    warn!("Dropping job {} after an earlier failure", job.desc());
                } else {
                    self.pending.push_back(job);
                }
            }
            ManagerMessage::RunnerFinished { id, outcome } => {
                if let Some(thread_handle) = self.live.remove(&id) {
                    // the runner sends this as its last action, so the join is immediate
                    if let Err(payload) = thread_handle.join() {
                        warn!(
                            "Runner of job #{id} panicked after reporting: {}",
                            panic_message(payload.as_ref())
                        );
                    }
                }
                if let Err(failure) = outcome {
                    self.record_failure(failure);
                }
            }
            ManagerMessage::Exit => {
                debug!("Worker manager exit requested");
                self.exit_requested = true;
            }
        }
    }

    /// Catches runners that ended without reporting back, either because they
    /// panicked or because the channel was already closed.
    fn reap_finished(&mut self) {
        let finished: Vec<u64> = self
            .live
            .iter()
            .filter(|(_, thread_handle)| thread_handle.is_finished())
            .map(|(id, _)| *id)
            .collect();

        for id in finished {
            let Some(thread_handle) = self.live.remove(&id) else {
                continue;
            };
            match thread_handle.join() {
                Ok(None) => {}
                Ok(Some(failure)) => self.record_failure(failure),
                Err(payload) => self.record_failure(DispatchError::Panicked {
                    handler: format!("job runner #{id}"),
                    message: panic_message(payload.as_ref()),
                }),
            }
        }
    }

    fn spawn_pending(&mut self) {
        while let Some(job) = self.pending.pop_front() {
            if let Some(max) = self.max_concurrency {
                if self.live.len() >= max {
                    self.pending.push_front(job);
                    break;
                }
            }

            let id = job.id();
            debug!("Spawning runner for job {}", job.desc());
            match job_runner::spawn(job, self.dispatcher.clone(), self.tx.clone()) {
                Ok(thread_handle) => {
                    self.live.insert(id, thread_handle);
                    self.spawned += 1;
                }
                Err(failure) => self.record_failure(failure),
            }
        }
    }

    fn record_failure(&mut self, failure: DispatchError) {
        error!("Job failed inside async scope: {failure}");
        if self.first_failure.is_none() {
            self.first_failure = Some(failure);
        }

        if self.stop_spawning() && !self.pending.is_empty() {
            warn!(
                "Dropping {} queued jobs after an earlier failure",
                self.pending.len()
            );
            self.pending.clear();
        }
    }

    fn stop_spawning(&self) -> bool {
        self.failure_policy == FailurePolicy::StopSpawning && self.first_failure.is_some()
    }
}
