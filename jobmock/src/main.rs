// SPDX-License-Identifier: MIT
// jobmock: run demo jobs through the dispatcher
//
// - Enqueues a self-requeuing countdown job and optionally an echo job.
// - Runs them inline, in an async scope, or discards them.
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use base64::prelude::BASE64_STANDARD;
use base64::Engine as _;
use clap::{Parser, ValueEnum};
use log::info;
use serde_json::{json, Value};

use jobmock::jobs::countdown_job::CountdownJob;
use jobmock::jobs::echo_job::EchoJob;
use jobmock::{
    ClosureHandler, DispatchError, Dispatcher, DispatcherConfig, FailurePolicy, HandlerRef,
};

/// How enqueued jobs are handled.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum, Default)]
#[clap(rename_all = "kebab-case")]
enum Mode {
    #[default]
    /// Perform every job inline, before enqueue returns
    Sync,
    /// Perform jobs on background runners and wait for all of them
    Async,
    /// Drop every job without performing it
    Discard,
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    #[arg(long, value_enum, default_value_t)]
    mode: Mode,

    /// Number of times the countdown job performs
    #[arg(long, default_value_t = 3)]
    runs: u64,

    /// Delay every job by this many milliseconds
    #[arg(long = "delay-ms", value_name = "MS")]
    delay_ms: Option<u64>,

    /// Arguments for an echo job (JSON array or single value)
    #[arg(long, value_name = "JSON")]
    args: Option<String>,

    /// Arguments for an echo job (base64-encoded JSON). Note that this excludes --args.
    #[arg(long = "args-base64", value_name = "BASE64")]
    args_base64: Option<String>,

    /// Additionally enqueue a job that always fails
    #[arg(long)]
    fail: bool,

    /// What to do with queued jobs once a job failed (async mode)
    #[arg(long = "failure-policy", value_enum)]
    failure_policy: Option<FailurePolicy>,

    /// Maximum number of jobs running at the same time (async mode, 0 = unbounded)
    #[arg(long = "max-concurrency")]
    max_concurrency: Option<usize>,
}

fn validate_args(args: &Args) -> Result<(), String> {
    if args.args.is_some() && args.args_base64.is_some() {
        return Err("--args and --args-base64 may not be used together".into());
    }

    if args.runs == 0 {
        return Err("--runs must be at least 1".into());
    }

    if args.mode != Mode::Async && (args.failure_policy.is_some() || args.max_concurrency.is_some())
    {
        return Err("--failure-policy and --max-concurrency only apply to --mode async".into());
    }

    Ok(())
}

/// Decodes the echo arguments from --args or --args-base64.
fn echo_args(args: &Args) -> anyhow::Result<Option<Value>> {
    let json = match (&args.args, &args.args_base64) {
        (Some(json), None) => json.clone(),
        (None, Some(b64)) => {
            let decoded = BASE64_STANDARD
                .decode(b64)
                .context("--args-base64 is not valid base64")?;
            String::from_utf8(decoded).context("--args-base64 is not valid UTF-8")?
        }
        (None, None) => return Ok(None),
        _ => unreachable!("validate_args enforces mutual exclusion"),
    };
    let value = serde_json::from_str(&json).context("echo arguments are not valid JSON")?;
    Ok(Some(value))
}

fn enqueue_all(
    dispatcher: &Dispatcher,
    delay: Option<Duration>,
    jobs: &[(HandlerRef, Value)],
) -> Result<(), DispatchError> {
    for (handler, args) in jobs {
        match delay {
            Some(delay) => dispatcher.enqueue_in(delay, handler, args)?,
            None => dispatcher.enqueue(handler, args)?,
        }
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {e}");
        std::process::exit(2);
    }

    let echo = match echo_args(&args) {
        Ok(echo) => echo,
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(2);
        }
    };

    let mut config = DispatcherConfig::from_env();
    if let Some(policy) = args.failure_policy {
        config = config.with_failure_policy(policy);
    }
    if let Some(max) = args.max_concurrency {
        config = config.with_max_concurrency(Some(max));
    }
    let dispatcher = Dispatcher::new(config);

    let countdown = Arc::new(CountdownJob::new());
    let countdown_args = json!([{ "runs": args.runs }]);
    let mut jobs = vec![(HandlerRef::from(countdown.clone()), countdown_args)];
    if let Some(echo) = echo {
        jobs.push((HandlerRef::new(EchoJob::stdout()), echo));
    }
    if args.fail {
        let failing = ClosureHandler::new("failing", |_ctx, args| {
            anyhow::bail!("failing job was asked to fail with {args:?}")
        })
        .with_desc("FailingJob");
        jobs.push((HandlerRef::new(failing), Value::Array(Vec::new())));
    }

    let delay = args.delay_ms.map(Duration::from_millis);
    info!("Starting jobmock in {:?} mode", args.mode);

    let outcome = match args.mode {
        Mode::Sync => enqueue_all(&dispatcher, delay, &jobs),
        Mode::Async => dispatcher.async_scope(|d| enqueue_all(d, delay, &jobs)),
        Mode::Discard => dispatcher.discard(|d| enqueue_all(d, delay, &jobs)),
    };

    info!("Countdown performed {} times", countdown.performed());

    if let Err(e) = outcome {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
