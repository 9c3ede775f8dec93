// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::time::{Duration, Instant};

use jobmock::{DispatchError, Dispatcher, DispatcherConfig};
use jobmock_tests::init_logging;
use jobmock_tests::performers::{BadPerformer, Performer};
use serde::Serialize;
use serde_json::json;

fn test_dispatcher() -> Dispatcher {
    Dispatcher::new(DispatcherConfig::default().with_poll_interval(Duration::from_millis(20)))
}

#[test]
fn test_performs_jobs_without_delay() {
    init_logging();
    let dispatcher = test_dispatcher();
    let performer = Performer::new();

    dispatcher
        .async_scope(|d| d.enqueue(&performer.handler(), ("hello", "there")))
        .unwrap();

    assert!(performer.is_run());
    assert_eq!(performer.args(), Some(vec![json!("hello"), json!("there")]));
    let logged = &performer.log().performs[0];
    assert!(logged.job_id.is_some());
    assert!(logged.was_async);
}

#[test]
fn test_performs_jobs_with_delay() {
    init_logging();
    let dispatcher = test_dispatcher();
    let performer = Performer::new();
    let delay = Duration::from_millis(50);

    let start = Instant::now();
    dispatcher
        .async_scope(|d| {
            d.enqueue_in(delay, &performer.handler(), ("hello", "there"))?;
            // the delay is served by the runner, not by the caller
            assert!(!performer.is_run());
            Ok::<_, DispatchError>(())
        })
        .unwrap();

    assert!(start.elapsed() >= delay);
    assert!(performer.is_run());
    assert_eq!(performer.args(), Some(vec![json!("hello"), json!("there")]));
}

#[test]
fn test_performs_jobs_queued_by_jobs() {
    init_logging();
    let dispatcher = test_dispatcher();
    let performer = Performer::new();

    dispatcher
        .async_scope(|d| d.enqueue(&performer.handler(), (json!({ "runs": 3 }),)))
        .unwrap();

    assert_eq!(performer.runs(), 3);
    assert!(performer.log().performs.iter().all(|p| p.was_async));
}

#[test]
fn test_roundtrips_arguments() {
    init_logging();
    let dispatcher = test_dispatcher();
    let performer = Performer::new();

    #[derive(Serialize)]
    struct Options {
        hello: &'static str,
    }
    dispatcher
        .async_scope(|d| d.enqueue(&performer.handler(), (Options { hello: "there" },)))
        .unwrap();

    assert_eq!(performer.args(), Some(vec![json!({ "hello": "there" })]));
}

#[test]
fn test_raises_errors_encountered_inside_the_block() {
    init_logging();
    let dispatcher = test_dispatcher();

    let result = dispatcher.async_scope(|_| Err::<(), _>(anyhow::anyhow!("hello")));

    assert_eq!(result.unwrap_err().to_string(), "hello");
    assert!(!dispatcher.is_async());
}

#[test]
fn test_raises_errors_encountered_by_jobs() {
    init_logging();
    let dispatcher = test_dispatcher();

    let result = dispatcher.async_scope(|d| d.enqueue(&BadPerformer::handler(), (5,)));

    assert!(matches!(result, Err(DispatchError::Job { .. })));
}

#[test]
fn test_clears_async_flag_if_errors_are_raised() {
    init_logging();
    let dispatcher = test_dispatcher();
    let performer = Performer::new();

    assert!(!dispatcher.is_async());
    let result = dispatcher.async_scope(|d| d.enqueue(&BadPerformer::handler(), (5,)));
    assert!(result.is_err());
    assert!(!dispatcher.is_async());

    // a following enqueue runs inline again
    dispatcher.enqueue(&performer.handler(), ("after",)).unwrap();
    assert_eq!(performer.runs(), 1);
    assert!(!performer.log().performs[0].was_async);
}

#[test]
fn test_many_jobs_from_many_threads() {
    init_logging();
    let dispatcher = test_dispatcher();
    let performer = Performer::new();

    dispatcher
        .async_scope(|d| {
            std::thread::scope(|s| {
                for t in 0..4 {
                    let handler = performer.handler();
                    s.spawn(move || {
                        for i in 0..50 {
                            d.enqueue(&handler, (t, i)).unwrap();
                        }
                    });
                }
            });
            Ok::<_, DispatchError>(())
        })
        .unwrap();

    assert_eq!(performer.runs(), 200);
}

#[test]
fn test_independent_dispatchers_run_side_by_side() {
    init_logging();
    let first = test_dispatcher();
    let second = test_dispatcher();
    let performer = Performer::new();

    first
        .async_scope(|_| {
            second.async_scope(|d| d.enqueue(&performer.handler(), (json!({ "runs": 2 }),)))
        })
        .unwrap();

    assert!(!first.is_async());
    assert!(!second.is_async());
    assert_eq!(performer.runs(), 2);
}
