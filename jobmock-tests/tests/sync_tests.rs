// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::collections::HashMap;
use std::time::{Duration, Instant};

use jobmock::{DispatchError, Dispatcher};
use jobmock_tests::init_logging;
use jobmock_tests::performers::{BadPerformer, Performer, QueuelessPerformer};
use serde::Serialize;
use serde_json::json;

#[test]
fn test_queue_must_be_determinable() {
    init_logging();
    let dispatcher = Dispatcher::default();
    let performer = QueuelessPerformer::new();

    let err = dispatcher
        .enqueue(&performer.handler(), ("hello", "there"))
        .unwrap_err();

    assert!(matches!(err, DispatchError::NoQueue { ref handler } if handler == "QueuelessPerformer"));
    assert!(!performer.is_run());
}

#[test]
fn test_performs_jobs_without_delay() {
    init_logging();
    let dispatcher = Dispatcher::default();
    let performer = Performer::new();

    dispatcher
        .enqueue(&performer.handler(), ("hello", "there"))
        .unwrap();

    assert!(performer.is_run());
    assert_eq!(performer.args(), Some(vec![json!("hello"), json!("there")]));
    assert_eq!(performer.log().performs[0].job_id, None);
    assert!(!performer.log().performs[0].was_async);
}

#[test]
fn test_performs_jobs_with_a_delay() {
    init_logging();
    let dispatcher = Dispatcher::default();
    let performer = Performer::new();
    let delay = Duration::from_millis(50);

    let start = Instant::now();
    dispatcher
        .enqueue_in(delay, &performer.handler(), ("hello", "there"))
        .unwrap();

    assert!(start.elapsed() >= delay);
    assert!(performer.is_run());
    assert_eq!(performer.args(), Some(vec![json!("hello"), json!("there")]));
}

#[test]
fn test_performs_jobs_queued_by_jobs() {
    init_logging();
    let dispatcher = Dispatcher::default();
    let performer = Performer::new();

    dispatcher
        .enqueue(&performer.handler(), (json!({ "runs": 3 }),))
        .unwrap();

    assert_eq!(performer.runs(), 3);
    assert_eq!(performer.args(), Some(vec![json!({ "runs": 1 })]));
}

#[test]
fn test_roundtrips_arguments() {
    init_logging();
    let dispatcher = Dispatcher::default();
    let performer = Performer::new();

    #[derive(Serialize)]
    struct Options {
        hello: &'static str,
    }
    dispatcher
        .enqueue(&performer.handler(), (Options { hello: "there" },))
        .unwrap();
    assert_eq!(performer.args(), Some(vec![json!({ "hello": "there" })]));

    let mut numbered = HashMap::new();
    numbered.insert(1, "one");
    dispatcher
        .enqueue(&performer.handler(), (numbered,))
        .unwrap();
    assert_eq!(performer.args(), Some(vec![json!({ "1": "one" })]));
}

#[test]
fn test_failures_reach_the_caller() {
    init_logging();
    let dispatcher = Dispatcher::default();

    let err = dispatcher
        .enqueue(&BadPerformer::handler(), (5,))
        .unwrap_err();

    match err {
        DispatchError::Job { handler, source } => {
            assert_eq!(handler, "BadPerformer");
            assert_eq!(source.to_string(), "hello");
        }
        other => panic!("unexpected error {other:?}"),
    }
}
