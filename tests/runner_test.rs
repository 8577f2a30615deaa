use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use skel::materializer::Materializer;
use skel::runner::{run_async, AsyncRunner};
use skel::spec::{Node, Spec};
use tempfile::TempDir;

#[tokio::test(flavor = "multi_thread")]
async fn test_callback_fires_once_with_outcome() {
    let temp_dir = TempDir::new().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(Mutex::new(None));
    let (counter, slot) = (Arc::clone(&calls), Arc::clone(&seen));
    let spec = Spec::new(vec![Node::directory("src", vec![Node::file("main.rs", "")])]);

    let handle = run_async(temp_dir.path(), spec, move |outcome| {
        counter.fetch_add(1, Ordering::SeqCst);
        *slot.lock().unwrap() = Some((outcome.ok, outcome.log.clone()));
    });
    let outcome = handle.await;

    assert!(outcome.ok);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(*seen.lock().unwrap(), Some((true, outcome.log.clone())));
    assert!(temp_dir.path().join("src/main.rs").is_file());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_callback_fires_on_failure() {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir(temp_dir.path().join("taken")).unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let spec = Spec::new(vec![Node::file("taken", "x")]);

    let outcome = AsyncRunner::current()
        .run_async(&Materializer::new(), temp_dir.path(), spec, move |outcome| {
            assert!(!outcome.ok);
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .await;

    assert!(!outcome.ok);
    assert!(outcome.error.is_some());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_handle_can_be_polled_from_a_blocking_caller() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let runner = AsyncRunner::new(runtime.handle().clone());
    let temp_dir = TempDir::new().unwrap();
    let spec = Spec::new(vec![Node::file("a.txt", "a")]);

    let handle = runner.run_async(&Materializer::new(), temp_dir.path(), spec, |_| {});
    while !handle.is_finished() {
        std::thread::sleep(std::time::Duration::from_millis(5));
    }
    let outcome = runtime.block_on(handle);

    assert!(outcome.ok);
    assert_eq!(fs::read_to_string(temp_dir.path().join("a.txt")).unwrap(), "a");
}
