use std::collections::HashSet;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

use harvest_dl::{Dispatcher, DownloadError, DownloadTask, NetworkError, ProgressSnapshot};
use reqwest::StatusCode;

fn tasks(n: usize) -> Vec<DownloadTask> {
    (0..n)
        .map(|i| {
            DownloadTask::with_destination(format!("http://x/{i}.bin"), format!("out/{i}.bin"))
        })
        .collect()
}

fn resolved(dest: Option<&Path>) -> PathBuf {
    dest.map(Path::to_path_buf).unwrap_or_default()
}

#[test]
fn every_task_lands_in_exactly_one_bucket() {
    let input = tasks(20);
    let dispatcher = Dispatcher::new(
        |url: &str, dest: Option<&Path>| -> Result<PathBuf, DownloadError> {
            let index: usize = url
                .trim_start_matches("http://x/")
                .trim_end_matches(".bin")
                .parse()
                .unwrap();
            match index % 3 {
                0 => Err(DownloadError::network(
                    url,
                    NetworkError::Status(StatusCode::BAD_GATEWAY),
                )),
                1 => Err(DownloadError::file(resolved(dest), io::Error::other("disk full"))),
                _ => Ok(resolved(dest)),
            }
        },
        4,
    )
    .unwrap();

    let result = dispatcher.run(&input);

    assert_eq!(result.successes.len() + result.failures.len(), input.len());

    let failed: HashSet<&DownloadTask> = result.failures.iter().collect();
    let succeeded: HashSet<&PathBuf> = result.successes.iter().collect();
    assert_eq!(failed.len(), result.failures.len(), "no duplicated failures");
    assert_eq!(succeeded.len(), result.successes.len(), "no duplicated successes");

    for (i, task) in input.iter().enumerate() {
        let in_failures = failed.contains(task);
        let in_successes = succeeded.contains(task.destination_path.as_ref().unwrap());
        assert!(in_failures ^ in_successes, "task {i} must be in exactly one bucket");
        assert_eq!(in_failures, i % 3 != 2);
    }
}

#[test]
fn concurrency_never_exceeds_max_workers() {
    let in_flight = AtomicUsize::new(0);
    let peak = AtomicUsize::new(0);
    // 两个线程必须同时到达才能放行：既证明能并发到 2，又配合计数器证明不超过 2。
    let gate = Barrier::new(2);

    let dispatcher = Dispatcher::new(
        |_: &str, dest: Option<&Path>| -> Result<PathBuf, DownloadError> {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            gate.wait();
            thread::sleep(Duration::from_millis(5));
            in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(resolved(dest))
        },
        2,
    )
    .unwrap();

    let result = dispatcher.run(&tasks(10));

    assert_eq!(result.successes.len(), 10);
    assert_eq!(peak.load(Ordering::SeqCst), 2);
    assert_eq!(in_flight.load(Ordering::SeqCst), 0);
}

#[test]
fn fewer_tasks_than_workers_uses_only_what_it_needs() {
    let threads = Mutex::new(HashSet::new());
    let dispatcher = Dispatcher::new(
        |_: &str, dest: Option<&Path>| -> Result<PathBuf, DownloadError> {
            threads.lock().unwrap().insert(thread::current().id());
            Ok(resolved(dest))
        },
        8,
    )
    .unwrap();

    let result = dispatcher.run(&tasks(2));

    assert_eq!(result.successes.len(), 2);
    assert!(threads.lock().unwrap().len() <= 2);
}

#[test]
fn results_follow_completion_order() {
    let dispatcher = Dispatcher::new(
        |url: &str, dest: Option<&Path>| -> Result<PathBuf, DownloadError> {
            if url.ends_with("/0.bin") {
                thread::sleep(Duration::from_millis(300));
            }
            Ok(resolved(dest))
        },
        2,
    )
    .unwrap();

    let result = dispatcher.run(&tasks(2));

    assert_eq!(
        result.successes,
        vec![PathBuf::from("out/1.bin"), PathBuf::from("out/0.bin")]
    );
}

#[test]
fn failure_does_not_cancel_siblings() {
    let calls = AtomicUsize::new(0);
    let dispatcher = Dispatcher::new(
        |url: &str, dest: Option<&Path>| -> Result<PathBuf, DownloadError> {
            calls.fetch_add(1, Ordering::SeqCst);
            if url.ends_with("/0.bin") {
                return Err(DownloadError::network(
                    url,
                    NetworkError::Status(StatusCode::NOT_FOUND),
                ));
            }
            thread::sleep(Duration::from_millis(20));
            Ok(resolved(dest))
        },
        3,
    )
    .unwrap();
    let input = tasks(6);

    let result = dispatcher.run(&input);

    assert_eq!(calls.load(Ordering::SeqCst), 6);
    assert_eq!(result.failures, vec![input[0].clone()]);
    assert_eq!(result.successes.len(), 5);
}

#[test]
fn failed_tasks_can_be_resubmitted() {
    let attempts = Mutex::new(Vec::new());
    let dispatcher = Dispatcher::new(
        |url: &str, dest: Option<&Path>| -> Result<PathBuf, DownloadError> {
            let mut seen = attempts.lock().unwrap();
            let first_try = !seen.iter().any(|u: &String| u == url);
            seen.push(url.to_string());
            if first_try && url.ends_with("/1.bin") {
                Err(DownloadError::network(
                    url,
                    NetworkError::Status(StatusCode::SERVICE_UNAVAILABLE),
                ))
            } else {
                Ok(resolved(dest))
            }
        },
        2,
    )
    .unwrap();
    let input = tasks(3);

    let first = dispatcher.run(&input);
    assert_eq!(first.failures, vec![input[1].clone()]);

    let retry = dispatcher.run(&first.failures);
    assert!(retry.failures.is_empty());
    assert_eq!(retry.successes, vec![PathBuf::from("out/1.bin")]);
}

#[test]
fn progress_callback_is_observational() {
    let snapshots = Arc::new(Mutex::new(Vec::<ProgressSnapshot>::new()));
    let sink = Arc::clone(&snapshots);
    let fetch = |url: &str, dest: Option<&Path>| -> Result<PathBuf, DownloadError> {
        if url.ends_with("/3.bin") {
            Err(DownloadError::file(resolved(dest), io::Error::other("denied")))
        } else {
            Ok(resolved(dest))
        }
    };
    let input = tasks(5);

    let with = Dispatcher::new(fetch, 2).unwrap().run_with_progress(
        &input,
        Some(Box::new(move |s: ProgressSnapshot| sink.lock().unwrap().push(s))),
    );
    let without = Dispatcher::new(fetch, 2).unwrap().run(&input);

    let sorted = |mut v: Vec<PathBuf>| {
        v.sort();
        v
    };
    assert_eq!(sorted(with.successes.clone()), sorted(without.successes.clone()));
    assert_eq!(with.failures, without.failures);

    let snapshots = snapshots.lock().unwrap();
    let last = snapshots.last().copied().unwrap();
    assert_eq!(
        last,
        ProgressSnapshot {
            done: 5,
            succeeded: 4,
            failed: 1,
            total: 5
        }
    );
}

#[test]
fn panicking_fetcher_surfaces_after_the_pool_drains() {
    let calls = AtomicUsize::new(0);
    let dispatcher = Dispatcher::new(
        |url: &str, dest: Option<&Path>| -> Result<PathBuf, DownloadError> {
            calls.fetch_add(1, Ordering::SeqCst);
            if url.ends_with("/2.bin") {
                panic!("bug in fetcher");
            }
            Ok(resolved(dest))
        },
        2,
    )
    .unwrap();
    let input = tasks(6);

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| dispatcher.run(&input)));

    assert!(outcome.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 6);
}
