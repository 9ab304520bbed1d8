use crate::{
    AccumulatingSetQueue, DispatchError, Error, KeyedLatestQueue, Rejected, SetOutcome,
    SinglePayloadQueue,
};
use core::time::Duration;
use futures::FutureExt;
use parking_lot::Mutex;
use std::{
    collections::{BTreeSet, HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};
use tokio::time::{Instant, sleep};

const WINDOW: Duration = Duration::from_millis(100);

type PageAsk = (String, String);

fn ask(key: &str, filter: &str) -> PageAsk {
    (key.to_string(), filter.to_string())
}

/// A keyed queue whose dispatcher records every batch and answers each key
/// with `"{key}={filter}"`.
fn recording_keyed_queue(
    window: Duration,
    delay: Duration,
) -> (
    KeyedLatestQueue<PageAsk, impl crate::KeyedDispatch<PageAsk, Output = String>>,
    Arc<Mutex<Vec<Vec<PageAsk>>>>,
) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&calls);
    let queue = KeyedLatestQueue::new(window, move |requests: Vec<PageAsk>| {
        let seen = Arc::clone(&seen);
        async move {
            seen.lock().push(requests.clone());
            if !delay.is_zero() {
                sleep(delay).await;
            }
            Ok::<_, DispatchError>(
                requests
                    .into_iter()
                    .map(|(key, filter)| {
                        let answer = format!("{key}={filter}");
                        (key, answer)
                    })
                    .collect::<HashMap<_, _>>(),
            )
        }
    });
    (queue, calls)
}

// === KeyedLatestQueue ===

#[tokio::test(start_paused = true)]
async fn keyed_same_key_collapses_to_latest_request() {
    let (queue, calls) = recording_keyed_queue(WINDOW, Duration::ZERO);

    let first = queue.enqueue(ask("page:0", "1"));
    let second = queue.enqueue(ask("page:0", "12"));
    let third = queue.enqueue(ask("page:0", "123"));
    let (a, b, c) = tokio::join!(first, second, third);

    assert_eq!(a.unwrap(), "page:0=123");
    assert_eq!(b.unwrap(), "page:0=123");
    assert_eq!(c.unwrap(), "page:0=123");
    assert_eq!(*calls.lock(), vec![vec![ask("page:0", "123")]]);
}

#[tokio::test(start_paused = true)]
async fn keyed_distinct_keys_share_one_dispatch_in_arrival_order() {
    let (queue, calls) = recording_keyed_queue(WINDOW, Duration::ZERO);

    let p1 = queue.enqueue(ask("page:1", "a"));
    let p0 = queue.enqueue(ask("page:0", "a"));
    let p1_again = queue.enqueue(ask("page:1", "ab"));
    let (p1, p0, p1_again) = tokio::join!(p1, p0, p1_again);

    assert_eq!(p1.unwrap(), "page:1=ab");
    assert_eq!(p0.unwrap(), "page:0=a");
    assert_eq!(p1_again.unwrap(), "page:1=ab");
    assert_eq!(
        *calls.lock(),
        vec![vec![ask("page:1", "ab"), ask("page:0", "a")]]
    );
}

#[tokio::test(start_paused = true)]
async fn keyed_empty_key_is_rejected_before_batching() {
    let (queue, calls) = recording_keyed_queue(WINDOW, Duration::ZERO);

    let result = queue.enqueue(ask("", "1")).await;
    assert!(matches!(result, Err(Error::Validation { .. })));
    assert!(!queue.is_armed());

    sleep(WINDOW * 2).await;
    assert!(calls.lock().is_empty());
}

#[tokio::test(start_paused = true)]
async fn keyed_validation_failure_does_not_disturb_other_callers() {
    let (queue, _calls) = recording_keyed_queue(WINDOW, Duration::ZERO);

    let good = queue.enqueue(ask("page:0", "7"));
    let bad = queue.enqueue(ask("", "7"));
    let (good, bad) = tokio::join!(good, bad);

    assert_eq!(good.unwrap(), "page:0=7");
    assert!(matches!(bad, Err(Error::Validation { .. })));
}

#[tokio::test(start_paused = true)]
async fn keyed_missing_key_fails_only_that_key() {
    let queue = KeyedLatestQueue::new(WINDOW, |requests: Vec<PageAsk>| async move {
        Ok::<_, DispatchError>(
            requests
                .into_iter()
                .filter(|(key, _)| key != "page:9")
                .collect::<HashMap<_, _>>(),
        )
    });

    let kept = queue.enqueue(ask("page:0", "x"));
    let dropped = queue.enqueue(ask("page:9", "x"));
    let dropped_again = queue.enqueue(ask("page:9", "y"));
    let (kept, dropped, dropped_again) = tokio::join!(kept, dropped, dropped_again);

    assert_eq!(kept.unwrap(), "x");
    for result in [dropped, dropped_again] {
        match result {
            Err(Error::MissingResult { key }) => assert_eq!(key, "page:9"),
            other => panic!("expected a missing result, got {other:?}"),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn keyed_dispatch_failure_reaches_every_waiter_verbatim() {
    let queue = KeyedLatestQueue::new(WINDOW, |_requests: Vec<PageAsk>| async move {
        Err::<HashMap<String, String>, _>(DispatchError::msg("store offline"))
    });

    let a = queue.enqueue(ask("page:0", "1"));
    let b = queue.enqueue(ask("page:0", "2"));
    let c = queue.enqueue(ask("page:1", "1"));
    let (a, b, c) = tokio::join!(a, b, c);

    let errors: Vec<DispatchError> = [a, b, c]
        .into_iter()
        .map(|result| match result {
            Err(Error::Dispatch(err)) => err,
            other => panic!("expected a dispatch failure, got {other:?}"),
        })
        .collect();
    assert_eq!(errors[0].to_string(), "store offline");
    assert!(errors.iter().all(|err| err.ptr_eq(&errors[0])));
}

#[tokio::test(start_paused = true)]
async fn keyed_failure_does_not_leak_into_next_cycle() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let queue = KeyedLatestQueue::new(WINDOW, move |requests: Vec<String>| {
        let attempt = counter.fetch_add(1, Ordering::SeqCst);
        async move {
            if attempt == 0 {
                return Err(DispatchError::msg("first attempt fails"));
            }
            Ok(requests
                .into_iter()
                .map(|key| (key, attempt))
                .collect::<HashMap<_, _>>())
        }
    });

    let failed = queue.enqueue("selection".to_string()).await;
    assert!(matches!(failed, Err(Error::Dispatch(_))));

    let retried = queue.enqueue("selection".to_string()).await;
    assert_eq!(retried.unwrap(), 1);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn keyed_resolves_within_one_window_of_first_arrival() {
    let (queue, calls) = recording_keyed_queue(WINDOW, Duration::ZERO);
    let start = Instant::now();

    let first = queue.enqueue(ask("page:0", "1"));
    let mut later = Vec::new();
    for filter in ["12", "123", "1234"] {
        sleep(WINDOW / 4).await;
        later.push(queue.enqueue(ask("page:0", filter)));
    }

    let result = first.await.unwrap();
    let elapsed = start.elapsed();
    assert!(elapsed >= WINDOW, "flushed early after {elapsed:?}");
    assert!(elapsed <= WINDOW + Duration::from_millis(1), "flushed late after {elapsed:?}");
    assert_eq!(result, "page:0=1234");

    for completion in later {
        assert_eq!(completion.await.unwrap(), "page:0=1234");
    }
    assert_eq!(calls.lock().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn keyed_arrivals_during_dispatch_start_a_new_cycle() {
    let (queue, calls) = recording_keyed_queue(WINDOW, Duration::from_millis(500));

    let first = queue.enqueue(ask("page:0", "a"));
    sleep(WINDOW + WINDOW / 2).await;
    // The first cycle is drained and still dispatching.
    assert!(!queue.is_armed());
    assert_eq!(calls.lock().len(), 1);

    let second = queue.enqueue(ask("page:0", "b"));
    assert!(queue.is_armed());

    let (first, second) = tokio::join!(first, second);
    assert_eq!(first.unwrap(), "page:0=a");
    assert_eq!(second.unwrap(), "page:0=b");
    assert_eq!(
        *calls.lock(),
        vec![vec![ask("page:0", "a")], vec![ask("page:0", "b")]]
    );
}

#[tokio::test(start_paused = true)]
async fn keyed_dropping_the_queue_still_flushes_pending_waiters() {
    let (queue, calls) = recording_keyed_queue(WINDOW, Duration::ZERO);

    let pending = queue.enqueue(ask("page:3", "q"));
    drop(queue);

    assert_eq!(pending.await.unwrap(), "page:3=q");
    assert_eq!(calls.lock().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn keyed_panicking_dispatcher_abandons_every_waiter() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let queue = KeyedLatestQueue::new(WINDOW, move |requests: Vec<PageAsk>| {
        let attempt = counter.fetch_add(1, Ordering::SeqCst);
        async move {
            if attempt == 0 {
                panic!("dispatcher crashed");
            }
            Ok::<_, DispatchError>(requests.into_iter().collect::<HashMap<_, _>>())
        }
    });

    let a = queue.enqueue(ask("k", "1"));
    let b = queue.enqueue(ask("k", "2"));
    assert!(matches!(a.await, Err(Error::Abandoned)));
    assert!(matches!(b.await, Err(Error::Abandoned)));
    assert!(!queue.is_armed());

    // The crashed cycle leaves nothing behind; the next one runs normally.
    let next = queue.enqueue(ask("k", "3"));
    assert!(queue.is_armed());
    assert_eq!(next.await.unwrap(), "3");
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn enqueue_outside_a_runtime_fails_fast() {
    let (queue, _calls) = recording_keyed_queue(WINDOW, Duration::ZERO);
    let outcome = queue.enqueue(ask("page:0", "1")).now_or_never();
    assert!(matches!(outcome, Some(Err(Error::NoRuntime))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn keyed_concurrent_callers_on_many_threads_all_resolve() {
    const CALLERS: usize = 256;
    let (queue, calls) = recording_keyed_queue(Duration::from_millis(20), Duration::ZERO);

    let tasks: Vec<_> = (0..CALLERS)
        .map(|i| {
            let queue = queue.clone();
            tokio::spawn(async move {
                let key = format!("page:{}", i % 8);
                let answer = queue.enqueue((key.clone(), "f".to_string())).await?;
                assert_eq!(answer, format!("{key}=f"));
                Ok::<_, Error>(())
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap().unwrap();
    }

    // Each cycle dispatches every key at most once.
    for batch in calls.lock().iter() {
        let distinct: HashSet<_> = batch.iter().map(|(key, _)| key).collect();
        assert_eq!(distinct.len(), batch.len());
    }
}

// === AccumulatingSetQueue ===

type Reason = &'static str;

/// A set queue backed by an in-memory overflow set. Items below 10 are the
/// "base range"; zero is malformed.
fn recording_set_queue() -> (
    AccumulatingSetQueue<u32, impl crate::SetDispatch<u32, Reason = Reason>>,
    Arc<Mutex<Vec<Vec<u32>>>>,
    Arc<Mutex<BTreeSet<u32>>>,
) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let added = Arc::new(Mutex::new(BTreeSet::new()));
    let (seen, store) = (Arc::clone(&calls), Arc::clone(&added));

    let queue = AccumulatingSetQueue::new(WINDOW, move |candidates: Vec<u32>| {
        let (seen, store) = (Arc::clone(&seen), Arc::clone(&store));
        async move {
            seen.lock().push(candidates.clone());
            let mut store = store.lock();
            let mut accepted = Vec::new();
            let mut rejected = Vec::new();
            for item in candidates {
                if item == 0 {
                    rejected.push(Rejected::new(item, "invalid format"));
                } else if item < 10 {
                    rejected.push(Rejected::new(item, "already present in base set"));
                } else if store.contains(&item) {
                    rejected.push(Rejected::new(item, "already added"));
                } else {
                    accepted.push(item);
                }
            }
            accepted.sort_unstable();
            store.extend(accepted.iter().copied());
            Ok::<_, DispatchError>(SetOutcome::new(accepted, rejected))
        }
    });
    (queue, calls, added)
}

#[tokio::test(start_paused = true)]
async fn set_overlapping_callers_each_see_their_own_slice() {
    let (queue, calls, added) = recording_set_queue();

    let first = queue.enqueue(vec![15, 17]);
    let second = queue.enqueue(vec![15]);
    let (first, second) = tokio::join!(first, second);

    assert_eq!(*calls.lock(), vec![vec![15, 17]]);
    assert_eq!(first.unwrap().accepted, vec![15, 17]);
    assert_eq!(second.unwrap().accepted, vec![15]);
    assert_eq!(added.lock().iter().copied().collect::<Vec<_>>(), vec![15, 17]);
}

#[tokio::test(start_paused = true)]
async fn set_rejections_fan_out_to_every_interested_caller() {
    let (queue, _calls, _added) = recording_set_queue();

    let first = queue.enqueue(vec![3, 0, 42]);
    let second = queue.enqueue(vec![3, 43]);
    let third = queue.enqueue(vec![44]);
    let (first, second, third) = tokio::join!(first, second, third);

    let first = first.unwrap();
    assert_eq!(first.accepted, vec![42]);
    assert_eq!(
        first.rejected,
        vec![
            Rejected::new(3, "already present in base set"),
            Rejected::new(0, "invalid format"),
        ]
    );

    let second = second.unwrap();
    assert_eq!(second.accepted, vec![43]);
    assert_eq!(
        second.rejected,
        vec![Rejected::new(3, "already present in base set")]
    );

    let third = third.unwrap();
    assert_eq!(third.accepted, vec![44]);
    assert!(third.rejected.is_empty());
}

#[tokio::test(start_paused = true)]
async fn set_union_of_slices_matches_batch_outcome() {
    let (queue, calls, added) = recording_set_queue();
    let asks = [vec![20, 21, 22], vec![21, 23], vec![22, 24, 20], vec![25]];

    let completions: Vec<_> = asks.iter().map(|items| queue.enqueue(items.clone())).collect();
    let mut union = BTreeSet::new();
    for (items, completion) in asks.iter().zip(completions) {
        let slice = completion.await.unwrap();
        // Every accepted item in a slice was asked for by that caller, once.
        let unique: HashSet<_> = slice.accepted.iter().collect();
        assert_eq!(unique.len(), slice.accepted.len());
        assert!(slice.accepted.iter().all(|item| items.contains(item)));
        union.extend(slice.accepted);
    }

    assert_eq!(*calls.lock(), vec![vec![20, 21, 22, 23, 24, 25]]);
    assert_eq!(union, *added.lock());
}

#[tokio::test(start_paused = true)]
async fn set_resubmitting_an_accepted_item_is_already_added() {
    let (queue, calls, _added) = recording_set_queue();

    let accepted = queue.enqueue(vec![77]).await.unwrap();
    assert_eq!(accepted.accepted, vec![77]);

    for _ in 0..2 {
        let again = queue.enqueue(vec![77]).await.unwrap();
        assert!(again.accepted.is_empty());
        assert_eq!(again.rejected, vec![Rejected::new(77, "already added")]);
    }
    assert_eq!(calls.lock().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn set_empty_request_is_rejected_before_batching() {
    let (queue, calls, _added) = recording_set_queue();

    let result = queue.enqueue(Vec::new()).await;
    assert!(matches!(result, Err(Error::Validation { .. })));
    assert!(!queue.is_armed());
    sleep(WINDOW * 2).await;
    assert!(calls.lock().is_empty());
}

#[tokio::test(start_paused = true)]
async fn set_dispatch_failure_fails_the_whole_cycle() {
    let queue = AccumulatingSetQueue::new(WINDOW, |_candidates: Vec<u32>| async move {
        Err::<SetOutcome<u32, Reason>, _>(DispatchError::msg("write rejected"))
    });

    let a = queue.enqueue(vec![11]);
    let b = queue.enqueue(vec![11, 12]);
    let (a, b) = tokio::join!(a, b);

    match (a, b) {
        (Err(Error::Dispatch(a)), Err(Error::Dispatch(b))) => assert!(a.ptr_eq(&b)),
        other => panic!("expected uniform dispatch failures, got {other:?}"),
    }
}

// === SinglePayloadQueue ===

fn recording_payload_queue(
    window: Duration,
) -> (
    SinglePayloadQueue<Vec<u32>, impl crate::PayloadDispatch<Vec<u32>, Output = Vec<u32>>>,
    Arc<Mutex<Vec<Vec<u32>>>>,
) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&calls);
    let queue = SinglePayloadQueue::new(window, move |payload: Vec<u32>| {
        let seen = Arc::clone(&seen);
        async move {
            seen.lock().push(payload.clone());
            Ok::<_, DispatchError>(payload)
        }
    });
    (queue, calls)
}

#[tokio::test(start_paused = true)]
async fn payload_last_write_wins_and_everyone_resolves() {
    let (queue, calls) = recording_payload_queue(Duration::from_millis(1000));

    let p1 = queue.enqueue(vec![1, 2, 3]);
    sleep(Duration::from_millis(5)).await;
    let p2 = queue.enqueue(vec![3, 1, 2]);
    let (p1, p2) = tokio::join!(p1, p2);

    assert_eq!(*calls.lock(), vec![vec![3, 1, 2]]);
    assert_eq!(p1.unwrap(), vec![3, 1, 2]);
    assert_eq!(p2.unwrap(), vec![3, 1, 2]);
}

#[tokio::test(start_paused = true)]
async fn payload_flush_with_nothing_pending_is_a_no_op() {
    let (queue, calls) = recording_payload_queue(WINDOW);

    queue.flush_now().await;
    assert!(calls.lock().is_empty());
    assert!(!queue.is_armed());
}

#[tokio::test(start_paused = true)]
async fn payload_duplicate_flush_dispatches_once() {
    let (queue, calls) = recording_payload_queue(WINDOW);

    let pending = queue.enqueue(vec![9]);
    queue.flush_now().await;
    assert_eq!(pending.await.unwrap(), vec![9]);

    // The original timer still fires and finds nothing to do.
    sleep(WINDOW * 2).await;
    assert_eq!(*calls.lock(), vec![vec![9]]);
}

#[tokio::test(start_paused = true)]
async fn payload_validation_failure_keeps_the_pending_payload() {
    struct NoDuplicates {
        calls: Arc<Mutex<Vec<Vec<u32>>>>,
    }

    impl crate::PayloadDispatch<Vec<u32>> for NoDuplicates {
        type Output = usize;

        fn validate(&self, payload: &Vec<u32>) -> Result<(), String> {
            let unique: HashSet<_> = payload.iter().collect();
            if unique.len() == payload.len() {
                Ok(())
            } else {
                Err("duplicate ids".to_string())
            }
        }

        async fn dispatch(&self, payload: Vec<u32>) -> Result<usize, DispatchError> {
            let len = payload.len();
            self.calls.lock().push(payload);
            Ok(len)
        }
    }

    let calls = Arc::new(Mutex::new(Vec::new()));
    let queue = SinglePayloadQueue::new(
        WINDOW,
        NoDuplicates {
            calls: Arc::clone(&calls),
        },
    );

    let good = queue.enqueue(vec![4, 5]);
    let bad = queue.enqueue(vec![6, 6]);
    let (good, bad) = tokio::join!(good, bad);

    assert_eq!(good.unwrap(), 2);
    assert!(matches!(bad, Err(Error::Validation { reason }) if reason == "duplicate ids"));
    assert_eq!(*calls.lock(), vec![vec![4, 5]]);
}

#[tokio::test(start_paused = true)]
async fn payload_dispatch_failure_reaches_superseded_callers_too() {
    let queue = SinglePayloadQueue::new(WINDOW, |_payload: Vec<u32>| async move {
        Err::<(), _>(DispatchError::msg("unknown item 7"))
    });

    let a = queue.enqueue(vec![1]);
    let b = queue.enqueue(vec![7]);
    let (a, b) = tokio::join!(a, b);

    match (a, b) {
        (Err(Error::Dispatch(a)), Err(Error::Dispatch(b))) => {
            assert!(a.ptr_eq(&b));
            assert_eq!(a.to_string(), "unknown item 7");
        }
        other => panic!("expected uniform dispatch failures, got {other:?}"),
    }
}
