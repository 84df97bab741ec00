#![allow(missing_docs)]

use flowgraph::{
    edge::{make_edge, Receiver, Sender},
    executor::Executor,
    node::{
        BroadcastNode, FilterNode, FunctionNode, GeneratorNode, OverwriteNode, QueueNode,
        SourceNode,
    },
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

fn source_from_vec<T: Send + 'static>(
    executor: &Arc<Executor>,
    items: Vec<T>,
) -> Arc<SourceNode<T, impl FnMut() -> Option<T> + Send + 'static>> {
    let mut items = items.into_iter();
    SourceNode::new(Arc::clone(executor), move || items.next())
}

fn drain<T: Send + 'static>(sink: &Arc<QueueNode<T>>) -> Vec<T> {
    std::iter::from_fn(|| sink.try_get(None)).collect()
}

#[test]
fn character_spacing_pipeline() {
    let executor = Executor::new().expect("executor");
    let source = source_from_vec(&executor, vec!["ab".to_string(), "cd".to_string()]);
    let spacer = GeneratorNode::new(Arc::clone(&executor), |line: String| {
        let mut chars = line.chars().collect::<Vec<_>>().into_iter();
        move || chars.next().map(|c| format!("{c} "))
    });
    let sink = QueueNode::new();

    make_edge(&source, &spacer);
    make_edge(&spacer, &sink);

    source.activate();
    executor.wait_for_all();

    assert_eq!(drain(&sink).concat(), "a b c d ");
}

#[test]
fn filter_then_square() {
    let executor = Executor::new().expect("executor");
    let source = source_from_vec(&executor, vec![1, 2, 3, 4, 5]);
    let evens = FilterNode::new(|n: &i32| n % 2 == 0);
    let square = FunctionNode::new(Arc::clone(&executor), |n: i32| n * n);
    let sink = QueueNode::new();

    make_edge(&source, &evens);
    make_edge(&evens, &square);
    make_edge(&square, &sink);

    source.activate();
    executor.wait_for_all();

    assert_eq!(drain(&sink), vec![4, 16]);
}

#[test]
fn broadcast_fan_out() {
    let executor = Executor::new().expect("executor");
    let source = source_from_vec(&executor, vec![10, 20]);
    let fan = BroadcastNode::new();
    let left = QueueNode::new();
    let right = QueueNode::new();

    make_edge(&source, &fan);
    make_edge(&fan, &left);
    make_edge(&fan, &right);

    source.activate();
    executor.wait_for_all();

    assert_eq!(drain(&left), vec![10, 20]);
    assert_eq!(drain(&right), vec![10, 20]);
}

#[test]
fn overwrite_latch_semantics() {
    let cell = OverwriteNode::new();

    assert_eq!(cell.try_get(None), None);

    assert!(cell.try_put(1, None).is_ok());
    // Reading does not consume the slot.
    assert_eq!(cell.try_get(None), Some(1));
    assert_eq!(cell.try_get(None), Some(1));

    assert!(cell.try_put(2, None).is_ok());
    assert!(cell.try_put(3, None).is_ok());
    // Intermediate writes are lost; the latest wins.
    assert_eq!(cell.try_get(None), Some(3));
}

#[test]
fn overwrite_sampling_under_concurrency() {
    let cell = OverwriteNode::new();

    let writer = {
        let cell = Arc::clone(&cell);
        std::thread::spawn(move || {
            for n in [1, 2, 3] {
                cell.try_put(n, None).expect("overwrite always accepts");
            }
        })
    };
    let reader = {
        let cell = Arc::clone(&cell);
        std::thread::spawn(move || {
            let first = cell.try_get(None);
            let second = cell.try_get(None);
            (first, second)
        })
    };

    let (first, second) = reader.join().expect("reader");
    writer.join().expect("writer");

    for read in [first, second] {
        if let Some(n) = read {
            assert!((1..=3).contains(&n));
        }
    }
    if let (Some(a), Some(b)) = (first, second) {
        assert!(a <= b, "reads must be non-decreasing: {a} then {b}");
    }
    // Once the writer is done, the slot holds the final value.
    assert_eq!(cell.try_get(None), Some(3));
}

#[test]
fn generator_multi_yield() {
    let executor = Executor::new().expect("executor");
    let source = source_from_vec(&executor, vec![2u32, 3]);
    let expand = GeneratorNode::new(Arc::clone(&executor), |n: u32| {
        let mut next = 0;
        move || {
            next += 1;
            (next <= n).then_some(next)
        }
    });
    let sink = QueueNode::new();

    make_edge(&source, &expand);
    make_edge(&expand, &sink);

    source.activate();
    executor.wait_for_all();

    assert_eq!(drain(&sink), vec![1, 2, 1, 2, 3]);
}

#[test]
fn bare_generator_triggered_by_unit_put() {
    let executor = Executor::new().expect("executor");
    let ticks = GeneratorNode::new(Arc::clone(&executor), |(): ()| {
        let mut next = 0;
        move || {
            next += 1;
            (next <= 3).then_some(next)
        }
    });
    let sink = QueueNode::new();

    make_edge(&ticks, &sink);

    assert!(ticks.try_put((), None).is_ok());
    executor.wait_for_all();

    assert_eq!(drain(&sink), vec![1, 2, 3]);
}

#[test]
fn backpressure_without_loss() {
    const COUNT: i32 = 1000;

    let executor = Executor::new().expect("executor");
    let in_flight = Arc::new(AtomicUsize::new(0));
    let max_in_flight = Arc::new(AtomicUsize::new(0));

    let source = source_from_vec(&executor, (0..COUNT).collect());
    let keep_all = FilterNode::new(|_: &i32| true);
    let slow_identity = {
        let in_flight = Arc::clone(&in_flight);
        let max_in_flight = Arc::clone(&max_in_flight);
        FunctionNode::new(Arc::clone(&executor), move |n: i32| {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            max_in_flight.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_micros(50));
            in_flight.fetch_sub(1, Ordering::SeqCst);
            n
        })
    };
    let sink = QueueNode::new();

    make_edge(&source, &keep_all);
    make_edge(&keep_all, &slow_identity);
    make_edge(&slow_identity, &sink);

    source.activate();
    executor.wait_for_all();

    assert_eq!(drain(&sink), (0..COUNT).collect::<Vec<_>>());
    assert_eq!(
        max_in_flight.load(Ordering::SeqCst),
        1,
        "the transform must never run more than one body at a time"
    );
}

#[test]
fn queue_buffers_between_stages() {
    let executor = Executor::new().expect("executor");
    let source = source_from_vec(&executor, (0..100).collect());
    let buffer = QueueNode::new();
    let double = FunctionNode::new(Arc::clone(&executor), |n: i32| n * 2);
    let sink = QueueNode::new();

    make_edge(&source, &buffer);
    make_edge(&buffer, &double);
    make_edge(&double, &sink);

    source.activate();
    executor.wait_for_all();

    assert_eq!(drain(&sink), (0..100).map(|n| n * 2).collect::<Vec<_>>());
}

#[test]
fn overwrite_pushes_to_registered_successors() {
    let cell = OverwriteNode::new();
    let log = QueueNode::new();

    make_edge(&cell, &log);

    assert!(cell.try_put(7, None).is_ok());
    assert!(cell.try_put(8, None).is_ok());

    assert_eq!(drain(&log), vec![7, 8]);
    // The cell itself still latches the last value.
    assert_eq!(cell.try_get(None), Some(8));
}

#[test]
fn wait_for_all_is_reentrant_with_hold() {
    let executor = Executor::new().expect("executor");
    let hold = executor.hold();
    let released = Arc::new(AtomicUsize::new(0));
    {
        let released = Arc::clone(&released);
        executor.run(move || {
            released.fetch_add(1, Ordering::SeqCst);
        });
    }
    drop(hold);
    executor.wait_for_all();
    assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[test]
fn oversubscription_scope_is_advisory() {
    let executor = Executor::new().expect("executor");
    assert_eq!(executor.oversubscribed(), 0);
    {
        let _scope = executor.oversubscribe();
        assert_eq!(executor.oversubscribed(), 1);
    }
    assert_eq!(executor.oversubscribed(), 0);
}
