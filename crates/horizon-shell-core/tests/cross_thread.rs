//! Integration tests for marshaling signal traffic onto a UI-affine thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use horizon_shell_core::{DispatchError, Signal, ThreadAffinity, UiDispatcher};
use parking_lot::Mutex;

/// Spawn a thread that owns a dispatcher and runs it until closed.
fn spawn_ui_thread() -> (UiDispatcher, std::thread::JoinHandle<()>) {
    let (tx, rx) = crossbeam_channel::bounded(1);
    let handle = std::thread::spawn(move || {
        let dispatcher = UiDispatcher::new();
        let _scope = dispatcher.install();
        tx.send(dispatcher.clone()).unwrap();
        dispatcher.run();
    });
    (rx.recv().unwrap(), handle)
}

#[test]
fn worker_results_are_emitted_on_the_ui_thread() {
    let (dispatcher, ui_thread) = spawn_ui_thread();
    let ui_affinity = dispatcher.send(ThreadAffinity::current).unwrap();

    let finished = Arc::new(Signal::<u32>::new());
    let observed = Arc::new(Mutex::new(Vec::new()));
    {
        let observed = observed.clone();
        finished.connect(move |&value| {
            observed.lock().push((value, ui_affinity.is_same_thread()));
        });
    }

    let workers: Vec<_> = (0..4)
        .map(|n| {
            let dispatcher = dispatcher.clone();
            let finished = finished.clone();
            std::thread::spawn(move || {
                let result = n * 10;
                dispatcher.post(move || finished.emit(result)).unwrap();
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    // A blocking send is ordered after every post that preceded it.
    dispatcher.send(|| ()).unwrap();

    let mut observed = observed.lock().clone();
    observed.sort();
    assert_eq!(observed, vec![(0, true), (10, true), (20, true), (30, true)]);

    dispatcher.close();
    ui_thread.join().unwrap();
}

#[test]
fn send_after_teardown_degrades_to_error() {
    let (dispatcher, ui_thread) = spawn_ui_thread();
    dispatcher.close();
    ui_thread.join().unwrap();

    assert_eq!(dispatcher.send(|| 1), Err(DispatchError::ContextClosed));
    assert!(!dispatcher.marshal(|| ()));
}

#[test]
fn marshal_from_ui_thread_runs_inline() {
    let (dispatcher, ui_thread) = spawn_ui_thread();
    let inline_runs = Arc::new(AtomicUsize::new(0));

    let inner = dispatcher.clone();
    let counter = inline_runs.clone();
    let ran_inline = dispatcher
        .send(move || {
            let before = counter.load(Ordering::SeqCst);
            let counter_inner = counter.clone();
            inner.marshal(move || {
                counter_inner.fetch_add(1, Ordering::SeqCst);
            });
            counter.load(Ordering::SeqCst) == before + 1
        })
        .unwrap();
    assert!(ran_inline);

    dispatcher.close();
    ui_thread.join().unwrap();
    assert_eq!(inline_runs.load(Ordering::SeqCst), 1);
}
