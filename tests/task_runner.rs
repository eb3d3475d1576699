use std::{
    sync::atomic::{AtomicUsize, Ordering},
    thread,
    time::Duration,
};

use anyhow::anyhow;
use superstep::concurrency::{
    Concurrency, RunCompletion, StopSignal, TaskError, TaskRunner, TerminationFlag, WorkerPool,
};

fn pool() -> WorkerPool {
    WorkerPool::new(4).unwrap()
}

fn runner(pool: &WorkerPool, concurrency: usize) -> TaskRunner<'_> {
    TaskRunner::new(pool, Concurrency::new(concurrency).unwrap(), TerminationFlag::running())
}

#[test]
fn runs_every_task_once() {
    let pool = pool();
    let counter = AtomicUsize::new(0);
    let tasks: Vec<_> = (0..100)
        .map(|_| {
            let counter = &counter;
            move |_: &StopSignal| -> Result<(), anyhow::Error> {
                counter.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
        })
        .collect();

    let completion = runner(&pool, 3).run(tasks).unwrap();
    assert_eq!(completion, RunCompletion::Finished);
    assert_eq!(counter.load(Ordering::Relaxed), 100);
}

#[test]
fn in_flight_tasks_never_exceed_concurrency() {
    let pool = pool();
    let running = AtomicUsize::new(0);
    let peak = AtomicUsize::new(0);
    let tasks: Vec<_> = (0..20)
        .map(|_| {
            let (running, peak) = (&running, &peak);
            move |_: &StopSignal| -> Result<(), anyhow::Error> {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(2));
                running.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .collect();

    runner(&pool, 2).run(tasks).unwrap();
    assert!(peak.load(Ordering::SeqCst) <= 2);
}

#[test]
fn first_error_is_returned_and_cancels_the_rest() {
    let pool = pool();
    let started = AtomicUsize::new(0);
    let steps_before_failure = AtomicUsize::new(0);
    let tasks: Vec<_> = (0..100)
        .map(|i| {
            let started = &started;
            let steps_before_failure = &steps_before_failure;
            move |stop: &StopSignal| -> Result<(), anyhow::Error> {
                started.fetch_add(1, Ordering::Relaxed);
                for step in 0..50 {
                    if stop.should_stop() {
                        return Ok(());
                    }
                    if i == 7 && step == 5 {
                        return Err(anyhow!("task seven failed"));
                    }
                    if i == 7 {
                        steps_before_failure.fetch_add(1, Ordering::Relaxed);
                    }
                    thread::sleep(Duration::from_micros(100));
                }
                Ok(())
            }
        })
        .collect();

    let error = runner(&pool, 2).run(tasks).unwrap_err();
    assert_eq!(error.task(), 7);
    match error {
        TaskError::Failed { error, .. } => assert_eq!(error.to_string(), "task seven failed"),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(steps_before_failure.load(Ordering::Relaxed), 5);
    assert!(started.load(Ordering::Relaxed) < 100);
}

#[test]
fn panics_are_captured() {
    let pool = pool();
    let tasks: Vec<Box<dyn FnOnce(&StopSignal) -> Result<(), anyhow::Error> + Send>> = vec![
        Box::new(|_| Ok(())),
        Box::new(|_| panic!("boom")),
    ];

    // Boxed closures implement `Task` through the blanket `FnOnce` impl.
    let error = runner(&pool, 1).run(tasks).unwrap_err();
    match error {
        TaskError::Panicked { task, message } => {
            assert_eq!(task, 1);
            assert_eq!(message, "boom");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn termination_is_a_completion_not_an_error() {
    let pool = pool();
    let termination = TerminationFlag::running();
    let runner = TaskRunner::new(&pool, Concurrency::SINGLE, termination.clone());
    let ran = AtomicUsize::new(0);
    let tasks: Vec<_> = (0..10)
        .map(|i| {
            let (ran, termination) = (&ran, &termination);
            move |_: &StopSignal| -> Result<(), anyhow::Error> {
                ran.fetch_add(1, Ordering::Relaxed);
                if i == 2 {
                    termination.terminate();
                }
                Ok(())
            }
        })
        .collect();

    assert_eq!(runner.run(tasks).unwrap(), RunCompletion::Cancelled);
    assert_eq!(ran.load(Ordering::Relaxed), 3);
}

#[test]
fn empty_batch_finishes() {
    let pool = pool();
    let tasks: Vec<fn(&StopSignal) -> Result<(), anyhow::Error>> = Vec::new();
    assert_eq!(runner(&pool, 4).run(tasks).unwrap(), RunCompletion::Finished);
}
