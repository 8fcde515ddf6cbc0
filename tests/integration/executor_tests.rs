//! Executor behaviour under concurrent callers.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use consolefw::console::ExecStatus;

use super::mock_interp::mock_executor;

#[test]
fn concurrent_callers_never_overlap_or_interleave() {
    let (exec, tally) = mock_executor(5_000);
    let exec = Arc::new(exec);

    let workers: Vec<_> = (0..8)
        .map(|i| {
            let exec = Arc::clone(&exec);
            thread::spawn(move || {
                for j in 0..10 {
                    let words = format!("worker{i} round{j}");
                    let r = exec.execute(&format!("say {words}"));
                    assert_eq!(r.status, ExecStatus::Success);
                    assert_eq!(r.output.as_deref(), Some(words.as_str()));
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }

    assert_eq!(tally.calls(), 80);
    assert_eq!(tally.max_overlap(), 1);
}

#[test]
fn busy_callers_do_not_reach_interpreter() {
    let (exec, tally) = mock_executor(10);
    let exec = Arc::new(exec);

    let slow = {
        let exec = Arc::clone(&exec);
        thread::spawn(move || exec.execute("nap 400"))
    };
    while !exec.is_busy() {
        thread::yield_now();
    }

    let busy = Arc::new(AtomicUsize::new(0));
    let callers: Vec<_> = (0..4)
        .map(|_| {
            let exec = Arc::clone(&exec);
            let busy = Arc::clone(&busy);
            thread::spawn(move || {
                if exec.execute("say hi").status == ExecStatus::Busy {
                    busy.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();
    for c in callers {
        c.join().unwrap();
    }

    assert_eq!(busy.load(Ordering::SeqCst), 4);
    assert_eq!(slow.join().unwrap().status, ExecStatus::Success);
    assert_eq!(tally.calls(), 1);

    // Free again once the long command finished.
    assert_eq!(exec.execute("say back").output.as_deref(), Some("back"));
}

#[test]
fn exit_codes_and_unknown_commands() {
    let (exec, _) = mock_executor(200);
    assert_eq!(exec.execute("exit 0").status, ExecStatus::Success);
    assert_eq!(exec.execute("exit 7").status, ExecStatus::CommandError(7));
    let r = exec.execute("frobnicate");
    assert_eq!(r.status, ExecStatus::UnknownCommand);
    assert!(r.output.is_none());
}

#[test]
fn history_shared_across_callers() {
    let (exec, _) = mock_executor(200);
    exec.execute("say one");
    exec.execute("frobnicate");
    exec.execute("   ");
    assert_eq!(exec.history().entries(), ["say one", "frobnicate"]);
}
