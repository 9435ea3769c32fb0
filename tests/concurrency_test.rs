// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Concurrency tests for the ledger engine.
//!
//! These verify the serialization guarantees: no lost updates under
//! contention on one user, no oversell past a zero balance, isolation
//! across users, and deadlock freedom under mixed load.
//!
//! Deadlock checks use parking_lot's built-in detector (enabled through the
//! `deadlock_detection` dev feature) to find cycles in the lock graph.

use parking_lot::deadlock;
use point_ledger_rs::{LedgerError, PointEngine, TransactionKind, UserId, history::replay};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread;
use std::time::Duration;

// === Deadlock Detection Infrastructure ===

/// Starts a background thread that checks for deadlocks.
/// Returns a handle to stop the detector.
fn start_deadlock_detector() -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();

    thread::spawn(move || {
        while running_clone.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(100));
            let deadlocks = deadlock::check_deadlock();
            if !deadlocks.is_empty() {
                eprintln!("\n=== DEADLOCK DETECTED ===");
                for (i, threads) in deadlocks.iter().enumerate() {
                    eprintln!("\nDeadlock #{}", i + 1);
                    for t in threads {
                        eprintln!("Thread ID: {:?}", t.thread_id());
                        eprintln!("Backtrace:\n{:#?}", t.backtrace());
                    }
                }
                panic!("Deadlock detected! See output above for details.");
            }
        }
    });

    running
}

/// Stops the deadlock detector.
fn stop_deadlock_detector(running: Arc<AtomicBool>) {
    running.store(false, Ordering::SeqCst);
    thread::sleep(Duration::from_millis(150)); // Let detector thread exit
}

// === Tests ===

/// N concurrent unit charges on one user must all land: final balance N,
/// history length N, no lost updates.
#[test]
fn concurrent_unit_charges_lose_no_updates() {
    const NUM_THREADS: usize = 100;

    let engine = Arc::new(PointEngine::new());
    let mut handles = Vec::with_capacity(NUM_THREADS);

    for _ in 0..NUM_THREADS {
        let engine = engine.clone();
        handles.push(thread::spawn(move || {
            engine.charge(UserId(1), 1).unwrap();
        }));
    }

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    let point = engine.get_balance(UserId(1)).unwrap();
    assert_eq!(point.balance, NUM_THREADS as i64);

    let history = engine.get_history(UserId(1)).unwrap();
    assert_eq!(history.len(), NUM_THREADS);
    assert!(history.iter().all(|e| e.kind == TransactionKind::Charge));
    assert!(history.windows(2).all(|w| w[0].id < w[1].id));
}

/// Concurrent uses against a fixed balance: exactly the affordable number
/// succeed, the rest fail with InsufficientFunds, and the balance never
/// goes negative.
#[test]
fn concurrent_uses_never_oversell() {
    const NUM_THREADS: usize = 20;

    let engine = Arc::new(PointEngine::new());
    engine.charge(UserId(1), 100).unwrap();

    let mut handles = Vec::with_capacity(NUM_THREADS);
    for _ in 0..NUM_THREADS {
        let engine = engine.clone();
        handles.push(thread::spawn(move || engine.use_points(UserId(1), 10)));
    }

    let results: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("Thread panicked"))
        .collect();

    let successes = results.iter().filter(|r| r.is_ok()).count();
    let rejections = results
        .iter()
        .filter(|r| matches!(r, Err(LedgerError::InsufficientFunds { .. })))
        .count();

    assert_eq!(successes, 10, "exactly 100/10 uses can succeed");
    assert_eq!(rejections, NUM_THREADS - 10);

    assert_eq!(engine.get_balance(UserId(1)).unwrap().balance, 0);
    // 1 charge + 10 successful uses; rejected uses write nothing.
    assert_eq!(engine.get_history(UserId(1)).unwrap().len(), 11);
}

/// Interleaved charges and uses must keep replay(history) == balance and
/// every prefix of the history non-negative.
#[test]
fn mixed_operations_keep_replay_invariant() {
    const NUM_THREADS: usize = 50;
    const OPS_PER_THREAD: usize = 40;

    let engine = Arc::new(PointEngine::new());
    let mut handles = Vec::with_capacity(NUM_THREADS);

    for thread_id in 0..NUM_THREADS {
        let engine = engine.clone();
        handles.push(thread::spawn(move || {
            for i in 0..OPS_PER_THREAD {
                if (thread_id + i) % 3 == 0 {
                    let _ = engine.use_points(UserId(1), 5);
                } else {
                    engine.charge(UserId(1), 3).unwrap();
                }
            }
        }));
    }

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    let balance = engine.get_balance(UserId(1)).unwrap().balance;
    let history = engine.get_history(UserId(1)).unwrap();

    assert!(balance >= 0);
    assert_eq!(replay(&history), balance);

    // No prefix of the committed sequence may dip below zero.
    let mut running = 0i64;
    for entry in &history {
        running += entry.kind.signed(entry.amount);
        assert!(running >= 0, "balance went negative mid-history");
    }
}

/// Operations on user A never leak into user B's balance or history.
#[test]
fn users_are_isolated_under_concurrency() {
    const NUM_USERS: i64 = 10;
    const CHARGES_PER_USER: usize = 50;

    let engine = Arc::new(PointEngine::new());
    let mut handles = Vec::new();

    for user in 1..=NUM_USERS {
        let engine = engine.clone();
        handles.push(thread::spawn(move || {
            for _ in 0..CHARGES_PER_USER {
                engine.charge(UserId(user), user).unwrap();
            }
        }));
    }

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    for user in 1..=NUM_USERS {
        let point = engine.get_balance(UserId(user)).unwrap();
        assert_eq!(point.balance, user * CHARGES_PER_USER as i64);

        let history = engine.get_history(UserId(user)).unwrap();
        assert_eq!(history.len(), CHARGES_PER_USER);
        assert!(history.iter().all(|e| e.user_id == UserId(user)));
    }
}

/// Readers running alongside writers must only ever observe committed,
/// non-negative state.
#[test]
fn readers_observe_only_committed_state() {
    let engine = Arc::new(PointEngine::new());
    let running = Arc::new(AtomicBool::new(true));
    let mut handles = Vec::new();

    // Writers: charge then use, keeping the balance oscillating.
    for _ in 0..4 {
        let engine = engine.clone();
        let running = running.clone();
        handles.push(thread::spawn(move || {
            while running.load(Ordering::SeqCst) {
                engine.charge(UserId(1), 7).unwrap();
                let _ = engine.use_points(UserId(1), 7);
            }
        }));
    }

    // Readers: snapshots must always be consistent on their own.
    for _ in 0..4 {
        let engine = engine.clone();
        let running = running.clone();
        handles.push(thread::spawn(move || {
            while running.load(Ordering::SeqCst) {
                let point = engine.get_balance(UserId(1)).unwrap();
                assert!(point.balance >= 0);

                let history = engine.get_history(UserId(1)).unwrap();
                assert!(replay(&history) >= 0);
                assert!(history.windows(2).all(|w| w[0].id < w[1].id));
            }
        }));
    }

    thread::sleep(Duration::from_millis(300));
    running.store(false, Ordering::SeqCst);

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    let balance = engine.get_balance(UserId(1)).unwrap().balance;
    let history = engine.get_history(UserId(1)).unwrap();
    assert_eq!(replay(&history), balance);
}

/// High contention mixed load across users with the deadlock detector
/// running; every thread must complete.
#[test]
fn no_deadlock_under_mixed_load() {
    let detector = start_deadlock_detector();
    let engine = Arc::new(PointEngine::new());
    let completed = Arc::new(AtomicU32::new(0));

    const NUM_THREADS: usize = 50;
    const NUM_USERS: i64 = 8;
    const OPS_PER_THREAD: usize = 100;

    let mut handles = Vec::with_capacity(NUM_THREADS);

    for thread_id in 0..NUM_THREADS {
        let engine = engine.clone();
        let completed = completed.clone();

        handles.push(thread::spawn(move || {
            for i in 0..OPS_PER_THREAD {
                let user = UserId(((thread_id + i) as i64 % NUM_USERS) + 1);

                match i % 4 {
                    0 => {
                        engine.charge(user, 10).unwrap();
                    }
                    1 => {
                        let _ = engine.use_points(user, 4);
                    }
                    2 => {
                        let _ = engine.get_balance(user).unwrap();
                    }
                    _ => {
                        let _ = engine.get_history(user).unwrap();
                    }
                }
            }
            completed.fetch_add(1, Ordering::SeqCst);
        }));
    }

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    stop_deadlock_detector(detector);

    assert_eq!(completed.load(Ordering::SeqCst), NUM_THREADS as u32);

    for user in 1..=NUM_USERS {
        let balance = engine.get_balance(UserId(user)).unwrap().balance;
        let history = engine.get_history(UserId(user)).unwrap();
        assert!(balance >= 0);
        assert_eq!(replay(&history), balance);
    }
}

/// Rapid lock acquire/release cycles on a handful of users.
#[test]
fn no_deadlock_rapid_lock_cycling() {
    let detector = start_deadlock_detector();
    let engine = Arc::new(PointEngine::new());

    const NUM_THREADS: usize = 20;
    const CYCLES_PER_THREAD: usize = 1000;

    let mut handles = Vec::with_capacity(NUM_THREADS);

    for thread_id in 0..NUM_THREADS {
        let engine = engine.clone();

        handles.push(thread::spawn(move || {
            let user = UserId((thread_id as i64 % 5) + 1);

            for _ in 0..CYCLES_PER_THREAD {
                engine.charge(user, 1).unwrap();
                let _ = engine.get_balance(user).unwrap();
            }
        }));
    }

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    stop_deadlock_detector(detector);

    let total: i64 = engine
        .balances()
        .iter()
        .map(|point| point.balance)
        .sum();
    assert_eq!(total, (NUM_THREADS * CYCLES_PER_THREAD) as i64);
}
