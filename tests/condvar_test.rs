/*!
 * Condition Variable Integration Tests
 *
 * Signal, broadcast and timed waits against the hybrid mutex
 */

use adaptive_lock::{
    HybridMutex, LockError, Mutex, NoRequeue, ParkingLotFutex, ParkingPrimitive, SeqCondvar,
};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

struct Shared<P: ParkingPrimitive> {
    mutex: HybridMutex<P>,
    cond: SeqCondvar<P>,
    /// Guarded by `mutex`
    tickets: AtomicUsize,
    inside: AtomicU32,
    done: AtomicUsize,
}

impl<P: ParkingPrimitive> Shared<P> {
    fn new() -> Self {
        Self {
            mutex: HybridMutex::new(),
            cond: SeqCondvar::new(),
            tickets: AtomicUsize::new(0),
            inside: AtomicU32::new(0),
            done: AtomicUsize::new(0),
        }
    }

    /// Wait until a ticket is available and consume it
    fn take_ticket(&self) {
        self.mutex.lock();
        while self.tickets.load(Ordering::Relaxed) == 0 {
            self.cond.wait(&self.mutex).unwrap();
        }
        assert_eq!(self.inside.fetch_add(1, Ordering::SeqCst), 0);
        self.tickets.fetch_sub(1, Ordering::Relaxed);
        self.done.fetch_add(1, Ordering::SeqCst);
        self.inside.fetch_sub(1, Ordering::SeqCst);
        self.mutex.unlock();
    }
}

fn run_signals<P: ParkingPrimitive + 'static>(waiters: usize) {
    let shared = Arc::new(Shared::<P>::new());

    let handles: Vec<_> = (0..waiters)
        .map(|_| {
            let shared = shared.clone();
            thread::spawn(move || shared.take_ticket())
        })
        .collect();

    thread::sleep(Duration::from_millis(50));
    for _ in 0..waiters {
        shared.mutex.lock();
        shared.tickets.fetch_add(1, Ordering::Relaxed);
        shared.cond.signal();
        shared.mutex.unlock();
    }

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(shared.done.load(Ordering::SeqCst), waiters);
}

fn run_broadcast<P: ParkingPrimitive + 'static>(waiters: usize) {
    let shared = Arc::new(Shared::<P>::new());

    let handles: Vec<_> = (0..waiters)
        .map(|_| {
            let shared = shared.clone();
            thread::spawn(move || shared.take_ticket())
        })
        .collect();

    thread::sleep(Duration::from_millis(100));
    shared.mutex.lock();
    shared.tickets.store(waiters, Ordering::Relaxed);
    shared.cond.broadcast();
    shared.mutex.unlock();

    for handle in handles {
        handle.join().unwrap();
    }
    // Each waiter held the mutex exactly once, never two at a time
    assert_eq!(shared.done.load(Ordering::SeqCst), waiters);
    assert_eq!(shared.tickets.load(Ordering::SeqCst), 0);
    assert!(!shared.mutex.is_locked());
}

#[test]
fn test_n_signals_release_n_waiters() {
    run_signals::<ParkingLotFutex>(6);
}

#[test]
fn test_n_signals_release_n_waiters_no_requeue() {
    run_signals::<NoRequeue<ParkingLotFutex>>(6);
}

#[test]
fn test_broadcast_requeue() {
    run_broadcast::<ParkingLotFutex>(8);
}

#[test]
fn test_broadcast_wake_all_fallback() {
    run_broadcast::<NoRequeue<ParkingLotFutex>>(8);
}

#[test]
fn test_timed_wait_returns_after_deadline_holding_mutex() {
    let shared = Arc::new(Shared::<ParkingLotFutex>::new());
    shared.mutex.lock();

    let start = Instant::now();
    let deadline = start + Duration::from_millis(30);
    let result = shared.cond.wait_until(&shared.mutex, deadline);

    assert_eq!(result, Err(LockError::TimedOut));
    assert!(Instant::now() >= deadline);

    // Another thread cannot take the mutex: the waiter holds it again
    let other = shared.clone();
    let busy = thread::spawn(move || other.mutex.try_lock()).join().unwrap();
    assert_eq!(busy, Err(LockError::Busy));
    shared.mutex.unlock();
}

#[test]
fn test_timed_wait_signalled_before_deadline() {
    let shared = Arc::new(Shared::<ParkingLotFutex>::new());
    let waiter = {
        let shared = shared.clone();
        thread::spawn(move || {
            shared.mutex.lock();
            let result = shared.cond.wait_timeout(&shared.mutex, Duration::from_secs(5));
            shared.mutex.unlock();
            result
        })
    };

    thread::sleep(Duration::from_millis(50));
    shared.mutex.lock();
    shared.cond.signal();
    shared.mutex.unlock();

    assert_eq!(waiter.join().unwrap(), Ok(()));
}

#[test]
fn test_wrong_mutex_rejected() {
    let first: HybridMutex = HybridMutex::new();
    let second: HybridMutex = HybridMutex::new();
    let cond: SeqCondvar = SeqCondvar::new();

    first.lock();
    let _ = cond.wait_timeout(&first, Duration::from_millis(1));
    first.unlock();

    second.lock();
    assert_eq!(cond.wait(&second), Err(LockError::InvalidArgument));
    assert!(second.is_locked());
    second.unlock();
}

#[test]
fn test_guard_producer_consumer() {
    let queue = Arc::new((Mutex::new(Vec::<u32>::new()), SeqCondvar::<ParkingLotFutex>::new()));

    let consumer = {
        let queue = queue.clone();
        thread::spawn(move || {
            let (lock, cond) = &*queue;
            let mut received = Vec::new();
            let mut items = lock.lock();
            while received.len() < 100 {
                while items.is_empty() {
                    cond.wait_guard(&mut items).unwrap();
                }
                received.append(&mut items);
            }
            received
        })
    };

    let (lock, cond) = &*queue;
    for i in 0..100 {
        lock.lock().push(i);
        cond.signal();
    }

    let received = consumer.join().unwrap();
    assert_eq!(received, (0..100).collect::<Vec<_>>());
}
