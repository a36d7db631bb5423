use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("all slots taken and the wait queue is full")]
    Busy,
    #[error("deadline passed while waiting for a slot")]
    TimedOut,
}

#[derive(Debug, Default)]
struct GateState {
    active: usize,
    waiting: VecDeque<u64>,
    next_ticket: u64,
}

/// Counting semaphore with a bounded FIFO wait queue.
///
/// Callers are admitted strictly in arrival order: while anyone is queued,
/// a newcomer queues too, even if a slot is momentarily free.
#[derive(Debug)]
pub struct AdmissionGate {
    capacity: usize,
    queue_capacity: usize,
    state: Mutex<GateState>,
    changed: Condvar,
}

/// Held for the duration of one admitted call; dropping it frees the slot.
#[derive(Debug)]
pub struct Permit {
    gate: Arc<AdmissionGate>,
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.gate.release();
    }
}

impl AdmissionGate {
    pub fn new(capacity: usize, queue_capacity: usize) -> Self {
        Self {
            capacity,
            queue_capacity,
            state: Mutex::new(GateState::default()),
            changed: Condvar::new(),
        }
    }

    /// Takes a slot, waiting in line until `deadline` if none is free.
    pub fn acquire(self: &Arc<Self>, deadline: Instant) -> Result<Permit, AdmissionError> {
        let mut state = self.lock();
        if state.waiting.is_empty() && state.active < self.capacity {
            state.active += 1;
            return Ok(self.permit());
        }
        if state.waiting.len() >= self.queue_capacity {
            return Err(AdmissionError::Busy);
        }

        let ticket = state.next_ticket;
        state.next_ticket += 1;
        state.waiting.push_back(ticket);

        loop {
            if state.waiting.front() == Some(&ticket) && state.active < self.capacity {
                state.waiting.pop_front();
                state.active += 1;
                // the next in line may fit too
                self.changed.notify_all();
                return Ok(self.permit());
            }

            let now = Instant::now();
            if now >= deadline {
                state.waiting.retain(|&t| t != ticket);
                self.changed.notify_all();
                return Err(AdmissionError::TimedOut);
            }

            state = self
                .changed
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    pub fn in_flight(&self) -> usize {
        self.lock().active
    }

    pub fn queued(&self) -> usize {
        self.lock().waiting.len()
    }

    fn permit(self: &Arc<Self>) -> Permit {
        Permit {
            gate: Arc::clone(self),
        }
    }

    fn release(&self) {
        let mut state = self.lock();
        state.active = state.active.saturating_sub(1);
        drop(state);
        self.changed.notify_all();
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    fn gate(capacity: usize, queue: usize) -> Arc<AdmissionGate> {
        Arc::new(AdmissionGate::new(capacity, queue))
    }

    fn soon() -> Instant {
        Instant::now() + Duration::from_secs(5)
    }

    fn wait_until(mut condition: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(Instant::now() < deadline, "condition not reached in time");
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn test_admits_up_to_capacity() {
        let gate = gate(2, 0);
        let a = gate.acquire(soon()).unwrap();
        let _b = gate.acquire(soon()).unwrap();
        assert_eq!(gate.in_flight(), 2);
        assert_eq!(gate.acquire(soon()).unwrap_err(), AdmissionError::Busy);
        drop(a);
        assert_eq!(gate.in_flight(), 1);
        assert!(gate.acquire(soon()).is_ok());
    }

    #[test]
    fn test_full_queue_rejects() {
        let gate = gate(1, 1);
        let held = gate.acquire(soon()).unwrap();
        let waiter = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || gate.acquire(soon()).map(|_| ()))
        };
        wait_until(|| gate.queued() == 1);
        assert_eq!(gate.acquire(soon()).unwrap_err(), AdmissionError::Busy);
        drop(held);
        assert!(waiter.join().unwrap().is_ok());
    }

    #[test]
    fn test_waiter_times_out_and_leaves_queue() {
        let gate = gate(1, 4);
        let _held = gate.acquire(soon()).unwrap();
        let deadline = Instant::now() + Duration::from_millis(30);
        assert_eq!(gate.acquire(deadline).unwrap_err(), AdmissionError::TimedOut);
        assert_eq!(gate.queued(), 0);
    }

    #[test]
    fn test_waiters_admitted_in_arrival_order() {
        let gate = gate(1, 8);
        let held = gate.acquire(soon()).unwrap();
        let (order_tx, order_rx) = crossbeam_channel::unbounded();

        let mut handles = Vec::new();
        for id in 0..3 {
            let worker_gate = Arc::clone(&gate);
            let order_tx = order_tx.clone();
            handles.push(thread::spawn(move || {
                let permit = worker_gate.acquire(soon()).unwrap();
                order_tx.send(id).unwrap();
                thread::sleep(Duration::from_millis(5));
                drop(permit);
            }));
            wait_until(|| gate.queued() == id + 1);
        }

        drop(held);
        for h in handles {
            h.join().unwrap();
        }
        let order: Vec<usize> = order_rx.try_iter().collect();
        assert_eq!(order, vec![0, 1, 2]);
        assert_eq!(gate.in_flight(), 0);
    }
}
