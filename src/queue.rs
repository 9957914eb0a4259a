//! Bounded blocking queue shared by one producer and one consumer.
//!
//! `put` blocks while the queue is full, which is the backpressure that keeps
//! decoded batches from piling up in memory. `get` blocks while the queue is
//! empty and only reports the end of the stream once the producer has closed
//! the queue *and* every buffered item has been taken.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

/// Returned by `put` when the consumer cancelled the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueCancelled;

/// Thread-safe FIFO with a fixed capacity.
pub struct BoundedQueue<T> {
    state: Mutex<QueueState<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
    cancelled: bool,
    peak_len: usize,
    puts: u64,
    gets: u64,
}

impl<T> BoundedQueue<T> {
    /// Create a queue holding at most `capacity` items (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                closed: false,
                cancelled: false,
                peak_len: 0,
                puts: 0,
                gets: 0,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
        }
    }

    /// Enqueue `item`, blocking while the queue is full.
    pub fn put(&self, item: T) -> Result<(), QueueCancelled> {
        let mut state = self.state.lock().expect("bounded queue poisoned");
        while state.items.len() >= self.capacity && !state.cancelled {
            state = self.not_full.wait(state).expect("bounded queue poisoned");
        }
        if state.cancelled {
            return Err(QueueCancelled);
        }
        state.items.push_back(item);
        state.puts = state.puts.saturating_add(1);
        state.peak_len = state.peak_len.max(state.items.len());
        drop(state);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Dequeue the next item, blocking while the queue is empty.
    ///
    /// Returns `None` once the queue is closed and drained, or cancelled.
    pub fn get(&self) -> Option<T> {
        let mut state = self.state.lock().expect("bounded queue poisoned");
        loop {
            if state.cancelled {
                return None;
            }
            if let Some(item) = state.items.pop_front() {
                state.gets = state.gets.saturating_add(1);
                drop(state);
                self.not_full.notify_one();
                return Some(item);
            }
            if state.closed {
                return None;
            }
            state = self.not_empty.wait(state).expect("bounded queue poisoned");
        }
    }

    /// Producer-side completion signal; buffered items remain readable.
    pub fn close(&self) {
        let mut state = self.state.lock().expect("bounded queue poisoned");
        state.closed = true;
        drop(state);
        self.not_empty.notify_all();
    }

    /// Consumer-side abandonment: drops buffered items and fails pending `put`s.
    pub fn cancel(&self) {
        let mut state = self.state.lock().expect("bounded queue poisoned");
        state.cancelled = true;
        state.items.clear();
        drop(state);
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }

    /// Returns `true` once the producer closed the queue.
    pub fn is_closed(&self) -> bool {
        self.state.lock().expect("bounded queue poisoned").closed
    }

    /// Returns `true` once the consumer cancelled the queue.
    pub fn is_cancelled(&self) -> bool {
        self.state.lock().expect("bounded queue poisoned").cancelled
    }

    /// Number of items currently buffered.
    pub fn len(&self) -> usize {
        self.state.lock().expect("bounded queue poisoned").items.len()
    }

    /// Returns `true` when nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Highest number of items buffered at any point so far.
    pub fn peak_len(&self) -> usize {
        self.state.lock().expect("bounded queue poisoned").peak_len
    }

    /// Total successful `put` and `get` calls.
    pub fn transfer_counts(&self) -> (u64, u64) {
        let state = self.state.lock().expect("bounded queue poisoned");
        (state.puts, state.gets)
    }
}
