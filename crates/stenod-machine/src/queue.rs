use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};
use stenod_chord::Chord;

pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

struct Inner {
    items: VecDeque<Chord>,
    closed: bool,
}

/// Bounded FIFO between the protocol poller (sole producer) and the
/// translation driver (sole consumer). Blocking push and pop with
/// separate not-full / not-empty condvars; `close` wakes every waiter
/// and lets the consumer drain what remains.
pub struct ChordQueue {
    inner: Mutex<Inner>,
    capacity: usize,
    not_full: Condvar,
    not_empty: Condvar,
}

impl ChordQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            capacity,
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().items.is_empty()
    }

    /// Block until there is room; returns `false` if the queue closed.
    pub fn push(&self, chord: Chord) -> bool {
        let mut inner = self.inner.lock();
        while inner.items.len() >= self.capacity && !inner.closed {
            self.not_full.wait(&mut inner);
        }
        if inner.closed {
            return false;
        }
        inner.items.push_back(chord);
        drop(inner);
        self.not_empty.notify_one();
        true
    }

    pub fn try_push(&self, chord: Chord) -> bool {
        let mut inner = self.inner.lock();
        if inner.closed || inner.items.len() >= self.capacity {
            return false;
        }
        inner.items.push_back(chord);
        drop(inner);
        self.not_empty.notify_one();
        true
    }

    /// Block until an item arrives; `None` once the queue is closed and
    /// drained.
    pub fn pop(&self) -> Option<Chord> {
        let mut inner = self.inner.lock();
        while inner.items.is_empty() && !inner.closed {
            self.not_empty.wait(&mut inner);
        }
        let item = inner.items.pop_front();
        drop(inner);
        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    pub fn try_pop(&self) -> Option<Chord> {
        let mut inner = self.inner.lock();
        let item = inner.items.pop_front();
        drop(inner);
        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    pub fn close(&self) {
        self.inner.lock().closed = true;
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn chord(s: &str) -> Chord {
        Chord::parse(s).unwrap()
    }

    #[test]
    fn fifo_order() {
        let queue = ChordQueue::new(8);
        for s in ["S", "T", "K"] {
            assert!(queue.push(chord(s)));
        }
        assert_eq!(queue.pop(), Some(chord("S")));
        assert_eq!(queue.pop(), Some(chord("T")));
        assert_eq!(queue.pop(), Some(chord("K")));
    }

    #[test]
    fn try_push_fails_when_full() {
        let queue = ChordQueue::new(2);
        assert!(queue.try_push(chord("S")));
        assert!(queue.try_push(chord("T")));
        assert!(!queue.try_push(chord("K")));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn try_pop_on_empty_is_none() {
        let queue = ChordQueue::new(2);
        assert_eq!(queue.try_pop(), None);
    }

    #[test]
    fn pop_blocks_until_push() {
        let queue = Arc::new(ChordQueue::new(4));
        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                queue.push(chord("KAT"));
            })
        };
        assert_eq!(queue.pop(), Some(chord("KAT")));
        producer.join().unwrap();
    }

    #[test]
    fn push_blocks_until_pop() {
        let queue = Arc::new(ChordQueue::new(1));
        assert!(queue.push(chord("S")));
        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.push(chord("T")))
        };
        thread::sleep(Duration::from_millis(20));
        assert_eq!(queue.pop(), Some(chord("S")));
        assert!(producer.join().unwrap());
        assert_eq!(queue.pop(), Some(chord("T")));
    }

    #[test]
    fn close_wakes_blocked_consumer() {
        let queue = Arc::new(ChordQueue::new(4));
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop())
        };
        thread::sleep(Duration::from_millis(20));
        queue.close();
        assert_eq!(consumer.join().unwrap(), None);
    }

    #[test]
    fn close_lets_consumer_drain() {
        let queue = ChordQueue::new(4);
        queue.push(chord("S"));
        queue.close();
        assert!(!queue.push(chord("T")));
        assert_eq!(queue.pop(), Some(chord("S")));
        assert_eq!(queue.pop(), None);
    }
}
