// src/services/queue.rs

//! Work queues.
//!
//! Four priority FIFOs popped in order (`immediate`, `soon`, `normal`,
//! `later`), with at-least-once semantics left to the host. The optional
//! seen-set deduplicates by `(type, url)` so the crawler does not re-walk
//! cycles in the GitHub graph within a run.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use crate::models::{Priority, Request};

#[derive(Default)]
struct Lanes {
    immediate: VecDeque<Request>,
    soon: VecDeque<Request>,
    normal: VecDeque<Request>,
    later: VecDeque<Request>,
}

impl Lanes {
    fn lane(&mut self, priority: Priority) -> &mut VecDeque<Request> {
        match priority {
            Priority::Immediate => &mut self.immediate,
            Priority::Soon => &mut self.soon,
            Priority::Normal => &mut self.normal,
            Priority::Later => &mut self.later,
        }
    }

    fn pop(&mut self) -> Option<Request> {
        self.immediate
            .pop_front()
            .or_else(|| self.soon.pop_front())
            .or_else(|| self.normal.pop_front())
            .or_else(|| self.later.pop_front())
    }

    fn len(&self) -> usize {
        self.immediate.len() + self.soon.len() + self.normal.len() + self.later.len()
    }
}

/// In-memory priority queue of crawl requests.
pub struct InMemoryQueue {
    lanes: Mutex<Lanes>,
    seen: Option<Mutex<HashSet<(String, String)>>>,
}

impl InMemoryQueue {
    /// Queue without deduplication.
    pub fn new() -> Self {
        Self {
            lanes: Mutex::new(Lanes::default()),
            seen: None,
        }
    }

    /// Queue that accepts each `(type, url)` only once per run.
    pub fn with_dedup() -> Self {
        Self {
            lanes: Mutex::new(Lanes::default()),
            seen: Some(Mutex::new(HashSet::new())),
        }
    }

    fn accept(&self, request: &Request) -> bool {
        match &self.seen {
            Some(seen) => seen
                .lock()
                .expect("seen set poisoned")
                .insert((request.kind.clone(), request.url.clone())),
            None => true,
        }
    }

    /// Enqueue a single request at default priority.
    pub fn queue(&self, request: Request) {
        self.push(vec![request], Priority::Normal);
    }

    /// Bulk enqueue at an explicit priority.
    pub fn push(&self, requests: Vec<Request>, priority: Priority) {
        let mut lanes = self.lanes.lock().expect("queue lock poisoned");
        for request in requests {
            if self.accept(&request) {
                lanes.lane(priority).push_back(request);
            }
        }
    }

    /// Pop the next request in priority order.
    pub fn pop(&self) -> Option<Request> {
        self.lanes.lock().expect("queue lock poisoned").pop()
    }

    pub fn len(&self) -> usize {
        self.lanes.lock().expect("queue lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(kind: &str, url: &str) -> Request {
        Request::new(kind, url)
    }

    #[test]
    fn test_priority_order() {
        let queue = InMemoryQueue::new();
        queue.push(vec![request("a", "http://a")], Priority::Later);
        queue.push(vec![request("b", "http://b")], Priority::Normal);
        queue.push(vec![request("c", "http://c")], Priority::Immediate);
        queue.push(vec![request("d", "http://d")], Priority::Soon);

        let order: Vec<String> = std::iter::from_fn(|| queue.pop().map(|r| r.kind)).collect();
        assert_eq!(order, vec!["c", "d", "b", "a"]);
    }

    #[test]
    fn test_fifo_within_priority() {
        let queue = InMemoryQueue::new();
        queue.queue(request("a", "http://1"));
        queue.queue(request("a", "http://2"));
        assert_eq!(queue.pop().unwrap().url, "http://1");
        assert_eq!(queue.pop().unwrap().url, "http://2");
    }

    #[test]
    fn test_dedup() {
        let queue = InMemoryQueue::with_dedup();
        queue.queue(request("repo", "http://repo/12"));
        queue.queue(request("repo", "http://repo/12"));
        // Different type, same URL is a different unit of work.
        queue.queue(request("issues", "http://repo/12"));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_no_dedup_by_default() {
        let queue = InMemoryQueue::new();
        queue.queue(request("repo", "http://repo/12"));
        queue.queue(request("repo", "http://repo/12"));
        assert_eq!(queue.len(), 2);
    }
}
