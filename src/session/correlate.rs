//! Recursion-safe pairing of entry and exit probe firings.
//!
//! Operations can reenter on the same thread (one occurrence synchronously
//! triggers another before it completes), so correlation keys on the
//! thread *and* its occurrence depth. Matching is strict LIFO: an exit
//! always pairs with the most recently pushed unmatched entry on its
//! thread, never an older one.

use std::collections::HashMap;

/// Per-thread stacks of in-flight call frames.
#[derive(Debug)]
pub(crate) struct CorrelationTable<T> {
    stacks: HashMap<u64, Vec<T>>,
}

impl<T> CorrelationTable<T> {
    pub fn new() -> Self {
        Self { stacks: HashMap::new() }
    }

    /// Record an entry. Returns the occurrence's 1-based depth.
    pub fn push(&mut self, thread: u64, frame: T) -> usize {
        let stack = self.stacks.entry(thread).or_default();
        stack.push(frame);
        stack.len()
    }

    /// Match an exit against the top of the thread's stack.
    ///
    /// Returns the matched frame and the depth remaining after the match.
    /// `None` means underflow or an unknown thread; the caller skips the
    /// exit without touching any other state. An emptied stack is removed.
    pub fn pop(&mut self, thread: u64) -> Option<(T, usize)> {
        let stack = self.stacks.get_mut(&thread)?;
        let frame = stack.pop()?;
        let remaining = stack.len();
        if remaining == 0 {
            self.stacks.remove(&thread);
        }
        Some((frame, remaining))
    }

    /// Outstanding depth for a thread.
    pub fn depth(&self, thread: u64) -> usize {
        self.stacks.get(&thread).map_or(0, Vec::len)
    }

    /// External reset: abandon frames whose exit never arrived.
    pub fn reset(&mut self) {
        self.stacks.clear();
    }
}
