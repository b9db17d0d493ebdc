//! Per-thread causal identifier tracking.
//!
//! Each probe occurrence takes one causal step: a fresh self id is issued
//! and the reported parent links it into the thread's trace graph. The two
//! step variants differ in what they report as the parent, and both are
//! intentional:
//!
//! - [`ContextTracker::advance`] (processing and field-write sites) reports
//!   the previously stored self id, so consecutive steps chain
//!   parent -> child.
//! - [`ContextTracker::advance_remote`] (remote-write sites) reports the
//!   previously stored *parent* id, so a remote write stays a sibling
//!   inside the branch that issued it rather than opening a new one.

use std::collections::HashMap;

use rand::RngCore;

use crate::event::CausalIds;

#[derive(Debug, Clone, Copy)]
struct CausalContext {
    self_id: u64,
    parent_id: u64,
}

#[derive(Debug, Default)]
pub(crate) struct ContextTracker {
    contexts: HashMap<u64, CausalContext>,
}

impl ContextTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Causal step, parent-replacement variant.
    pub fn advance(&mut self, thread: u64) -> CausalIds {
        let fresh = fresh_id();
        match self.contexts.get_mut(&thread) {
            None => {
                self.contexts.insert(thread, CausalContext { self_id: fresh, parent_id: 0 });
                CausalIds { self_id: fresh, parent_id: 0 }
            }
            Some(ctx) => {
                let parent = ctx.self_id;
                ctx.parent_id = parent;
                ctx.self_id = fresh;
                CausalIds { self_id: fresh, parent_id: parent }
            }
        }
    }

    /// Causal step, parent-preserving variant.
    pub fn advance_remote(&mut self, thread: u64) -> CausalIds {
        let fresh = fresh_id();
        match self.contexts.get_mut(&thread) {
            None => {
                self.contexts.insert(thread, CausalContext { self_id: fresh, parent_id: 0 });
                CausalIds { self_id: fresh, parent_id: 0 }
            }
            Some(ctx) => {
                let parent = ctx.parent_id;
                ctx.self_id = fresh;
                CausalIds { self_id: fresh, parent_id: parent }
            }
        }
    }

    /// Drop a thread's context once its outstanding depth returns to zero.
    pub fn clear(&mut self, thread: u64) {
        self.contexts.remove(&thread);
    }

    /// External reset: discard contexts leaked by threads whose exit never
    /// arrived.
    pub fn reset(&mut self) {
        self.contexts.clear();
    }
}

/// A 64-bit id from two independently perturbed pseudo-random draws.
/// Not cryptographic; collisions are merely improbable. Zero is reserved
/// for "no parent" and remapped away.
fn fresh_id() -> u64 {
    let mut rng = rand::rng();
    loop {
        let lo = rng.next_u32().wrapping_sub(1) as u64;
        let hi = (rng.next_u32().wrapping_add(1) as u64) << 32;
        let id = lo | hi;
        if id != 0 {
            return id;
        }
    }
}
