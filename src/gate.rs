//! One-shot readiness gate.
//!
//! Mirrors a document's `readyState`: while the gate is [`ReadyState::Loading`]
//! callbacks queue up; once it advances, each queued callback runs exactly
//! once, and callbacks registered later run immediately.
//!
//! The dev server holds every incoming request on a gate until the first build
//! has finished, so early requests are answered with real output instead of
//! 404s.
//!
//! ```
//! use simple_press::gate::{ReadyGate, ReadyState};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let gate = ReadyGate::new();
//! let hits = Arc::new(AtomicUsize::new(0));
//! let h = hits.clone();
//! gate.execute_when_ready(move || { h.fetch_add(1, Ordering::SeqCst); });
//! assert_eq!(hits.load(Ordering::SeqCst), 0);
//!
//! gate.advance(ReadyState::Complete);
//! assert_eq!(hits.load(Ordering::SeqCst), 1);
//! ```

use parking_lot::Mutex;

/// Readiness of whatever the gate guards. Only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    Loading,
    Interactive,
    Complete,
}

type Callback = Box<dyn FnOnce() + Send>;

struct Inner {
    state: ReadyState,
    pending: Vec<Callback>,
}

/// Runs each registered callback exactly once, now or when ready.
pub struct ReadyGate {
    inner: Mutex<Inner>,
}

impl ReadyGate {
    /// A gate in the `Loading` state.
    pub fn new() -> Self {
        Self::with_state(ReadyState::Loading)
    }

    pub fn with_state(state: ReadyState) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state,
                pending: Vec::new(),
            }),
        }
    }

    pub fn state(&self) -> ReadyState {
        self.inner.lock().state
    }

    /// Run `callback` now if the gate is past `Loading`, otherwise when it
    /// advances.
    ///
    /// An already-ready gate runs the callback on the calling thread before
    /// returning.
    pub fn execute_when_ready<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut inner = self.inner.lock();
        if inner.state != ReadyState::Loading {
            drop(inner);
            callback();
            return;
        }
        inner.pending.push(Box::new(callback));
    }

    /// Move the gate forward. Backward moves are ignored.
    ///
    /// Leaving `Loading` runs every queued callback on the calling thread,
    /// outside the lock.
    pub fn advance(&self, state: ReadyState) {
        let ready = {
            let mut inner = self.inner.lock();
            if state <= inner.state {
                return;
            }
            inner.state = state;
            if state == ReadyState::Loading {
                return;
            }
            std::mem::take(&mut inner.pending)
        };
        for callback in ready {
            callback();
        }
    }

    /// Number of callbacks still waiting.
    pub fn pending(&self) -> usize {
        self.inner.lock().pending.len()
    }
}

impl Default for ReadyGate {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ReadyGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("ReadyGate")
            .field("state", &inner.state)
            .field("pending", &inner.pending.len())
            .finish()
    }
}
