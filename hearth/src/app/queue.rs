//! Setup callback queue.
//!
//! Setup callbacks compose: every `setup()` call appends one, and they run
//! in registration order when the app initializes. The queue is drained
//! exactly once; after that it is closed and rejects further pushes.

use std::collections::VecDeque;
use std::fmt;

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::CallbackResult;

/// A deferred setup step.
pub type SetupFn = Box<dyn FnOnce(&mut Config) -> CallbackResult + Send>;

/// FIFO of setup callbacks that drains once.
pub struct CallbackQueue {
    inner: Mutex<QueueInner>,
}

struct QueueInner {
    pending: VecDeque<SetupFn>,
    drained: bool,
}

impl CallbackQueue {
    /// Create an open, empty queue.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                pending: VecDeque::new(),
                drained: false,
            }),
        }
    }

    /// Append a callback.
    ///
    /// Returns `false` (and drops the callback) if the queue was already
    /// drained.
    pub fn push(&self, callback: SetupFn) -> bool {
        let mut inner = self.inner.lock();
        if inner.drained {
            return false;
        }
        inner.pending.push_back(callback);
        true
    }

    /// Take every pending callback in FIFO order and close the queue.
    ///
    /// A second call returns an empty list.
    pub fn drain(&self) -> Vec<SetupFn> {
        let mut inner = self.inner.lock();
        inner.drained = true;
        inner.pending.drain(..).collect()
    }

    /// Number of callbacks waiting to run.
    pub fn len(&self) -> usize {
        self.inner.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the queue has been drained.
    pub fn is_drained(&self) -> bool {
        self.inner.lock().drained
    }
}

impl Default for CallbackQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CallbackQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("CallbackQueue")
            .field("pending", &inner.pending.len())
            .field("drained", &inner.drained)
            .finish()
    }
}
