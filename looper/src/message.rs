//! Recyclable unit of scheduled work.

use crate::handler::Handler;
use parcel::Bundle;
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// A posted callback. `Arc` so producers keep an identity token they can
/// later pass to `remove_callbacks`.
pub type Runnable = Arc<dyn Fn() + Send + Sync>;

/// Upper bound on pooled messages kept for reuse.
const MAX_POOL_SIZE: usize = 50;

/// Process-wide message pool, guarded by a single lock.
static POOL: Mutex<Vec<Box<Message>>> = Mutex::new(Vec::new());

/// Monotonic sequence source; the tiebreak that keeps equal due times FIFO.
static NEXT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Returns the number of messages currently pooled (test observability).
pub fn pool_size() -> usize {
    POOL.lock().unwrap().len()
}

/// One schedulable unit of work.
///
/// A message is exclusively owned by whichever side currently holds it:
/// producer, queue, dispatching handler, then the pool. The `in_use` flag
/// marks queue/dispatch ownership; recycling while it is set is a
/// double-free-class programmer error and panics.
pub struct Message {
    /// User-defined message code.
    pub what: i32,
    /// First scalar argument.
    pub arg1: i32,
    /// Second scalar argument.
    pub arg2: i32,
    /// Arbitrary payload object.
    pub obj: Option<Box<dyn Any + Send>>,
    /// Structured payload data.
    pub data: Bundle,
    pub(crate) callback: Option<Runnable>,
    pub(crate) target: Option<Handler>,
    pub(crate) when: u64,
    pub(crate) seq: u64,
    pub(crate) in_use: bool,
}

impl Message {
    fn new() -> Box<Self> {
        Box::new(Self {
            what: 0,
            arg1: 0,
            arg2: 0,
            obj: None,
            data: Bundle::new(),
            callback: None,
            target: None,
            when: 0,
            seq: 0,
            in_use: false,
        })
    }

    /// Obtains a message from the pool, or allocates a fresh one.
    ///
    /// The sequence number is assigned here, monotonically across the
    /// process, so messages enqueued with equal due times dispatch in
    /// obtain/enqueue order.
    pub fn obtain() -> Box<Self> {
        let mut message = POOL.lock().unwrap().pop().unwrap_or_else(Message::new);
        message.seq = NEXT_SEQ.fetch_add(1, Ordering::Relaxed);
        message
    }

    /// Obtains a message prefilled with a code.
    pub fn obtain_what(what: i32) -> Box<Self> {
        let mut message = Message::obtain();
        message.what = what;
        message
    }

    /// Returns this message's absolute due time in uptime milliseconds.
    pub fn when(&self) -> u64 {
        self.when
    }

    /// Returns this message's allocation sequence number.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Returns whether a queue or dispatch currently owns this message.
    pub fn is_in_use(&self) -> bool {
        self.in_use
    }

    /// Returns the handler this message will be dispatched to, if set.
    pub fn target(&self) -> Option<&Handler> {
        self.target.as_ref()
    }

    pub(crate) fn set_target(&mut self, target: Handler) {
        self.target = Some(target);
    }

    pub(crate) fn take_target(&mut self) -> Option<Handler> {
        self.target.take()
    }

    pub(crate) fn set_callback(&mut self, callback: Runnable) {
        self.callback = Some(callback);
    }

    pub(crate) fn take_callback(&mut self) -> Option<Runnable> {
        self.callback.take()
    }

    pub(crate) fn mark_in_use(&mut self) {
        self.in_use = true;
    }

    pub(crate) fn clear_in_use(&mut self) {
        self.in_use = false;
    }

    /// Resets every field and returns this message to the pool.
    ///
    /// # Panics
    ///
    /// Panics if the message is still owned by a queue or mid-dispatch;
    /// recycling at that point would let two owners mutate one message.
    pub fn recycle(mut self: Box<Self>) {
        if self.in_use {
            panic!(
                "message (what={}, seq={}) recycled while still in use",
                self.what, self.seq
            );
        }
        self.what = 0;
        self.arg1 = 0;
        self.arg2 = 0;
        self.obj = None;
        self.data.clear();
        self.callback = None;
        self.target = None;
        self.when = 0;
        self.seq = 0;

        let mut pool = POOL.lock().unwrap();
        if pool.len() < MAX_POOL_SIZE {
            pool.push(self);
        }
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("what", &self.what)
            .field("arg1", &self.arg1)
            .field("arg2", &self.arg2)
            .field("when", &self.when)
            .field("seq", &self.seq)
            .field("in_use", &self.in_use)
            .field("has_callback", &self.callback.is_some())
            .field("has_target", &self.target.is_some())
            .finish()
    }
}
