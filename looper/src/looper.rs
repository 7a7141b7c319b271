//! Thread-confined dispatch loop and its explicit thread registry.

use crate::queue::MessageQueue;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};
use std::thread::{self, ThreadId};

struct RegistryState {
    loopers: HashMap<ThreadId, Arc<Looper>>,
    main: Option<Arc<Looper>>,
}

/// Explicit thread-id → looper map.
///
/// Replaces ambient thread-local storage: entries appear only through an
/// explicit [`Looper::prepare`] call and the whole registry can be torn
/// down with [`LooperRegistry::reset`], which tests use between runs.
/// All `Looper` associated functions operate on the process-wide
/// instance.
pub struct LooperRegistry {
    state: Mutex<RegistryState>,
}

impl LooperRegistry {
    fn new() -> Self {
        Self {
            state: Mutex::new(RegistryState {
                loopers: HashMap::new(),
                main: None,
            }),
        }
    }

    /// The process-wide registry, initialized on first use.
    pub fn process() -> &'static LooperRegistry {
        static REGISTRY: OnceLock<LooperRegistry> = OnceLock::new();
        REGISTRY.get_or_init(LooperRegistry::new)
    }

    /// Returns the looper bound to `thread`, if prepared.
    pub fn looper_for(&self, thread: ThreadId) -> Option<Arc<Looper>> {
        self.state.lock().unwrap().loopers.get(&thread).cloned()
    }

    /// Returns the designated main looper, if prepared.
    pub fn main_looper(&self) -> Option<Arc<Looper>> {
        self.state.lock().unwrap().main.clone()
    }

    /// Drops every registration, including the main looper (test teardown).
    pub fn reset(&self) {
        let mut state = self.state.lock().unwrap();
        state.loopers.clear();
        state.main = None;
    }

    fn register(&self, looper: Arc<Looper>, main: bool) {
        let mut state = self.state.lock().unwrap();
        if state.loopers.contains_key(&looper.thread_id) {
            drop(state);
            panic!("thread already has a looper; prepare() may only run once per thread");
        }
        if main {
            if state.main.is_some() {
                drop(state);
                panic!("the main looper has already been prepared");
            }
            state.main = Some(looper.clone());
        }
        state.loopers.insert(looper.thread_id, looper);
    }
}

/// Per-thread message dispatch driver.
///
/// A looper owns exactly one [`MessageQueue`] and is bound to the thread
/// that prepared it; only that thread may run the loop, while any thread
/// holding a [`Handler`](crate::handler::Handler) may produce into it.
pub struct Looper {
    queue: Arc<MessageQueue>,
    thread_id: ThreadId,
}

impl Looper {
    /// Creates and registers a looper for the calling thread.
    ///
    /// # Panics
    ///
    /// Panics if this thread already prepared a looper.
    pub fn prepare() -> Arc<Looper> {
        Self::prepare_inner(false)
    }

    /// Like [`Looper::prepare`], additionally marking the result as the
    /// process-wide main looper.
    ///
    /// # Panics
    ///
    /// Panics on double prepare or if a main looper already exists.
    pub fn prepare_main() -> Arc<Looper> {
        Self::prepare_inner(true)
    }

    fn prepare_inner(main: bool) -> Arc<Looper> {
        let looper = Arc::new(Looper {
            queue: Arc::new(MessageQueue::new()),
            thread_id: thread::current().id(),
        });
        LooperRegistry::process().register(looper.clone(), main);
        looper
    }

    /// Returns the calling thread's looper, if prepared.
    pub fn my_looper() -> Option<Arc<Looper>> {
        LooperRegistry::process().looper_for(thread::current().id())
    }

    /// Returns the main looper, retrievable from any thread.
    pub fn get_main_looper() -> Option<Arc<Looper>> {
        LooperRegistry::process().main_looper()
    }

    /// This looper's queue.
    pub fn queue(&self) -> &Arc<MessageQueue> {
        &self.queue
    }

    /// The thread this looper is bound to.
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    /// Runs the dispatch loop on the calling thread until the queue quits.
    ///
    /// Each iteration takes the next due message, dispatches it through
    /// its target handler, then recycles it. A slow handler stalls this
    /// entire timeline; that is the modeled behavior, not a defect.
    ///
    /// # Panics
    ///
    /// Panics when called from any thread other than the one that
    /// prepared this looper.
    pub fn run(&self) {
        if thread::current().id() != self.thread_id {
            panic!("Looper::run called off its owning thread");
        }
        while let Some(mut message) = self.queue.next() {
            match message.take_target() {
                Some(target) => target.dispatch_message(&mut message),
                None => {
                    // Unreachable through the public surface; enqueue
                    // rejects targetless messages.
                    tracing::error!(what = message.what, "dequeued message has no target");
                }
            }
            message.clear_in_use();
            message.recycle();
        }
    }

    /// Stops the loop, dropping all queued messages including due ones.
    pub fn quit(&self) {
        self.queue.quit(false);
    }

    /// Stops the loop once already-due messages have dispatched; only
    /// future-dated messages are discarded.
    pub fn quit_safely(&self) {
        self.queue.quit(true);
    }
}

impl fmt::Debug for Looper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Looper")
            .field("thread_id", &self.thread_id)
            .field("queued", &self.queue.len())
            .finish()
    }
}
