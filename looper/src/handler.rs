//! Client-facing API for sending and receiving scheduled messages.

use crate::looper::Looper;
use crate::message::{Message, Runnable};
use crate::time::uptime_millis;
use std::fmt;
use std::sync::Arc;

/// Receiver of dispatched messages; the last step of dispatch precedence.
pub trait HandleMessage: Send + Sync {
    /// Handles one message on the looper thread.
    fn handle_message(&self, message: &mut Message);
}

/// Handler-level callback; returning `true` stops dispatch before the
/// [`HandleMessage`] delegate runs.
pub type HandlerCallback = Arc<dyn Fn(&mut Message) -> bool + Send + Sync>;

struct HandlerInner {
    looper: Arc<Looper>,
    callback: Option<HandlerCallback>,
    delegate: Option<Arc<dyn HandleMessage>>,
}

/// Cloneable handle bound to one looper.
///
/// Multiple handlers may share a looper and interleave on its single
/// timeline; clones of one handler are the same handler for message
/// removal purposes.
#[derive(Clone)]
pub struct Handler {
    inner: Arc<HandlerInner>,
}

impl Handler {
    /// Creates a handler that drops messages reaching the delegate step.
    pub fn new(looper: Arc<Looper>) -> Self {
        Self::build(looper, None, None)
    }

    /// Creates a handler with a dispatch callback.
    pub fn with_callback<F>(looper: Arc<Looper>, callback: F) -> Self
    where
        F: Fn(&mut Message) -> bool + Send + Sync + 'static,
    {
        Self::build(looper, Some(Arc::new(callback)), None)
    }

    /// Creates a handler dispatching to `delegate`.
    pub fn with_delegate(looper: Arc<Looper>, delegate: Arc<dyn HandleMessage>) -> Self {
        Self::build(looper, None, Some(delegate))
    }

    /// Creates a handler bound to the calling thread's looper.
    ///
    /// # Panics
    ///
    /// Panics with a "no Looper" error if the thread has not called
    /// [`Looper::prepare`].
    pub fn current() -> Self {
        Self::new(Self::require_current_looper())
    }

    /// Like [`Handler::current`], dispatching to `delegate`.
    pub fn current_with_delegate(delegate: Arc<dyn HandleMessage>) -> Self {
        Self::with_delegate(Self::require_current_looper(), delegate)
    }

    fn require_current_looper() -> Arc<Looper> {
        Looper::my_looper().unwrap_or_else(|| {
            panic!("no Looper on this thread; Looper::prepare() must be called first")
        })
    }

    fn build(
        looper: Arc<Looper>,
        callback: Option<HandlerCallback>,
        delegate: Option<Arc<dyn HandleMessage>>,
    ) -> Self {
        Self {
            inner: Arc::new(HandlerInner {
                looper,
                callback,
                delegate,
            }),
        }
    }

    /// The looper this handler posts into.
    pub fn looper(&self) -> &Arc<Looper> {
        &self.inner.looper
    }

    pub(crate) fn same_handler(&self, other: &Handler) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Runs the fixed dispatch precedence for one message:
    /// message-attached runnable, then the handler callback (stopping if
    /// it reports handled), then the [`HandleMessage`] delegate.
    pub fn dispatch_message(&self, message: &mut Message) {
        if let Some(runnable) = message.take_callback() {
            (*runnable)();
            return;
        }
        if let Some(callback) = self.inner.callback.as_deref() {
            if callback(message) {
                return;
            }
        }
        if let Some(delegate) = &self.inner.delegate {
            delegate.handle_message(message);
        }
    }

    // ===== Message factories =====

    /// Obtains a pooled message already targeted at this handler.
    pub fn obtain_message(&self) -> Box<Message> {
        let mut message = Message::obtain();
        message.set_target(self.clone());
        message
    }

    /// Obtains a targeted message with a code.
    pub fn obtain_message_what(&self, what: i32) -> Box<Message> {
        let mut message = self.obtain_message();
        message.what = what;
        message
    }

    /// Obtains a targeted message with a code and scalar arguments.
    pub fn obtain_message_args(&self, what: i32, arg1: i32, arg2: i32) -> Box<Message> {
        let mut message = self.obtain_message_what(what);
        message.arg1 = arg1;
        message.arg2 = arg2;
        message
    }

    // ===== Send side =====

    fn enqueue(&self, mut message: Box<Message>, when: u64) -> bool {
        message.when = when;
        message.set_target(self.clone());
        self.inner.looper.queue().enqueue_message(message)
    }

    /// Enqueues `message` due now.
    pub fn send_message(&self, message: Box<Message>) -> bool {
        self.enqueue(message, uptime_millis())
    }

    /// Enqueues `message` due `delay_millis` from now.
    pub fn send_message_delayed(&self, message: Box<Message>, delay_millis: u64) -> bool {
        self.enqueue(message, uptime_millis() + delay_millis)
    }

    /// Enqueues `message` due at an absolute uptime.
    pub fn send_message_at_time(&self, message: Box<Message>, uptime_millis: u64) -> bool {
        self.enqueue(message, uptime_millis)
    }

    /// Enqueues `message` ahead of everything already queued.
    pub fn send_message_at_front_of_queue(&self, message: Box<Message>) -> bool {
        self.enqueue(message, 0)
    }

    /// Enqueues an empty message carrying only `what`, due now.
    pub fn send_empty_message(&self, what: i32) -> bool {
        self.send_message(Message::obtain_what(what))
    }

    /// Enqueues an empty message carrying only `what`, due after a delay.
    pub fn send_empty_message_delayed(&self, what: i32, delay_millis: u64) -> bool {
        self.send_message_delayed(Message::obtain_what(what), delay_millis)
    }

    fn post_runnable(&self, runnable: Runnable, when: u64) -> bool {
        let mut message = Message::obtain();
        message.set_callback(runnable);
        self.enqueue(message, when)
    }

    /// Posts a callback due now. Returns the identity token for
    /// [`Handler::remove_callbacks`], or `None` if the enqueue was
    /// rejected.
    pub fn post<F>(&self, f: F) -> Option<Runnable>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.post_at_time(f, uptime_millis())
    }

    /// Posts a callback due `delay_millis` from now.
    pub fn post_delayed<F>(&self, f: F, delay_millis: u64) -> Option<Runnable>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.post_at_time(f, uptime_millis() + delay_millis)
    }

    /// Posts a callback due at an absolute uptime.
    pub fn post_at_time<F>(&self, f: F, uptime_millis: u64) -> Option<Runnable>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let runnable: Runnable = Arc::new(f);
        self.post_runnable(runnable.clone(), uptime_millis)
            .then_some(runnable)
    }

    /// Posts a callback ahead of everything already queued.
    pub fn post_at_front_of_queue<F>(&self, f: F) -> Option<Runnable>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let runnable: Runnable = Arc::new(f);
        self.post_runnable(runnable.clone(), 0).then_some(runnable)
    }

    // ===== Cancellation =====

    /// Removes every undispatched message with code `what` sent through
    /// this handler. Already-dispatched messages are unaffected.
    pub fn remove_messages(&self, what: i32) {
        self.inner.looper.queue().remove_messages(self, what);
    }

    /// Removes every undispatched post of `runnable` sent through this
    /// handler, matched by token identity.
    pub fn remove_callbacks(&self, runnable: &Runnable) {
        self.inner.looper.queue().remove_callbacks(self, runnable);
    }

    /// Returns whether any undispatched message with code `what` targets
    /// this handler.
    pub fn has_messages(&self, what: i32) -> bool {
        self.inner.looper.queue().has_messages(self, what)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("looper_thread", &self.inner.looper.thread_id())
            .field("has_callback", &self.inner.callback.is_some())
            .field("has_delegate", &self.inner.delegate.is_some())
            .finish()
    }
}
