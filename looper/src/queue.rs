//! Thread-local, time-ordered, blocking message queue.

use crate::handler::Handler;
use crate::message::{Message, Runnable};
use crate::time::uptime_millis;
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

struct QueueState {
    /// Sorted by `(when, seq)` ascending.
    messages: VecDeque<Box<Message>>,
    /// Transitions false → true exactly once, never back.
    quitting: bool,
}

/// The single shared resource between producers and one consumer thread.
///
/// One mutex/condvar pair covers the ordered structure, the quitting
/// flag, and wakeups. The consumer releases the lock while blocked and
/// reacquires it on wake; producers only ever hold it briefly.
pub struct MessageQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl MessageQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                messages: VecDeque::new(),
                quitting: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Returns the number of queued messages.
    pub fn len(&self) -> usize {
        self.state.lock().unwrap().messages.len()
    }

    /// Returns whether the queue holds no messages.
    pub fn is_empty(&self) -> bool {
        self.state.lock().unwrap().messages.is_empty()
    }

    /// Returns whether the queue has started quitting.
    pub fn is_quitting(&self) -> bool {
        self.state.lock().unwrap().quitting
    }

    /// Inserts a message in `(when, seq)` order and wakes the consumer.
    ///
    /// Returns `false` without enqueuing for a targetless message or once
    /// the queue is quitting; callers decide how significant that is.
    pub fn enqueue_message(&self, mut message: Box<Message>) -> bool {
        if message.target().is_none() {
            tracing::warn!(
                what = message.what,
                "rejecting message with no target handler"
            );
            message.recycle();
            return false;
        }

        {
            let mut state = self.state.lock().unwrap();
            if state.quitting {
                tracing::warn!(
                    what = message.what,
                    "rejecting enqueue on quitting message queue"
                );
                drop(state);
                message.recycle();
                return false;
            }
            message.mark_in_use();
            let key = (message.when(), message.seq());
            let position = state
                .messages
                .iter()
                .position(|m| (m.when(), m.seq()) > key)
                .unwrap_or(state.messages.len());
            state.messages.insert(position, message);
            self.available.notify_all();
        }
        true
    }

    /// Blocks until the earliest due message is ready and returns it.
    ///
    /// Sleeps exactly until the head's due time when the head is
    /// future-dated, indefinitely when empty, and wakes early when a
    /// newer message arrives. Returns `None` once the queue is quitting
    /// and no due work remains.
    pub fn next(&self) -> Option<Box<Message>> {
        let mut state = self.state.lock().unwrap();
        loop {
            let now = uptime_millis();
            match state.messages.front().map(|m| m.when()) {
                Some(when) if when <= now => {
                    // Stays in-use through dispatch; the loop clears the
                    // flag before recycling.
                    return state.messages.pop_front();
                }
                Some(when) => {
                    if state.quitting {
                        // quit(safe) already discarded future-dated work,
                        // and unsafe quit discarded everything.
                        return None;
                    }
                    let sleep = Duration::from_millis(when - now);
                    let (next, _) = self.available.wait_timeout(state, sleep).unwrap();
                    state = next;
                }
                None => {
                    if state.quitting {
                        return None;
                    }
                    state = self.available.wait(state).unwrap();
                }
            }
        }
    }

    /// Starts quitting: no further enqueues succeed.
    ///
    /// `safe = false` drops every queued message, even due ones;
    /// `safe = true` discards only future-dated messages so already-due
    /// work still dispatches before the loop exits.
    pub fn quit(&self, safe: bool) {
        let removed = {
            let mut state = self.state.lock().unwrap();
            if state.quitting {
                return;
            }
            state.quitting = true;
            let now = uptime_millis();
            let removed = if safe {
                Self::extract(&mut state.messages, |m| m.when() > now)
            } else {
                state.messages.drain(..).collect()
            };
            self.available.notify_all();
            removed
        };
        Self::recycle_all(removed);
    }

    /// Removes all undispatched messages sent to `handler` with code `what`.
    pub fn remove_messages(&self, handler: &Handler, what: i32) {
        let removed = {
            let mut state = self.state.lock().unwrap();
            Self::extract(&mut state.messages, |m| {
                m.what == what && Self::targets(m, handler)
            })
        };
        Self::recycle_all(removed);
    }

    /// Removes all undispatched posts of `runnable` sent through `handler`.
    pub fn remove_callbacks(&self, handler: &Handler, runnable: &Runnable) {
        let removed = {
            let mut state = self.state.lock().unwrap();
            Self::extract(&mut state.messages, |m| {
                Self::targets(m, handler)
                    && m.callback
                        .as_ref()
                        .is_some_and(|c| std::sync::Arc::ptr_eq(c, runnable))
            })
        };
        Self::recycle_all(removed);
    }

    /// Returns whether any undispatched message for `handler` has code `what`.
    pub fn has_messages(&self, handler: &Handler, what: i32) -> bool {
        let state = self.state.lock().unwrap();
        state
            .messages
            .iter()
            .any(|m| m.what == what && Self::targets(m, handler))
    }

    fn targets(message: &Message, handler: &Handler) -> bool {
        message.target().is_some_and(|t| t.same_handler(handler))
    }

    fn extract(
        messages: &mut VecDeque<Box<Message>>,
        mut predicate: impl FnMut(&Message) -> bool,
    ) -> Vec<Box<Message>> {
        let mut removed = Vec::new();
        let mut index = 0;
        while index < messages.len() {
            if predicate(&messages[index]) {
                removed.push(messages.remove(index).unwrap());
            } else {
                index += 1;
            }
        }
        removed
    }

    fn recycle_all(removed: Vec<Box<Message>>) {
        for mut message in removed {
            message.clear_in_use();
            message.recycle();
        }
    }
}

impl Default for MessageQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::looper::Looper;
    use crate::time::uptime_millis;
    use std::thread;

    fn test_handler() -> Handler {
        Handler::new(Looper::prepare())
    }

    fn due_message(handler: &Handler, what: i32, when: u64) -> Box<Message> {
        let mut message = Message::obtain_what(what);
        message.set_target(handler.clone());
        message.when = when;
        message
    }

    #[test]
    fn test_equal_due_times_dispatch_in_enqueue_order() {
        let handler = test_handler();
        let queue = handler.looper().queue();
        let base = uptime_millis() + 10;

        // Insertion order: (base, seq0), (base + 20, seq1), (base, seq2).
        let a = due_message(&handler, 1, base);
        let b = due_message(&handler, 2, base + 20);
        let c = due_message(&handler, 3, base);
        let (seq_a, seq_c) = (a.seq(), c.seq());

        assert!(queue.enqueue_message(a));
        assert!(queue.enqueue_message(b));
        assert!(queue.enqueue_message(c));

        thread::sleep(Duration::from_millis(40));

        let first = queue.next().unwrap();
        let second = queue.next().unwrap();
        let third = queue.next().unwrap();
        assert_eq!((first.what, first.seq()), (1, seq_a));
        assert_eq!((second.what, second.seq()), (3, seq_c));
        assert_eq!(third.what, 2);
    }

    #[test]
    fn test_next_waits_for_future_due_time() {
        let handler = test_handler();
        let queue = handler.looper().queue();

        let started = uptime_millis();
        queue.enqueue_message(due_message(&handler, 1, started + 50));
        let message = queue.next().unwrap();
        assert_eq!(message.what, 1);
        assert!(uptime_millis() >= started + 50);
    }

    #[test]
    fn test_enqueue_without_target_rejected() {
        let handler = test_handler();
        let queue = handler.looper().queue();
        assert!(!queue.enqueue_message(Message::obtain_what(1)));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_quit_drops_everything_and_blocks_enqueue() {
        let handler = test_handler();
        let queue = handler.looper().queue();
        let now = uptime_millis();

        queue.enqueue_message(due_message(&handler, 1, now));
        queue.enqueue_message(due_message(&handler, 2, now + 1_000));
        queue.quit(false);

        assert!(queue.is_quitting());
        assert!(queue.next().is_none());
        assert!(!queue.enqueue_message(due_message(&handler, 3, now)));
    }

    #[test]
    fn test_quit_safely_keeps_due_work() {
        let handler = test_handler();
        let queue = handler.looper().queue();
        let now = uptime_millis();

        queue.enqueue_message(due_message(&handler, 1, now));
        queue.enqueue_message(due_message(&handler, 2, now + 60_000));
        queue.quit(true);

        let due = queue.next().unwrap();
        assert_eq!(due.what, 1);
        assert!(queue.next().is_none());
    }

    #[test]
    fn test_quit_is_irreversible_and_idempotent() {
        let handler = test_handler();
        let queue = handler.looper().queue();
        queue.quit(true);
        queue.quit(false);
        assert!(queue.is_quitting());
    }

    #[test]
    fn test_remove_messages_by_what() {
        let handler = test_handler();
        let queue = handler.looper().queue();
        let later = uptime_millis() + 60_000;

        queue.enqueue_message(due_message(&handler, 1, later));
        queue.enqueue_message(due_message(&handler, 2, later));
        queue.enqueue_message(due_message(&handler, 1, later));
        assert!(queue.has_messages(&handler, 1));

        queue.remove_messages(&handler, 1);
        assert!(!queue.has_messages(&handler, 1));
        assert!(queue.has_messages(&handler, 2));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_remove_messages_scoped_to_handler() {
        let handler_a = test_handler();
        let handler_b = Handler::new(handler_a.looper().clone());
        let queue = handler_a.looper().queue();
        let later = uptime_millis() + 60_000;

        queue.enqueue_message(due_message(&handler_a, 1, later));
        queue.enqueue_message(due_message(&handler_b, 1, later));

        queue.remove_messages(&handler_a, 1);
        assert!(!queue.has_messages(&handler_a, 1));
        assert!(queue.has_messages(&handler_b, 1));
    }

    #[test]
    fn test_remove_callbacks_by_identity() {
        let handler = test_handler();
        let queue = handler.looper().queue();
        let later = uptime_millis() + 60_000;

        let kept: Runnable = std::sync::Arc::new(|| {});
        let removed: Runnable = std::sync::Arc::new(|| {});

        let mut keep = due_message(&handler, 0, later);
        keep.set_callback(kept.clone());
        let mut drop_me = due_message(&handler, 0, later);
        drop_me.set_callback(removed.clone());

        queue.enqueue_message(keep);
        queue.enqueue_message(drop_me);

        queue.remove_callbacks(&handler, &removed);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_new_arrival_wakes_sleeping_consumer() {
        let handler = test_handler();
        let looper = handler.looper().clone();
        let producer = handler.clone();

        let consumer = thread::spawn(move || looper.queue().next());

        thread::sleep(Duration::from_millis(20));
        let message = due_message(&producer, 9, uptime_millis());
        assert!(producer.looper().queue().enqueue_message(message));

        let taken = consumer.join().unwrap().unwrap();
        assert_eq!(taken.what, 9);
    }
}
