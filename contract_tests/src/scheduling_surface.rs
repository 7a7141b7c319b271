//! Contract tests for the "schedule work onto a logical thread" surface.

use looper::{HandleMessage, Message};
use std::sync::{Arc, Mutex};

/// Delegate that appends `(tag, what)` to a shared log.
pub struct TaggedRecorder {
    pub tag: &'static str,
    pub log: Arc<Mutex<Vec<(&'static str, i32)>>>,
}

impl HandleMessage for TaggedRecorder {
    fn handle_message(&self, message: &mut Message) {
        self.log.lock().unwrap().push((self.tag, message.what));
    }
}
