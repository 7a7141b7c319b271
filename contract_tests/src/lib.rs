//! # Kernel Contract Tests
//!
//! This crate provides "golden" tests for the two public surfaces the
//! kernel exposes, so downstream services can rely on them not drifting:
//!
//! 1. **Register and invoke a service by name through a transaction**
//!    (`binder` + `parcel`)
//! 2. **Schedule work onto a specific logical thread** (`looper`)
//!
//! ## Philosophy
//!
//! - **Explicit over implicit**: the contracts are written as code
//! - **Consumer's eye view**: tests use only the public surfaces, never
//!   parcel or queue internals
//! - **Mechanism not policy**: define what must be stable, not how to
//!   use it

pub mod orchestration;
pub mod scheduling_surface;
pub mod service_surface;

/// Common helpers for building looper threads in tests
pub mod test_helpers {
    use looper::Looper;
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::thread;

    /// Spawns a worker thread with a prepared, running looper and
    /// returns the looper plus the join handle.
    pub fn spawn_looper_thread() -> (Arc<Looper>, thread::JoinHandle<()>) {
        let (tx, rx) = mpsc::channel();
        let join = thread::spawn(move || {
            let looper = Looper::prepare();
            tx.send(looper.clone()).expect("looper handoff failed");
            looper.run();
        });
        let looper = rx.recv().expect("looper thread died before handoff");
        (looper, join)
    }
}
