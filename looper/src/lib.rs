//! # Looper
//!
//! This crate implements the thread-confined, timer-ordered scheduling
//! primitive: recyclable messages, a blocking per-thread queue, the loop
//! that drains it, and the handler API client code talks to.
//!
//! ## Philosophy
//!
//! - **One thread, one timeline**: each looper pins its queue to exactly
//!   one consumer thread; any thread may produce into it
//! - **Cooperative, not preemptive**: a slow handler stalls its thread's
//!   entire timeline by design
//! - **Explicit ownership**: a message belongs to its producer, then the
//!   queue, then the dispatching handler, then the pool — never two at
//!   once
//!
//! ## Architecture
//!
//! A thread calls [`Looper::prepare`] once, hands the resulting looper to
//! any number of [`Handler`]s, and then parks in [`Looper::run`]. Handlers
//! compute absolute due times and enqueue; the queue keeps `(when, seq)`
//! order so equal due times dispatch in enqueue order.

pub mod handler;
pub mod looper;
pub mod message;
pub mod queue;
pub mod time;

pub use handler::{HandleMessage, Handler, HandlerCallback};
pub use looper::{Looper, LooperRegistry};
pub use message::{Message, Runnable};
pub use queue::MessageQueue;
pub use time::uptime_millis;
