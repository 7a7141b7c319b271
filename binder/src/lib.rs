//! # Binder
//!
//! This crate defines the transaction endpoint and the process-wide
//! service registry built on it.
//!
//! ## Philosophy
//!
//! - **Transactions, not calls**: every exchange goes through
//!   `transact(code, data, reply, flags)` against an interface descriptor
//! - **Nothing crosses the boundary**: failures inside a service are
//!   logged and flattened to `false`, mirroring cross-process exception
//!   marshaling
//! - **Fast path when co-located**: callers in the same process can skip
//!   marshaling entirely via `query_local_interface`
//!
//! ## Architecture
//!
//! A concrete service embeds a [`Binder`] record, attaches its interface
//! descriptor in its constructor, and implements
//! [`BinderObject::on_transact`]. The [`ServiceManager`] maps flat string
//! names to binders and supports blocking and callback-based waiting.

pub mod endpoint;
pub mod service_manager;

pub use endpoint::{
    Binder, BinderId, BinderObject, TransactError, FIRST_CALL_TRANSACTION, FLAG_ONEWAY,
    LAST_CALL_TRANSACTION,
};
pub use service_manager::ServiceManager;
