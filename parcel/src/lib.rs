//! # Parcel
//!
//! This crate defines the marshaling container used by every transaction.
//!
//! ## Philosophy
//!
//! - **Positional, not byte-exact**: a parcel preserves the order and type
//!   of each written value, never a specific binary layout
//! - **Degrade, don't crash**: a mismatched read yields the type's
//!   zero-value; only interface verification fails hard
//! - **Reusable**: parcels are obtained from a bounded pool and recycled
//!
//! ## Architecture
//!
//! A parcel is an append-only sequence of typed values with an
//! independently movable read cursor. One side writes arguments (or a
//! reply), the other rewinds to position 0 and drains them in the same
//! order. `enforce_interface` is the single integrity check callers rely
//! on to reject foreign or malformed transactions.

pub mod bundle;
pub mod parcel;
pub mod value;

pub use bundle::Bundle;
pub use parcel::{pool_size, Parcel, ParcelError};
pub use value::Value;
