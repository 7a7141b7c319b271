//! Transaction endpoint and dispatch boundary.

use parcel::{Parcel, ParcelError};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::{Arc, RwLock, Weak};
use thiserror::Error;
use uuid::Uuid;

/// First transaction code available to an interface.
pub const FIRST_CALL_TRANSACTION: u32 = 1;
/// Last transaction code available to an interface.
pub const LAST_CALL_TRANSACTION: u32 = 0x00ff_ffff;
/// Transaction flag: one-way call, no reply is written or read.
pub const FLAG_ONEWAY: u32 = 0x0000_0001;

/// Unique identifier for a binder endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BinderId(Uuid);

impl BinderId {
    /// Creates a new random binder ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for BinderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BinderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "binder:{}", self.0)
    }
}

/// Error raised inside a transaction handler.
///
/// These never reach the caller of [`BinderObject::transact`]; the
/// wrapper logs them and flattens the outcome to `false`.
#[derive(Debug, Error)]
pub enum TransactError {
    /// Argument marshaling failed, including interface verification.
    #[error(transparent)]
    Parcel(#[from] ParcelError),
    /// The request was structurally invalid for the invoked code.
    #[error("malformed transaction request: {0}")]
    MalformedRequest(String),
    /// The service itself failed while handling the request.
    #[error("service failure: {0}")]
    ServiceFailure(String),
}

struct Attachment {
    descriptor: String,
    owner: Weak<dyn Any + Send + Sync>,
}

/// Endpoint record embedded by every concrete service.
///
/// Holds the optional interface attachment: a descriptor string plus a
/// non-owning reference to the implementing object. No transaction
/// succeeds until [`Binder::attach_interface`] has run.
pub struct Binder {
    id: BinderId,
    attachment: RwLock<Option<Attachment>>,
}

impl Binder {
    /// Creates a detached endpoint record.
    pub fn new() -> Self {
        Self {
            id: BinderId::new(),
            attachment: RwLock::new(None),
        }
    }

    /// Returns this endpoint's identity.
    pub fn id(&self) -> BinderId {
        self.id
    }

    /// Attaches the implementing object and its interface descriptor.
    ///
    /// Every service constructor must call this before the binder can
    /// carry transactions; the usual shape is `Arc::new_cyclic` handing
    /// its weak self-reference in as `owner`.
    pub fn attach_interface<T>(&self, owner: Weak<T>, descriptor: impl Into<String>)
    where
        T: Any + Send + Sync,
    {
        let owner: Weak<dyn Any + Send + Sync> = owner;
        *self.attachment.write().unwrap() = Some(Attachment {
            descriptor: descriptor.into(),
            owner,
        });
    }

    /// Returns the attached interface descriptor, if any.
    pub fn interface_descriptor(&self) -> Option<String> {
        self.attachment
            .read()
            .unwrap()
            .as_ref()
            .map(|a| a.descriptor.clone())
    }

    /// Same-process fast path: returns the implementing object directly
    /// when `descriptor` matches the attachment, letting co-located
    /// callers skip marshaling entirely.
    pub fn query_local_interface(&self, descriptor: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        let attachment = self.attachment.read().unwrap();
        match attachment.as_ref() {
            Some(a) if a.descriptor == descriptor => a.owner.upgrade(),
            _ => None,
        }
    }
}

impl Default for Binder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Binder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binder")
            .field("id", &self.id)
            .field("descriptor", &self.interface_descriptor())
            .finish()
    }
}

/// A concrete transaction handler.
///
/// Implementations embed a [`Binder`], attach their descriptor in the
/// constructor, and answer codes starting at [`FIRST_CALL_TRANSACTION`].
/// An unknown code is reported as `Ok(false)`, not an error.
pub trait BinderObject: Send + Sync {
    /// The embedded endpoint record.
    fn binder(&self) -> &Binder;

    /// Handles one transaction. Invoked only through [`BinderObject::transact`].
    fn on_transact(
        &self,
        code: u32,
        data: &mut Parcel,
        reply: Option<&mut Parcel>,
        flags: u32,
    ) -> Result<bool, TransactError>;

    /// Public transaction entry point.
    ///
    /// Checks the attachment and the one-way contract, then invokes
    /// [`BinderObject::on_transact`]. Any error raised inside the handler
    /// is logged and converted into `false`; errors never cross this
    /// simulated IPC boundary.
    fn transact(
        &self,
        code: u32,
        data: &mut Parcel,
        reply: Option<&mut Parcel>,
        flags: u32,
    ) -> bool {
        let binder = self.binder();
        let Some(descriptor) = binder.interface_descriptor() else {
            tracing::error!(
                binder = %binder.id(),
                code,
                "transact on endpoint with no attached interface"
            );
            return false;
        };
        let oneway = flags & FLAG_ONEWAY != 0;
        if oneway && reply.is_some() {
            tracing::warn!(
                binder = %binder.id(),
                descriptor = %descriptor,
                code,
                "one-way transaction must not carry a reply parcel"
            );
            return false;
        }
        if !oneway && reply.is_none() {
            tracing::warn!(
                binder = %binder.id(),
                descriptor = %descriptor,
                code,
                "two-way transaction requires a reply parcel"
            );
            return false;
        }
        match self.on_transact(code, data, reply, flags) {
            Ok(handled) => handled,
            Err(error) => {
                tracing::error!(
                    binder = %binder.id(),
                    descriptor = %descriptor,
                    code,
                    %error,
                    "transaction failed"
                );
                false
            }
        }
    }
}
