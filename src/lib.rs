//! A deterministic, replay-driven completion engine for entity methods.
//!
//! ```text
//!   input log                         Execution<E>
//!  ───────────►  ┌─────────────────────────────────────────────┐
//!                │  restore  →  invoke(ctx, ...)  →  output     │
//!                │                  │   ▲                       │
//!                │            CallContext                       │
//!                │           (replay queue)                     │
//!                └─────────────────────────────────────────────┘
//!                                                    ▼
//!                                           new messages, or none
//! ```
//!
//! An [`Entity`] never sees whether a call it makes is fresh or a replay
//! of something already logged — [`CallContext`] hides that distinction
//! behind [`MethodError::Suspend`], letting method bodies read like
//! ordinary synchronous functions. [`Execution::complete`] is the only
//! entry point; it is pure, synchronous, and safe to call repeatedly
//! with a growing log.

mod context;
mod entity;
mod error;
mod execution;
mod message;
mod offset;
mod replay;
mod value;

pub use context::{CallContext, MethodError};
pub use entity::Entity;
pub use error::{Fault, FaultKind};
pub use execution::Execution;
pub use message::Message;
pub use offset::{Offset, OffsetAllocator};
pub use value::{ArgValue, Args, EntityId, EntityRef, Kwargs, MethodRef};
