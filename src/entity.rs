use crate::context::{CallContext, MethodError};
use crate::value::{ArgValue, Args, Kwargs};

/// The capability set an entity type must provide (§4.2).
///
/// The engine dispatches purely through [`Entity::invoke`] — it never
/// inspects a method body, never reflects over field names. A type that
/// implements this trait is a complete contract: it can be snapshotted,
/// restored, and driven by name alone.
pub trait Entity: Send {
    /// Stable name used in `MethodRef::entity_type` and in
    /// `CreateEntityRequestSent::entity_type`.
    fn entity_type(&self) -> &'static str;

    /// Captures current state for an `EntityStateChanged` payload.
    fn snapshot(&self) -> serde_json::Value;

    /// Rebuilds state from a previously captured snapshot. The inverse
    /// of [`Entity::snapshot`]; called once per `complete` before any
    /// method runs (§4.3 step 1).
    fn restore(&mut self, state: &serde_json::Value) -> Result<(), MethodError>;

    /// Runs `method` against the current state, routing every external
    /// interaction through `ctx`. Re-executed from scratch on every
    /// `complete` call (§4.3) — must not hold state across invocations
    /// beyond what `snapshot`/`restore` carry.
    fn invoke(
        &mut self,
        ctx: &mut CallContext<'_>,
        method: &str,
        args: &Args,
        kwargs: &Kwargs,
    ) -> Result<ArgValue, MethodError>;
}
