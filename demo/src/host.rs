use std::collections::HashMap;

use skein::{ArgValue, Args, EntityId, EntityRef, Kwargs, Message, MethodRef, Offset};
use tracing::info;

use crate::registry::complete_for_type;

struct EntityLog {
    entity_type: String,
    messages: Vec<Message>,
}

/// The in-memory stand-in for everything the engine itself refuses to
/// own: entity identity, construction, cross-entity dispatch, and the
/// handful of external services the demo scenario calls out to.
///
/// Every entity gets its own growing log and is driven through
/// [`skein::Execution::complete`] exactly like a real deployment would —
/// `Host` just plays postman between them instead of shipping messages
/// over a network.
pub struct Host {
    logs: HashMap<EntityId, EntityLog>,
    next_id: u64,
}

impl Host {
    pub fn new() -> Self {
        Self {
            logs: HashMap::new(),
            next_id: 0,
        }
    }

    /// Materializes a new, empty entity of `entity_type` and returns its
    /// id. Does not run any code on it — that only happens once a
    /// constructor call is driven against it.
    pub fn create(&mut self, entity_type: &str) -> EntityId {
        self.next_id += 1;
        let id = EntityId::new(format!("{entity_type}-{:04}", self.next_id));
        self.logs.insert(
            id.clone(),
            EntityLog {
                entity_type: entity_type.to_string(),
                messages: Vec::new(),
            },
        );
        id
    }

    /// Runs `method` on `id` to completion, driving every nested
    /// interaction (cross-entity calls, entity creation, service calls)
    /// along the way. Returns the method's final response.
    pub fn call(
        &mut self,
        id: &EntityId,
        method: MethodRef,
        args: Args,
        kwargs: Kwargs,
    ) -> anyhow::Result<ArgValue> {
        let offset = self.next_offset(id);
        self.push(id, Message::EntityMethodRequestReceived {
            offset,
            method,
            args,
            kwargs,
        });
        self.pump(id)
    }

    fn next_offset(&self, id: &EntityId) -> Offset {
        match self.logs[id].messages.last() {
            Some(msg) => Offset::new(msg.offset().get() + 1),
            None => Offset::new(1),
        }
    }

    fn push(&mut self, id: &EntityId, msg: Message) {
        self.logs
            .get_mut(id)
            .expect("entity must be created before use")
            .messages
            .push(msg);
    }

    /// Drives `id`'s log to its next quiescent point: either a final
    /// response, an error, or a fresh suspension that this function
    /// resolves before calling `complete` again.
    fn pump(&mut self, id: &EntityId) -> anyhow::Result<ArgValue> {
        loop {
            let entity_type = self.logs[id].entity_type.clone();
            let inputs = self.logs[id].messages.clone();
            let output = complete_for_type(&entity_type, inputs)?;
            if output.is_empty() {
                anyhow::bail!("{id} produced no output and has no pending response to resume");
            }
            for msg in &output {
                self.push(id, msg.clone());
            }

            match output.last().expect("checked non-empty above") {
                Message::EntityMethodResponseSent { response, .. } => return Ok(response.clone()),
                Message::ErrorRaised { reason, detail, .. } => {
                    anyhow::bail!("{id} raised {reason}: {detail}")
                }
                Message::EntityMethodRequestSent {
                    offset,
                    receiver,
                    method,
                    args,
                    kwargs,
                    ..
                } => {
                    let target = match receiver {
                        EntityRef::Entity(target) => target.clone(),
                        EntityRef::Subject => {
                            anyhow::bail!("{id} tried to call itself through the subject proxy")
                        }
                    };
                    info!(%id, %target, %method, "dispatching cross-entity call");
                    let response = self.call(
                        &target,
                        method.clone(),
                        resolve_subject_args(args, id),
                        resolve_subject_kwargs(kwargs, id),
                    )?;
                    let response_offset = self.next_offset(id);
                    self.push(id, Message::EntityMethodResponseReceived {
                        offset: response_offset,
                        request_offset: *offset,
                        response,
                    });
                }
                Message::CreateEntityRequestSent {
                    offset,
                    entity_type,
                    args,
                    kwargs,
                    ..
                } => {
                    let new_id = self.create(entity_type);
                    info!(%id, new_id = %new_id, %entity_type, "materializing new entity");
                    self.call(
                        &new_id,
                        MethodRef::new(entity_type.clone(), "new"),
                        resolve_subject_args(args, id),
                        resolve_subject_kwargs(kwargs, id),
                    )?;
                    let response_offset = self.next_offset(id);
                    self.push(id, Message::CreateEntityResponseReceived {
                        offset: response_offset,
                        request_offset: *offset,
                        entity: new_id,
                    });
                }
                Message::ServiceRequestSent {
                    offset,
                    service,
                    args,
                    ..
                } => {
                    let response = simulate_service(service, args);
                    let response_offset = self.next_offset(id);
                    self.push(id, Message::ServiceResponseReceived {
                        offset: response_offset,
                        request_offset: *offset,
                        response,
                    });
                }
                other => anyhow::bail!("{id} produced an unexpected terminal message: {other:?}"),
            }
        }
    }
}

impl Default for Host {
    fn default() -> Self {
        Self::new()
    }
}

/// Replaces the Subject Proxy placeholder with the caller's real id
/// before forwarding arguments to a different entity — the one place in
/// the demo where "the entity this execution belongs to" gets resolved
/// to an actual address.
fn resolve_subject_args(args: &Args, caller: &EntityId) -> Args {
    args.iter().map(|a| resolve_subject(a, caller)).collect()
}

fn resolve_subject_kwargs(kwargs: &Kwargs, caller: &EntityId) -> Kwargs {
    kwargs
        .iter()
        .map(|(k, v)| (k.clone(), resolve_subject(v, caller)))
        .collect()
}

fn resolve_subject(value: &ArgValue, caller: &EntityId) -> ArgValue {
    match value {
        ArgValue::Subject => ArgValue::Entity(caller.clone()),
        other => other.clone(),
    }
}

/// Stands in for whatever external service an entity method calls out
/// to. None of the current demo entities issue a service call, but
/// `Host::pump` still needs a place to answer one if a future entity
/// does.
fn simulate_service(_service: &str, _args: &Args) -> ArgValue {
    ArgValue::Unit
}
