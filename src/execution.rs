use std::marker::PhantomData;

use tracing::{debug, warn};

use crate::context::{CallContext, MethodError, PendingInteraction};
use crate::entity::Entity;
use crate::error::{Fault, FaultKind};
use crate::message::{
    find_top_level_request, max_offset_strictly_increasing, validate_first_message, Message,
};
use crate::offset::OffsetAllocator;
use crate::replay::build_queue;

/// Drives one entity type through one `complete` call (§4.3).
///
/// Stateless across calls beyond the type parameter: every `complete`
/// rebuilds the entity from scratch via [`Entity::restore`] and
/// re-executes the method from its first line, so there is nothing to
/// keep alive between suspensions except the log itself.
pub struct Execution<E: Entity> {
    _marker: PhantomData<E>,
}

impl<E: Entity + Default> Execution<E> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }

    /// Applies `inputs` to a fresh `E`, runs the pending method (if any)
    /// to its next suspension or completion, and returns the messages
    /// that belong after `inputs` in the stream. Never panics on
    /// malformed input or domain failure — both are reified as
    /// `ErrorRaised` messages in the returned vector.
    pub fn complete(&self, inputs: Vec<Message>) -> Vec<Message> {
        let max_input_offset = match max_offset_strictly_increasing(&inputs) {
            Ok(max) => max,
            Err(fault) => {
                let mut alloc = OffsetAllocator::starting_after(None);
                return vec![fault_only_message(&mut alloc, fault, None)];
            }
        };
        if let Err(fault) = validate_first_message(&inputs) {
            let mut alloc = OffsetAllocator::starting_after(max_input_offset);
            return vec![fault_only_message(&mut alloc, fault, None)];
        }

        let top_level = match find_top_level_request(&inputs) {
            Ok(Some(msg)) => msg,
            Ok(None) => return Vec::new(),
            Err(fault) => {
                let mut alloc = OffsetAllocator::starting_after(max_input_offset);
                return vec![fault_only_message(&mut alloc, fault, None)];
            }
        };
        let (request_offset, method, args, kwargs) = match top_level {
            Message::EntityMethodRequestReceived {
                offset,
                method,
                args,
                kwargs,
            } => (*offset, method, args, kwargs),
            _ => unreachable!("find_top_level_request only returns EntityMethodRequestReceived"),
        };

        // Only state recorded *before* this trace's top-level request is a
        // committed baseline. Anything stamped with this request's own
        // offset range is a checkpoint from a previous, incomplete attempt
        // at the same call and must not be folded in — the method is about
        // to re-run from scratch and will reproduce it deterministically.
        let mut entity = E::default();
        for msg in &inputs {
            if let Message::EntityStateChanged { state, .. } = msg {
                if msg.offset() < request_offset {
                    if let Err(fault) = entity.restore(state).map_err(method_error_to_fault) {
                        let mut alloc = OffsetAllocator::starting_after(max_input_offset);
                        return vec![fault_only_message(&mut alloc, fault, Some(request_offset))];
                    }
                }
            }
        }

        let mut queue = match build_queue(&inputs) {
            Ok(queue) => queue,
            Err(fault) => {
                let mut alloc = OffsetAllocator::starting_after(max_input_offset);
                return vec![fault_only_message(&mut alloc, fault, Some(request_offset))];
            }
        };

        let mut pending: Option<PendingInteraction> = None;
        let outcome = {
            let mut ctx = CallContext::new(&mut queue, &mut pending);
            entity.invoke(&mut ctx, &method.method, args, kwargs)
        };

        let mut alloc = OffsetAllocator::starting_after(max_input_offset);
        let mut output = Vec::new();

        match outcome {
            Ok(response) => {
                if !queue.is_empty() {
                    let fault = Fault::non_determinism(format!(
                        "{} unconsumed logged interaction(s) remained after the method returned",
                        queue.len()
                    ));
                    return vec![fault_only_message(&mut alloc, fault, Some(request_offset))];
                }
                push_state_changed(&mut output, &mut alloc, &entity, request_offset);
                output.push(Message::EntityMethodResponseSent {
                    offset: alloc.allocate(),
                    request_offset,
                    response,
                });
            }
            Err(MethodError::Suspend) => match pending {
                Some(interaction) => {
                    debug!("entity suspended on a new interaction");
                    push_state_changed(&mut output, &mut alloc, &entity, request_offset);
                    output.push(pending_to_message(&mut alloc, request_offset, interaction));
                }
                None => {
                    debug!("entity re-suspended on an already-logged, still-unanswered interaction");
                }
            },
            Err(MethodError::Fault(fault)) => {
                warn!(%fault, "entity method raised a fault");
                return vec![fault_only_message(&mut alloc, fault, Some(request_offset))];
            }
            Err(MethodError::Domain(err)) => {
                warn!(error = %err, "entity method returned a domain failure");
                let fault = Fault::new(FaultKind::DomainFailure, err.to_string());
                return vec![fault_only_message(&mut alloc, fault, Some(request_offset))];
            }
        }

        output
    }
}

impl<E: Entity + Default> Default for Execution<E> {
    fn default() -> Self {
        Self::new()
    }
}

fn method_error_to_fault(err: MethodError) -> Fault {
    match err {
        MethodError::Fault(fault) => fault,
        MethodError::Domain(err) => Fault::new(FaultKind::DomainFailure, err.to_string()),
        MethodError::Suspend => Fault::contract_violation("restore must not suspend"),
    }
}

fn push_state_changed(
    output: &mut Vec<Message>,
    alloc: &mut OffsetAllocator,
    entity: &impl Entity,
    trace_offset: crate::offset::Offset,
) {
    output.push(Message::EntityStateChanged {
        offset: alloc.allocate(),
        trace_offset: Some(trace_offset),
        state: entity.snapshot(),
    });
}

fn pending_to_message(
    alloc: &mut OffsetAllocator,
    trace_offset: crate::offset::Offset,
    interaction: PendingInteraction,
) -> Message {
    let offset = alloc.allocate();
    match interaction {
        PendingInteraction::MethodCall {
            receiver,
            method,
            args,
            kwargs,
        } => Message::EntityMethodRequestSent {
            offset,
            trace_offset,
            receiver,
            method,
            args,
            kwargs,
        },
        PendingInteraction::CreateEntity {
            entity_type,
            args,
            kwargs,
        } => Message::CreateEntityRequestSent {
            offset,
            trace_offset,
            entity_type,
            args,
            kwargs,
        },
        PendingInteraction::ServiceCall {
            service,
            args,
            kwargs,
        } => Message::ServiceRequestSent {
            offset,
            trace_offset,
            service,
            args,
            kwargs,
        },
    }
}

fn fault_only_message(
    alloc: &mut OffsetAllocator,
    fault: Fault,
    request_offset: Option<crate::offset::Offset>,
) -> Message {
    Message::ErrorRaised {
        offset: alloc.allocate(),
        request_offset,
        reason: fault.kind,
        detail: fault.detail,
    }
}
