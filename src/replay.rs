use std::collections::{HashMap, VecDeque};

use crate::error::Fault;
use crate::message::Message;
use crate::offset::Offset;
use crate::value::{ArgValue, Args, EntityId, EntityRef, Kwargs, MethodRef};

/// The shape of one logged external interaction, stripped of its offset
/// and trace bookkeeping — the only part that matters for matching a
/// replayed call against the log (§4.3 step 3).
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum InteractionFingerprint {
    MethodCall {
        receiver: EntityRef,
        method: MethodRef,
        args: Args,
        kwargs: Kwargs,
    },
    CreateEntity {
        entity_type: String,
        args: Args,
        kwargs: Kwargs,
    },
    ServiceCall {
        service: String,
        args: Args,
        kwargs: Kwargs,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LoggedResponse {
    Value(ArgValue),
    Entity(EntityId),
}

/// One entry of the replay queue: a previously sent request plus its
/// reply, if one has arrived yet.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LoggedInteraction {
    pub fingerprint: InteractionFingerprint,
    pub response: Option<LoggedResponse>,
}

/// Builds the FIFO queue replay matches against (§4.3 step 3, §9
/// tie-break rule). Requests are queued in the order they were
/// originally sent; a `VecDeque` makes "earliest unconsumed wins"
/// automatic — callers only ever look at the front.
pub(crate) fn build_queue(inputs: &[Message]) -> Result<VecDeque<LoggedInteraction>, Fault> {
    let mut order = Vec::new();
    let mut interactions: HashMap<Offset, LoggedInteraction> = HashMap::new();

    for msg in inputs {
        let fingerprint = match msg {
            Message::EntityMethodRequestSent {
                receiver,
                method,
                args,
                kwargs,
                ..
            } => Some(InteractionFingerprint::MethodCall {
                receiver: receiver.clone(),
                method: method.clone(),
                args: args.clone(),
                kwargs: kwargs.clone(),
            }),
            Message::CreateEntityRequestSent {
                entity_type,
                args,
                kwargs,
                ..
            } => Some(InteractionFingerprint::CreateEntity {
                entity_type: entity_type.clone(),
                args: args.clone(),
                kwargs: kwargs.clone(),
            }),
            Message::ServiceRequestSent {
                service,
                args,
                kwargs,
                ..
            } => Some(InteractionFingerprint::ServiceCall {
                service: service.clone(),
                args: args.clone(),
                kwargs: kwargs.clone(),
            }),
            _ => None,
        };
        if let Some(fingerprint) = fingerprint {
            let offset = msg.offset();
            order.push(offset);
            interactions.insert(
                offset,
                LoggedInteraction {
                    fingerprint,
                    response: None,
                },
            );
        }
    }

    for msg in inputs {
        let response = match msg {
            Message::EntityMethodResponseReceived { response, .. }
            | Message::ServiceResponseReceived { response, .. } => {
                Some(LoggedResponse::Value(response.clone()))
            }
            Message::CreateEntityResponseReceived { entity, .. } => {
                Some(LoggedResponse::Entity(entity.clone()))
            }
            _ => None,
        };
        if let Some(response) = response {
            let request_offset = msg
                .request_offset()
                .expect("response variants always carry a request_offset");
            let entry = interactions.get_mut(&request_offset).ok_or_else(|| {
                Fault::log_inconsistency(format!(
                    "response at {} answers unknown request {request_offset}",
                    msg.offset()
                ))
            })?;
            entry.response = Some(response);
        }
    }

    Ok(order
        .into_iter()
        .map(|offset| {
            interactions
                .remove(&offset)
                .expect("every queued offset was inserted above")
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_request_with_its_response() {
        let inputs = vec![
            Message::EntityMethodRequestSent {
                offset: Offset::new(2),
                trace_offset: Offset::new(1),
                receiver: EntityRef::Subject,
                method: MethodRef::new("Article", "add_comment"),
                args: vec![],
                kwargs: Default::default(),
            },
            Message::EntityMethodResponseReceived {
                offset: Offset::new(3),
                request_offset: Offset::new(2),
                response: ArgValue::Unit,
            },
        ];
        let queue = build_queue(&inputs).unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(
            queue.front().unwrap().response,
            Some(LoggedResponse::Value(ArgValue::Unit))
        );
    }

    #[test]
    fn leaves_tail_request_unanswered() {
        let inputs = vec![Message::ServiceRequestSent {
            offset: Offset::new(2),
            trace_offset: Offset::new(1),
            service: "email".into(),
            args: vec![],
            kwargs: Default::default(),
        }];
        let queue = build_queue(&inputs).unwrap();
        assert_eq!(queue.front().unwrap().response, None);
    }

    #[test]
    fn rejects_response_to_unknown_request() {
        let inputs = vec![Message::ServiceResponseReceived {
            offset: Offset::new(2),
            request_offset: Offset::new(99),
            response: ArgValue::Unit,
        }];
        assert!(build_queue(&inputs).is_err());
    }
}
