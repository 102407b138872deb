use serde::{Deserialize, Serialize};

use crate::error::{Fault, FaultKind};
use crate::offset::Offset;
use crate::value::{ArgValue, Args, EntityId, EntityRef, Kwargs, MethodRef};

/// The Message Taxonomy (§4.1): a tagged union of every event shape that
/// may cross the engine boundary. Callers never pass raw data — only
/// these ten kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Message {
    /// Apply `state` to the subject entity. Input only.
    EntityStateChanged {
        offset: Offset,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        trace_offset: Option<Offset>,
        state: serde_json::Value,
    },
    /// A top-level call to execute. Input only.
    EntityMethodRequestReceived {
        offset: Offset,
        method: MethodRef,
        args: Args,
        kwargs: Kwargs,
    },
    /// The domain called another entity's method; emitted on suspension,
    /// matched against a logged response during replay.
    EntityMethodRequestSent {
        offset: Offset,
        trace_offset: Offset,
        receiver: EntityRef,
        method: MethodRef,
        args: Args,
        kwargs: Kwargs,
    },
    /// The reply to an earlier `EntityMethodRequestSent`. Input only.
    EntityMethodResponseReceived {
        offset: Offset,
        request_offset: Offset,
        response: ArgValue,
    },
    /// The terminal return value of the top-level method. Output only.
    EntityMethodResponseSent {
        offset: Offset,
        request_offset: Offset,
        response: ArgValue,
    },
    /// The domain constructed an entity; construction is deferred to the
    /// host.
    CreateEntityRequestSent {
        offset: Offset,
        trace_offset: Offset,
        entity_type: String,
        args: Args,
        kwargs: Kwargs,
    },
    /// The materialized entity returned by the host. Input only.
    CreateEntityResponseReceived {
        offset: Offset,
        request_offset: Offset,
        entity: EntityId,
    },
    /// A call to an external service.
    ServiceRequestSent {
        offset: Offset,
        trace_offset: Offset,
        service: String,
        args: Args,
        kwargs: Kwargs,
    },
    /// Reply to a service call. Input only.
    ServiceResponseReceived {
        offset: Offset,
        request_offset: Offset,
        response: ArgValue,
    },
    /// A domain method (or the engine itself) terminated abnormally.
    /// Output only.
    ErrorRaised {
        offset: Offset,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        request_offset: Option<Offset>,
        reason: FaultKind,
        detail: String,
    },
}

impl Message {
    pub fn offset(&self) -> Offset {
        match self {
            Message::EntityStateChanged { offset, .. }
            | Message::EntityMethodRequestReceived { offset, .. }
            | Message::EntityMethodRequestSent { offset, .. }
            | Message::EntityMethodResponseReceived { offset, .. }
            | Message::EntityMethodResponseSent { offset, .. }
            | Message::CreateEntityRequestSent { offset, .. }
            | Message::CreateEntityResponseReceived { offset, .. }
            | Message::ServiceRequestSent { offset, .. }
            | Message::ServiceResponseReceived { offset, .. }
            | Message::ErrorRaised { offset, .. } => *offset,
        }
    }

    /// The `request_offset` this message answers, if it's a response of
    /// any kind (used while pairing requests to responses, §3 invariant
    /// 2).
    pub fn request_offset(&self) -> Option<Offset> {
        match self {
            Message::EntityMethodResponseReceived { request_offset, .. }
            | Message::EntityMethodResponseSent { request_offset, .. }
            | Message::CreateEntityResponseReceived { request_offset, .. }
            | Message::ServiceResponseReceived { request_offset, .. } => Some(*request_offset),
            Message::ErrorRaised { request_offset, .. } => *request_offset,
            _ => None,
        }
    }

    pub fn is_request_sent(&self) -> bool {
        matches!(
            self,
            Message::EntityMethodRequestSent { .. }
                | Message::CreateEntityRequestSent { .. }
                | Message::ServiceRequestSent { .. }
        )
    }

    pub fn is_response_received(&self) -> bool {
        matches!(
            self,
            Message::EntityMethodResponseReceived { .. }
                | Message::CreateEntityResponseReceived { .. }
                | Message::ServiceResponseReceived { .. }
        )
    }

    pub fn is_state_changed(&self) -> bool {
        matches!(self, Message::EntityStateChanged { .. })
    }

    pub fn is_method_request_received(&self) -> bool {
        matches!(self, Message::EntityMethodRequestReceived { .. })
    }
}

/// Validates §3 invariant 1 (strictly increasing input offsets) and
/// returns the highest offset seen, so the Output Builder can seed its
/// allocator from it.
pub fn max_offset_strictly_increasing(inputs: &[Message]) -> Result<Option<Offset>, Fault> {
    let mut last: Option<Offset> = None;
    for msg in inputs {
        let offset = msg.offset();
        if let Some(prev) = last {
            if offset <= prev {
                return Err(Fault::new(
                    FaultKind::ContractViolation,
                    format!("input offsets must be strictly increasing: {prev} then {offset}"),
                ));
            }
        }
        last = Some(offset);
    }
    Ok(last)
}

/// Validates §3 invariant 3: the first input message is either an
/// `EntityStateChanged` or the top-level `EntityMethodRequestReceived`.
pub fn validate_first_message(inputs: &[Message]) -> Result<(), Fault> {
    match inputs.first() {
        None => Ok(()),
        Some(first) if first.is_state_changed() || first.is_method_request_received() => Ok(()),
        Some(other) => Err(Fault::new(
            FaultKind::ContractViolation,
            format!(
                "first input message must be EntityStateChanged or \
                 EntityMethodRequestReceived, got {other:?}"
            ),
        )),
    }
}

/// Locates the single top-level `EntityMethodRequestReceived` in the
/// input stream (§4.3 step 2). More than one is a contract violation; it
/// is legal for there to be none (a pure state-update call).
pub fn find_top_level_request(
    inputs: &[Message],
) -> Result<Option<&Message>, Fault> {
    let mut found: Option<&Message> = None;
    for msg in inputs {
        if msg.is_method_request_received() {
            if found.is_some() {
                return Err(Fault::new(
                    FaultKind::ContractViolation,
                    "more than one top-level EntityMethodRequestReceived in input",
                ));
            }
            found = Some(msg);
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ArgValue;

    fn state_changed(offset: u64) -> Message {
        Message::EntityStateChanged {
            offset: Offset::new(offset),
            trace_offset: None,
            state: serde_json::json!({}),
        }
    }

    fn request_received(offset: u64) -> Message {
        Message::EntityMethodRequestReceived {
            offset: Offset::new(offset),
            method: MethodRef::new("User", "write_article"),
            args: vec![ArgValue::json("Hello")],
            kwargs: Default::default(),
        }
    }

    #[test]
    fn rejects_non_increasing_offsets() {
        let inputs = vec![state_changed(2), state_changed(1)];
        let err = max_offset_strictly_increasing(&inputs).unwrap_err();
        assert_eq!(err.kind, FaultKind::ContractViolation);
    }

    #[test]
    fn accepts_strictly_increasing_offsets() {
        let inputs = vec![state_changed(1), request_received(2)];
        assert_eq!(
            max_offset_strictly_increasing(&inputs).unwrap(),
            Some(Offset::new(2))
        );
    }

    #[test]
    fn rejects_bad_first_message() {
        let inputs = vec![Message::EntityMethodResponseReceived {
            offset: Offset::new(1),
            request_offset: Offset::new(0),
            response: ArgValue::Unit,
        }];
        assert!(validate_first_message(&inputs).is_err());
    }

    #[test]
    fn finds_single_top_level_request() {
        let inputs = vec![state_changed(1), request_received(2)];
        let found = find_top_level_request(&inputs).unwrap();
        assert_eq!(found.unwrap().offset(), Offset::new(2));
    }

    #[test]
    fn rejects_multiple_top_level_requests() {
        let inputs = vec![request_received(1), request_received(2)];
        assert!(find_top_level_request(&inputs).is_err());
    }
}
