use serde_json::json;
use skein::{
    ArgValue, Args, CallContext, Entity, EntityRef, Execution, FaultKind, Kwargs, Message,
    MethodError, MethodRef, Offset,
};

/// A minimal entity used to exercise the engine without pulling in the
/// demo crate: one field, one method per interaction kind.
#[derive(Default)]
struct Counter {
    count: i64,
}

impl Entity for Counter {
    fn entity_type(&self) -> &'static str {
        "Counter"
    }

    fn snapshot(&self) -> serde_json::Value {
        json!({ "count": self.count })
    }

    fn restore(&mut self, state: &serde_json::Value) -> Result<(), MethodError> {
        self.count = state
            .get("count")
            .and_then(|v| v.as_i64())
            .ok_or_else(|| anyhow::anyhow!("missing count field"))?;
        Ok(())
    }

    fn invoke(
        &mut self,
        ctx: &mut CallContext<'_>,
        method: &str,
        args: &Args,
        _kwargs: &Kwargs,
    ) -> Result<ArgValue, MethodError> {
        match method {
            "bump" => {
                self.count += 1;
                Ok(ArgValue::json(self.count))
            }
            "bump_with_audit" => {
                self.count += 1;
                ctx.call_service("audit", vec![ArgValue::json(self.count)], Kwargs::default())
            }
            "delegate" => {
                let receiver = args
                    .first()
                    .and_then(ArgValue::as_entity)
                    .cloned()
                    .ok_or_else(|| anyhow::anyhow!("delegate requires a receiver"))?;
                ctx.call_method(
                    EntityRef::Entity(receiver),
                    MethodRef::new("Counter", "bump"),
                    vec![],
                    Kwargs::default(),
                )
            }
            "spawn" => {
                let child = ctx.create_entity(
                    "Counter",
                    vec![ArgValue::json(self.count)],
                    Kwargs::default(),
                )?;
                Ok(ArgValue::Entity(child))
            }
            other => Err(anyhow::anyhow!("no such method {other}").into()),
        }
    }
}

fn bump_request(offset: u64) -> Message {
    Message::EntityMethodRequestReceived {
        offset: Offset::new(offset),
        method: MethodRef::new("Counter", "bump"),
        args: vec![],
        kwargs: Default::default(),
    }
}

fn audit_request(offset: u64) -> Message {
    Message::EntityMethodRequestReceived {
        offset: Offset::new(offset),
        method: MethodRef::new("Counter", "bump_with_audit"),
        args: vec![],
        kwargs: Default::default(),
    }
}

fn spawn_request(offset: u64) -> Message {
    Message::EntityMethodRequestReceived {
        offset: Offset::new(offset),
        method: MethodRef::new("Counter", "spawn"),
        args: vec![],
        kwargs: Default::default(),
    }
}

#[test]
fn no_top_level_request_produces_no_output() {
    let output = Execution::<Counter>::new().complete(vec![]);
    assert!(output.is_empty());
}

#[test]
fn pure_state_update_with_no_request_produces_no_output() {
    let inputs = vec![Message::EntityStateChanged {
        offset: Offset::new(1),
        trace_offset: None,
        state: json!({ "count": 7 }),
    }];
    let output = Execution::<Counter>::new().complete(inputs);
    assert!(output.is_empty());
}

#[test]
fn method_with_no_interactions_completes_in_one_call() {
    let output = Execution::<Counter>::new().complete(vec![bump_request(1)]);
    assert_eq!(output.len(), 2);

    match &output[0] {
        Message::EntityStateChanged {
            offset,
            trace_offset,
            state,
        } => {
            assert_eq!(*offset, Offset::new(2));
            assert_eq!(*trace_offset, Some(Offset::new(1)));
            assert_eq!(state["count"], 1);
        }
        other => panic!("expected EntityStateChanged, got {other:?}"),
    }
    match &output[1] {
        Message::EntityMethodResponseSent {
            offset,
            request_offset,
            response,
        } => {
            assert_eq!(*offset, Offset::new(3));
            assert_eq!(*request_offset, Offset::new(1));
            assert_eq!(*response, ArgValue::json(1));
        }
        other => panic!("expected EntityMethodResponseSent, got {other:?}"),
    }
}

#[test]
fn picks_up_committed_state_from_before_the_request() {
    let inputs = vec![
        Message::EntityStateChanged {
            offset: Offset::new(1),
            trace_offset: None,
            state: json!({ "count": 41 }),
        },
        bump_request(2),
    ];
    let output = Execution::<Counter>::new().complete(inputs);
    match &output[1] {
        Message::EntityMethodResponseSent { response, .. } => {
            assert_eq!(*response, ArgValue::json(42));
        }
        other => panic!("expected EntityMethodResponseSent, got {other:?}"),
    }
}

#[test]
fn suspends_on_a_fresh_interaction_then_resumes_with_the_logged_response() {
    let request = audit_request(1);

    let first = Execution::<Counter>::new().complete(vec![request.clone()]);
    assert_eq!(first.len(), 2);
    let service_offset = match &first[1] {
        Message::ServiceRequestSent {
            offset,
            trace_offset,
            service,
            args,
            ..
        } => {
            assert_eq!(*trace_offset, Offset::new(1));
            assert_eq!(service, "audit");
            assert_eq!(args, &vec![ArgValue::json(1)]);
            *offset
        }
        other => panic!("expected ServiceRequestSent, got {other:?}"),
    };

    let mut second_inputs = vec![request];
    second_inputs.extend(first);
    second_inputs.push(Message::ServiceResponseReceived {
        offset: Offset::new(service_offset.get() + 1),
        request_offset: service_offset,
        response: ArgValue::json(true),
    });

    let second = Execution::<Counter>::new().complete(second_inputs);
    assert_eq!(second.len(), 2);
    match &second[1] {
        Message::EntityMethodResponseSent { response, .. } => {
            assert_eq!(*response, ArgValue::json(true));
        }
        other => panic!("expected EntityMethodResponseSent, got {other:?}"),
    }
}

#[test]
fn create_entity_suspends_then_resumes_with_the_new_id() {
    let request = spawn_request(1);

    let first = Execution::<Counter>::new().complete(vec![request.clone()]);
    assert_eq!(first.len(), 2);
    let create_offset = match &first[1] {
        Message::CreateEntityRequestSent {
            offset,
            trace_offset,
            entity_type,
            args,
            ..
        } => {
            assert_eq!(*trace_offset, Offset::new(1));
            assert_eq!(entity_type, "Counter");
            assert_eq!(args, &vec![ArgValue::json(0)]);
            *offset
        }
        other => panic!("expected CreateEntityRequestSent, got {other:?}"),
    };

    let child_id = skein::EntityId::new("counter-child");
    let mut second_inputs = vec![request];
    second_inputs.extend(first);
    second_inputs.push(Message::CreateEntityResponseReceived {
        offset: Offset::new(create_offset.get() + 1),
        request_offset: create_offset,
        entity: child_id.clone(),
    });

    let second = Execution::<Counter>::new().complete(second_inputs);
    assert_eq!(second.len(), 2);
    match &second[1] {
        Message::EntityMethodResponseSent { response, .. } => {
            assert_eq!(*response, ArgValue::Entity(child_id));
        }
        other => panic!("expected EntityMethodResponseSent, got {other:?}"),
    }
}

#[test]
fn resuming_an_unanswered_tail_interaction_produces_no_output() {
    let request = audit_request(1);
    let first = Execution::<Counter>::new().complete(vec![request.clone()]);

    let mut second_inputs = vec![request];
    second_inputs.extend(first);

    let second = Execution::<Counter>::new().complete(second_inputs);
    assert!(second.is_empty());
}

#[test]
fn mismatched_replay_is_reported_as_non_determinism() {
    let inputs = vec![
        audit_request(1),
        Message::ServiceRequestSent {
            offset: Offset::new(2),
            trace_offset: Offset::new(1),
            service: "audit".into(),
            args: vec![ArgValue::json(99)],
            kwargs: Default::default(),
        },
    ];
    let output = Execution::<Counter>::new().complete(inputs);
    assert_eq!(output.len(), 1);
    match &output[0] {
        Message::ErrorRaised { reason, .. } => assert_eq!(*reason, FaultKind::NonDeterminism),
        other => panic!("expected ErrorRaised, got {other:?}"),
    }
}

#[test]
fn non_increasing_offsets_are_a_contract_violation() {
    let inputs = vec![bump_request(2), bump_request(1)];
    let output = Execution::<Counter>::new().complete(inputs);
    assert_eq!(output.len(), 1);
    match &output[0] {
        Message::ErrorRaised { reason, .. } => assert_eq!(*reason, FaultKind::ContractViolation),
        other => panic!("expected ErrorRaised, got {other:?}"),
    }
}

#[test]
fn unknown_method_is_a_domain_failure() {
    let inputs = vec![Message::EntityMethodRequestReceived {
        offset: Offset::new(1),
        method: MethodRef::new("Counter", "nonexistent"),
        args: vec![],
        kwargs: Default::default(),
    }];
    let output = Execution::<Counter>::new().complete(inputs);
    assert_eq!(output.len(), 1);
    match &output[0] {
        Message::ErrorRaised { reason, .. } => assert_eq!(*reason, FaultKind::DomainFailure),
        other => panic!("expected ErrorRaised, got {other:?}"),
    }
}

#[test]
fn cross_entity_call_suspends_with_the_right_receiver() {
    let receiver_id = skein::EntityId::new("counter-2");
    let inputs = vec![Message::EntityMethodRequestReceived {
        offset: Offset::new(1),
        method: MethodRef::new("Counter", "delegate"),
        args: vec![ArgValue::Entity(receiver_id.clone())],
        kwargs: Default::default(),
    }];
    let output = Execution::<Counter>::new().complete(inputs);
    assert_eq!(output.len(), 2);
    match &output[1] {
        Message::EntityMethodRequestSent {
            receiver, method, ..
        } => {
            assert_eq!(*receiver, EntityRef::Entity(receiver_id));
            assert_eq!(method.method, "bump");
        }
        other => panic!("expected EntityMethodRequestSent, got {other:?}"),
    }
}
