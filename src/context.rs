use std::collections::VecDeque;
use std::fmt;

use crate::error::Fault;
use crate::replay::{InteractionFingerprint, LoggedInteraction, LoggedResponse};
use crate::value::{ArgValue, Args, EntityId, EntityRef, Kwargs, MethodRef};

/// What an entity method was attempting when it suspended, still unsent.
/// `None` means the suspension re-enters an interaction that was already
/// logged and is still awaiting a reply — nothing new to emit (§4.3).
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PendingInteraction {
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

/// Everything an entity method body can do besides return normally
/// (§7). `Suspend` is the coroutine-free suspension signal: it never
/// reaches a caller of [`crate::Execution::complete`], only the driver
/// loop inside it, which is the sole place that catches it.
#[derive(Debug)]
pub enum MethodError {
    Suspend,
    Fault(Fault),
    Domain(anyhow::Error),
}

impl fmt::Display for MethodError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Suspend => write!(f, "suspended"),
            Self::Fault(fault) => write!(f, "{fault}"),
            Self::Domain(err) => write!(f, "{err}"),
        }
    }
}

impl From<Fault> for MethodError {
    fn from(fault: Fault) -> Self {
        MethodError::Fault(fault)
    }
}

impl From<anyhow::Error> for MethodError {
    fn from(err: anyhow::Error) -> Self {
        MethodError::Domain(err)
    }
}

/// The Interaction Interceptor (§4.4): the only door an entity method
/// has to the outside world. Every call through it is checked against
/// the replay queue before it's allowed to look like a fresh
/// interaction.
pub struct CallContext<'a> {
    queue: &'a mut VecDeque<LoggedInteraction>,
    pending: &'a mut Option<PendingInteraction>,
}

impl<'a> CallContext<'a> {
    pub(crate) fn new(
        queue: &'a mut VecDeque<LoggedInteraction>,
        pending: &'a mut Option<PendingInteraction>,
    ) -> Self {
        Self { queue, pending }
    }

    /// The Subject Proxy: a handle to the entity this execution belongs
    /// to, usable anywhere an [`EntityRef`] is expected. Resolving it to
    /// a real address is a host concern; the engine only needs it to
    /// compare equal to itself.
    pub fn subject(&self) -> EntityRef {
        EntityRef::Subject
    }

    pub fn call_method(
        &mut self,
        receiver: EntityRef,
        method: MethodRef,
        args: Args,
        kwargs: Kwargs,
    ) -> Result<ArgValue, MethodError> {
        let fingerprint = InteractionFingerprint::MethodCall {
            receiver: receiver.clone(),
            method: method.clone(),
            args: args.clone(),
            kwargs: kwargs.clone(),
        };
        match self.pop_matching(fingerprint)? {
            Some(LoggedResponse::Value(value)) => Ok(value),
            Some(LoggedResponse::Entity(_)) => Err(Fault::log_inconsistency(
                "logged response to a method call was an entity handle",
            )
            .into()),
            None => {
                self.suspend_new(PendingInteraction::MethodCall {
                    receiver,
                    method,
                    args,
                    kwargs,
                });
                Err(MethodError::Suspend)
            }
        }
    }

    pub fn create_entity(
        &mut self,
        entity_type: impl Into<String>,
        args: Args,
        kwargs: Kwargs,
    ) -> Result<EntityId, MethodError> {
        let entity_type = entity_type.into();
        let fingerprint = InteractionFingerprint::CreateEntity {
            entity_type: entity_type.clone(),
            args: args.clone(),
            kwargs: kwargs.clone(),
        };
        match self.pop_matching(fingerprint)? {
            Some(LoggedResponse::Entity(id)) => Ok(id),
            Some(LoggedResponse::Value(_)) => Err(Fault::log_inconsistency(
                "logged response to a create-entity request was not an entity handle",
            )
            .into()),
            None => {
                self.suspend_new(PendingInteraction::CreateEntity {
                    entity_type,
                    args,
                    kwargs,
                });
                Err(MethodError::Suspend)
            }
        }
    }

    pub fn call_service(
        &mut self,
        service: impl Into<String>,
        args: Args,
        kwargs: Kwargs,
    ) -> Result<ArgValue, MethodError> {
        let service = service.into();
        let fingerprint = InteractionFingerprint::ServiceCall {
            service: service.clone(),
            args: args.clone(),
            kwargs: kwargs.clone(),
        };
        match self.pop_matching(fingerprint)? {
            Some(LoggedResponse::Value(value)) => Ok(value),
            Some(LoggedResponse::Entity(_)) => Err(Fault::log_inconsistency(
                "logged response to a service call was an entity handle",
            )
            .into()),
            None => {
                self.suspend_new(PendingInteraction::ServiceCall {
                    service,
                    args,
                    kwargs,
                });
                Err(MethodError::Suspend)
            }
        }
    }

    /// Pops the front of the queue and checks it against `fingerprint`.
    /// `Ok(Some(response))` means the interaction was already answered
    /// and the method can keep running; `Ok(None)` means the queue was
    /// empty and this is a genuinely new interaction; `Err` covers both
    /// a shape mismatch and an already-logged-but-unanswered tail, the
    /// latter signaled by leaving `self.pending` untouched before
    /// returning `Suspend` from the caller.
    fn pop_matching(
        &mut self,
        fingerprint: InteractionFingerprint,
    ) -> Result<Option<LoggedResponse>, MethodError> {
        match self.queue.pop_front() {
            None => Ok(None),
            Some(logged) if logged.fingerprint != fingerprint => {
                Err(Fault::non_determinism(format!(
                    "replayed interaction does not match the log: expected {:?}, got {:?}",
                    logged.fingerprint, fingerprint
                ))
                .into())
            }
            Some(logged) => match logged.response {
                Some(response) => Ok(Some(response)),
                None => Err(MethodError::Suspend),
            },
        }
    }

    fn suspend_new(&mut self, interaction: PendingInteraction) {
        *self.pending = Some(interaction);
    }
}
