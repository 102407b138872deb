use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a materialized entity, as handed back by the host in a
/// `CreateEntityResponseReceived` or referenced by state snapshots.
///
/// Opaque to the engine beyond equality — matches §9's guidance to break
/// cyclic entity references (`User <-> Article <-> Comment`) by identity
/// handle rather than embedded value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A receiver position: either a concrete entity or the Subject Proxy
/// standing in for "the entity this execution belongs to" (§3).
///
/// `Subject` is a reflexive sentinel: replay matching only ever needs
/// structural equality between a logged argument and a freshly attempted
/// one, never an actual identity lookup, so `Subject == Subject` holds
/// without the engine ever resolving what the subject's id is. Resolving
/// it to a transport-level address is a host concern (§1), out of scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum EntityRef {
    Subject,
    Entity(EntityId),
}

/// An unbound (entity type, method name) pair — the engine's only notion
/// of a Method Reference (§3). The engine never looks inside a method
/// body; it identifies calls purely by this pair plus arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodRef {
    pub entity_type: String,
    pub method: String,
}

impl MethodRef {
    pub fn new(entity_type: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            method: method.into(),
        }
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.entity_type, self.method)
    }
}

/// An opaque structured argument or return value (§6: "arguments are
/// carried as opaque structured values whose equality is well-defined").
///
/// Domain-agnostic JSON carries most payloads, mirroring how the teacher
/// service treats event payloads as opaque `serde_json::Value` blobs; the
/// `Subject` and `Entity` variants are first-class instead of being
/// smuggled through a string convention, since the subject placeholder
/// is exactly the one argument shape the engine must special-case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum ArgValue {
    Subject,
    Entity(EntityId),
    Json(serde_json::Value),
    Unit,
}

impl ArgValue {
    pub fn json(value: impl Into<serde_json::Value>) -> Self {
        Self::Json(value.into())
    }

    pub fn as_entity(&self) -> Option<&EntityId> {
        match self {
            Self::Entity(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }
}

impl From<EntityRef> for ArgValue {
    fn from(r: EntityRef) -> Self {
        match r {
            EntityRef::Subject => ArgValue::Subject,
            EntityRef::Entity(id) => ArgValue::Entity(id),
        }
    }
}

pub type Args = Vec<ArgValue>;
pub type Kwargs = BTreeMap<String, ArgValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_is_reflexive() {
        assert_eq!(EntityRef::Subject, EntityRef::Subject);
        assert_eq!(ArgValue::Subject, ArgValue::Subject);
    }

    #[test]
    fn subject_does_not_equal_a_concrete_entity() {
        let concrete = EntityRef::Entity(EntityId::new("article-1"));
        assert_ne!(EntityRef::Subject, concrete);
    }

    #[test]
    fn method_ref_display() {
        let m = MethodRef::new("Article", "add_comment");
        assert_eq!(m.to_string(), "Article.add_comment");
    }
}
