//! Canonical data model shared by the remote client, the overlay and the UI.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Prefix of ids synthesized on this machine (never assigned by the remote).
pub const LOCAL_ID_PREFIX: &str = "local-";

/// Attribute patch applied as a shallow overwrite of top-level keys.
pub type Patch = Map<String, Value>;

const MAX_SAFE_FLOAT: f64 = 9_007_199_254_740_992.0;

/// Entity identifier in its canonical string form.
///
/// Remote sources hand out numbers (`1`) or strings (`"64f0c2..."`); both are
/// normalized to a string at the boundary so `1` and `"1"` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(String);

impl EntityId {
  pub fn new(id: impl Into<String>) -> Self {
    Self(id.into())
  }

  /// Normalize a JSON value into an id. Empty strings and non-scalar values
  /// are not ids.
  pub fn from_value(value: &Value) -> Option<Self> {
    match value {
      Value::String(s) if !s.is_empty() => Some(Self(s.clone())),
      Value::Number(n) => {
        if let Some(i) = n.as_i64() {
          Some(Self(i.to_string()))
        } else if let Some(u) = n.as_u64() {
          Some(Self(u.to_string()))
        } else {
          // Past 2^53 floats are no longer exact integers and `as` saturates
          match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < MAX_SAFE_FLOAT => {
              Some(Self(format!("{}", f as i64)))
            }
            _ => Some(Self(n.to_string())),
          }
        }
      }
      _ => None,
    }
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// Whether this id was synthesized locally rather than assigned remotely.
  pub fn is_local(&self) -> bool {
    self.0.starts_with(LOCAL_ID_PREFIX)
  }
}

impl fmt::Display for EntityId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for EntityId {
  fn from(s: &str) -> Self {
    Self(s.to_string())
  }
}

impl From<String> for EntityId {
  fn from(s: String) -> Self {
    Self(s)
  }
}

impl From<u64> for EntityId {
  fn from(n: u64) -> Self {
    Self(n.to_string())
  }
}

impl Serialize for EntityId {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&self.0)
  }
}

impl<'de> Deserialize<'de> for EntityId {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let value = Value::deserialize(deserializer)?;
    EntityId::from_value(&value)
      .ok_or_else(|| serde::de::Error::custom(format!("invalid entity id: {}", value)))
  }
}

/// A record with an id plus free-form domain attributes (name, email, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
  pub id: EntityId,
  #[serde(flatten)]
  pub attributes: Map<String, Value>,
}

impl Entity {
  pub fn new(id: EntityId, attributes: Map<String, Value>) -> Self {
    Self { id, attributes }
  }

  /// Build an entity from a remote JSON object, lifting `id_field` out of the
  /// attribute map. Returns `None` when the object carries no usable id.
  pub fn from_remote(mut object: Map<String, Value>, id_field: &str) -> Option<Self> {
    let id = object.remove(id_field).as_ref().and_then(EntityId::from_value)?;
    // The flattened attributes must not shadow the canonical `id` key.
    object.remove("id");
    Some(Self {
      id,
      attributes: object,
    })
  }

  /// Display text for one attribute. Missing and null attributes are empty.
  pub fn text(&self, field: &str) -> String {
    match self.attributes.get(field) {
      None | Some(Value::Null) => String::new(),
      Some(Value::String(s)) => s.clone(),
      Some(other) => other.to_string(),
    }
  }

  /// Shallow-patch this entity in place. The id is never patched.
  pub fn apply(&mut self, patch: &Patch) {
    for (key, value) in patch {
      if key == "id" {
        continue;
      }
      self.attributes.insert(key.clone(), value.clone());
    }
  }

  /// A patched copy of this entity.
  pub fn patched(&self, patch: &Patch) -> Self {
    let mut copy = self.clone();
    copy.apply(patch);
    copy
  }
}

/// Remote operation kinds, used to label failures ("Create failed: 500").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
  Fetch,
  Create,
  Update,
  Delete,
}

impl Operation {
  pub fn verb(&self) -> &'static str {
    match self {
      Self::Fetch => "Fetch",
      Self::Create => "Create",
      Self::Update => "Update",
      Self::Delete => "Delete",
    }
  }
}

impl fmt::Display for Operation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.verb())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn object(value: Value) -> Map<String, Value> {
    match value {
      Value::Object(map) => map,
      _ => panic!("expected object"),
    }
  }

  #[test]
  fn test_numeric_and_string_ids_are_equal() {
    assert_eq!(EntityId::from_value(&json!(1)), Some(EntityId::from("1")));
    assert_eq!(EntityId::from_value(&json!("1")), Some(EntityId::from("1")));
    assert_eq!(EntityId::from_value(&json!(7.0)), Some(EntityId::from("7")));
  }

  #[test]
  fn test_large_float_ids_stay_distinct() {
    let a = EntityId::from_value(&json!(1e20)).unwrap();
    let b = EntityId::from_value(&json!(2e20)).unwrap();
    assert_ne!(a, b);
    assert_ne!(a.as_str(), i64::MAX.to_string());
  }

  #[test]
  fn test_empty_and_non_scalar_ids_rejected() {
    assert_eq!(EntityId::from_value(&json!("")), None);
    assert_eq!(EntityId::from_value(&json!(null)), None);
    assert_eq!(EntityId::from_value(&json!({"a": 1})), None);
  }

  #[test]
  fn test_local_ids() {
    assert!(EntityId::from("local-1700000000000").is_local());
    assert!(!EntityId::from("11").is_local());
  }

  #[test]
  fn test_entity_roundtrip_keeps_attributes() {
    let entity: Entity =
      serde_json::from_value(json!({"id": 3, "name": "Ann", "phone": "555"})).unwrap();
    assert_eq!(entity.id, EntityId::from("3"));
    assert_eq!(entity.text("name"), "Ann");

    let back = serde_json::to_value(&entity).unwrap();
    assert_eq!(back, json!({"id": "3", "name": "Ann", "phone": "555"}));
  }

  #[test]
  fn test_from_remote_with_custom_id_field() {
    let entity = Entity::from_remote(
      object(json!({"_id": "64f0", "name": "Binh", "age": 20})),
      "_id",
    )
    .unwrap();
    assert_eq!(entity.id.as_str(), "64f0");
    assert!(!entity.attributes.contains_key("_id"));
    assert_eq!(entity.text("age"), "20");
  }

  #[test]
  fn test_from_remote_without_id() {
    assert!(Entity::from_remote(object(json!({"name": "x"})), "id").is_none());
  }

  #[test]
  fn test_apply_is_shallow_and_keeps_id() {
    let mut entity = Entity::new(
      EntityId::from("1"),
      object(json!({"name": "Ann", "address": {"city": "Hue"}})),
    );
    entity.apply(&object(json!({"id": "99", "address": {"zip": "1"}})));
    assert_eq!(entity.id.as_str(), "1");
    assert_eq!(entity.attributes["address"], json!({"zip": "1"}));
    assert_eq!(entity.text("name"), "Ann");
  }

  #[test]
  fn test_operation_verbs() {
    assert_eq!(Operation::Create.to_string(), "Create");
    assert_eq!(Operation::Fetch.verb(), "Fetch");
  }
}
