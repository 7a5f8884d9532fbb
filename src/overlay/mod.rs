//! Local-first overlay of pending creates, updates and deletes.
//!
//! The remote collection is authoritative for reads but forgets writes, so
//! every successful create/update/delete is also recorded here and replayed
//! on top of each fresh remote snapshot:
//! - `created` entities are shown first, newest first
//! - `updated` patches are applied shallowly to remote entities
//! - `deleted` ids are hidden even if the remote still returns them
//!
//! An id in `created` never appears in `updated` or `deleted`, and an id is
//! never in both `updated` and `deleted`.

mod reconciler;
mod store;

pub use reconciler::Reconciler;
pub use store::{default_slot, OverlayStore, SqliteStore};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use crate::model::{Entity, EntityId, Patch, LOCAL_ID_PREFIX};

/// Persisted overlay: `{created: Entity[], updated: {id: Patch}, deleted: id[]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
  #[serde(default, deserialize_with = "null_as_default")]
  pub created: Vec<Entity>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub updated: BTreeMap<EntityId, Patch>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub deleted: Vec<EntityId>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Default + Deserialize<'de>,
{
  Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Overlay {
  pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
    serde_json::from_str(raw)
  }

  pub fn to_json(&self) -> Result<String, serde_json::Error> {
    serde_json::to_string(self)
  }

  /// Number of pending local changes across all three parts.
  pub fn pending_count(&self) -> usize {
    self.created.len() + self.updated.len() + self.deleted.len()
  }

  /// Whether the entity exists only locally (created but never persisted remotely).
  pub fn is_created(&self, id: &EntityId) -> bool {
    self.created_position(id).is_some()
  }

  /// Whether a remote entity carries a pending local patch.
  pub fn is_updated(&self, id: &EntityId) -> bool {
    self.updated.contains_key(id)
  }

  pub fn is_deleted(&self, id: &EntityId) -> bool {
    self.deleted.contains(id)
  }

  fn created_position(&self, id: &EntityId) -> Option<usize> {
    self.created.iter().position(|e| &e.id == id)
  }

  fn tracks(&self, id: &EntityId) -> bool {
    self.is_created(id) || self.is_updated(id) || self.is_deleted(id)
  }

  /// Synthesize an id of the form `local-<millis>` not yet used in this overlay.
  pub fn synthesize_id(&self, now: DateTime<Utc>) -> EntityId {
    let mut millis = now.timestamp_millis();
    loop {
      let candidate = EntityId::new(format!("{}{}", LOCAL_ID_PREFIX, millis));
      if !self.tracks(&candidate) {
        return candidate;
      }
      millis += 1;
    }
  }

  /// Record a successful create and return the id the entity was stored under.
  ///
  /// `assigned` is the id returned by the remote, if any. A missing id, or one
  /// already tracked by the overlay, falls back to a synthesized local id.
  pub fn record_create(&mut self, attributes: Patch, assigned: Option<EntityId>) -> EntityId {
    let id = match assigned {
      Some(id) if !self.tracks(&id) => id,
      Some(id) => {
        debug!(%id, "remote id already tracked locally, synthesizing a local id");
        self.synthesize_id(Utc::now())
      }
      None => self.synthesize_id(Utc::now()),
    };

    let mut entity = Entity::new(id.clone(), Patch::new());
    entity.apply(&attributes);
    self.created.insert(0, entity);
    debug!(%id, "recorded local create");
    id
  }

  /// Record a successful update. Locally created entities are patched in
  /// place; remote entities accumulate a patch where newer fields win.
  pub fn record_update(&mut self, id: &EntityId, patch: &Patch) {
    if let Some(idx) = self.created_position(id) {
      self.created[idx].apply(patch);
      debug!(%id, "patched locally created entity");
      return;
    }

    let pending = self.updated.entry(id.clone()).or_default();
    for (key, value) in patch {
      if key == "id" {
        continue;
      }
      pending.insert(key.clone(), value.clone());
    }
    debug!(%id, "recorded remote update");
  }

  /// Record a successful delete. Locally created entities are dropped
  /// entirely; remote ids are hidden and lose any pending patch.
  pub fn record_delete(&mut self, id: &EntityId) {
    if let Some(idx) = self.created_position(id) {
      self.created.remove(idx);
      debug!(%id, "dropped locally created entity");
      return;
    }

    if !self.deleted.contains(id) {
      self.deleted.push(id.clone());
    }
    self.updated.remove(id);
    debug!(%id, "recorded remote delete");
  }
}

/// Compute the effective list: remote entities minus deletes, with patches
/// applied, preceded by the locally created entities (newest first).
pub fn merge(remote: &[Entity], overlay: &Overlay) -> Vec<Entity> {
  let deleted: HashSet<&EntityId> = overlay.deleted.iter().collect();

  let remaining = remote
    .iter()
    .filter(|entity| !deleted.contains(&entity.id))
    .map(|entity| match overlay.updated.get(&entity.id) {
      Some(patch) => entity.patched(patch),
      None => entity.clone(),
    });

  overlay.created.iter().cloned().chain(remaining).collect()
}
