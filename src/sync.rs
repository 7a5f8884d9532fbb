//! Remote client with a local-first overlay on top.

use serde_json::Value;
use tracing::info;

use crate::config::FieldConfig;
use crate::error::SyncError;
use crate::model::{Entity, EntityId, Operation, Patch};
use crate::overlay::{Overlay, OverlayStore, Reconciler, SqliteStore};
use crate::remote::RemoteClient;

/// A remote snapshot together with the overlay read right after it.
#[derive(Debug, Clone)]
pub struct Snapshot {
  pub remote: Vec<Entity>,
  pub overlay: Overlay,
}

/// Runs each user intent against the remote first and only records it in the
/// overlay once the remote accepted it. A failed call leaves the overlay
/// exactly as it was.
pub struct SyncedClient<S: OverlayStore = SqliteStore> {
  remote: RemoteClient,
  reconciler: Reconciler<S>,
  fields: Vec<FieldConfig>,
}

impl<S: OverlayStore> SyncedClient<S> {
  pub fn new(remote: RemoteClient, reconciler: Reconciler<S>, fields: Vec<FieldConfig>) -> Self {
    Self {
      remote,
      reconciler,
      fields,
    }
  }

  pub fn remote(&self) -> &RemoteClient {
    &self.remote
  }

  pub fn reconciler(&self) -> &Reconciler<S> {
    &self.reconciler
  }

  pub fn fields(&self) -> &[FieldConfig] {
    &self.fields
  }

  /// Fetch the remote collection, then read the overlay fresh.
  pub async fn fetch(&self) -> Result<Snapshot, SyncError> {
    let remote = self.remote.list().await?;
    let overlay = self.reconciler.load();
    info!(
      remote = remote.len(),
      pending = overlay.pending_count(),
      "Loaded users"
    );
    Ok(Snapshot { remote, overlay })
  }

  /// Trim string values and check required fields. Nothing here touches the
  /// network.
  pub fn validate(&self, op: Operation, form: Patch) -> Result<Patch, SyncError> {
    let cleaned: Patch = form
      .into_iter()
      .map(|(key, value)| match value {
        Value::String(s) => (key, Value::String(s.trim().to_string())),
        other => (key, other),
      })
      .collect();

    let missing = self.fields.iter().filter(|f| f.required).any(|f| {
      match cleaned.get(&f.name) {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
      }
    });

    if missing {
      let action = match op {
        Operation::Update => "saving",
        _ => "creating",
      };
      return Err(SyncError::Validation(format!(
        "Fill all fields before {}",
        action
      )));
    }

    Ok(cleaned)
  }

  /// Create a record remotely, then keep it in the overlay.
  pub async fn create(&self, form: Patch) -> Result<(EntityId, Overlay), SyncError> {
    let op = Operation::Create;
    let attributes = self.validate(op, form)?;
    let assigned = self.remote.create(&attributes).await?;

    let (id, overlay) = self
      .reconciler
      .record_create(attributes, assigned)
      .await
      .map_err(|source| SyncError::Store { op, source })?;
    info!(%id, "User created");
    Ok((id, overlay))
  }

  /// Update a record. Locally synthesized ids were never seen by the remote,
  /// so they go straight to the overlay.
  pub async fn update(&self, id: &EntityId, form: Patch) -> Result<Overlay, SyncError> {
    let op = Operation::Update;
    let patch = self.validate(op, form)?;
    if !id.is_local() {
      self.remote.update(id, &patch).await?;
    }

    let overlay = self
      .reconciler
      .record_update(id, &patch)
      .await
      .map_err(|source| SyncError::Store { op, source })?;
    info!(%id, "User updated");
    Ok(overlay)
  }

  /// Delete a record; locally synthesized ids skip the remote call.
  pub async fn delete(&self, id: &EntityId) -> Result<Overlay, SyncError> {
    let op = Operation::Delete;
    if !id.is_local() {
      self.remote.delete(id).await?;
    }

    let overlay = self
      .reconciler
      .record_delete(id)
      .await
      .map_err(|source| SyncError::Store { op, source })?;
    info!(%id, "User deleted");
    Ok(overlay)
  }
}

impl<S: OverlayStore> Clone for SyncedClient<S> {
  fn clone(&self) -> Self {
    Self {
      remote: self.remote.clone(),
      reconciler: self.reconciler.clone(),
      fields: self.fields.clone(),
    }
  }
}
