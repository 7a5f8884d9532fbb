//! Reconciler that owns one overlay slot and keeps it consistent.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

use super::store::OverlayStore;
use super::Overlay;
use crate::error::StoreError;
use crate::model::{EntityId, Patch};

/// Loads, saves and mutates the overlay stored in a single slot.
///
/// Every load-modify-save cycle runs under one async mutex, so rapid repeated
/// actions in this process cannot lose each other's writes. The lock is never
/// held across a remote call. Other processes sharing the slot are
/// last-writer-wins.
pub struct Reconciler<S: OverlayStore> {
  store: Arc<S>,
  slot: String,
  write_lock: Arc<Mutex<()>>,
}

impl<S: OverlayStore> Reconciler<S> {
  pub fn new(store: S, slot: impl Into<String>) -> Self {
    Self {
      store: Arc::new(store),
      slot: slot.into(),
      write_lock: Arc::new(Mutex::new(())),
    }
  }

  pub fn slot(&self) -> &str {
    &self.slot
  }

  /// Read the persisted overlay. Missing, unreadable or malformed storage
  /// yields an empty overlay.
  pub fn load(&self) -> Overlay {
    match self.store.read_slot(&self.slot) {
      Ok(None) => Overlay::default(),
      Ok(Some(raw)) => Overlay::from_json(&raw).unwrap_or_else(|e| {
        warn!(slot = %self.slot, error = %e, "Failed to parse local changes, starting empty");
        Overlay::default()
      }),
      Err(e) => {
        warn!(slot = %self.slot, error = %e, "Failed to load local changes, starting empty");
        Overlay::default()
      }
    }
  }

  /// Persist the overlay in full.
  pub fn save(&self, overlay: &Overlay) -> Result<(), StoreError> {
    let data = overlay.to_json()?;
    self.store.write_slot(&self.slot, &data)
  }

  /// Record a create; returns the id it was stored under and the new overlay.
  pub async fn record_create(
    &self,
    attributes: Patch,
    assigned: Option<EntityId>,
  ) -> Result<(EntityId, Overlay), StoreError> {
    self
      .mutate(|overlay| overlay.record_create(attributes, assigned))
      .await
  }

  pub async fn record_update(&self, id: &EntityId, patch: &Patch) -> Result<Overlay, StoreError> {
    let ((), overlay) = self.mutate(|overlay| overlay.record_update(id, patch)).await?;
    Ok(overlay)
  }

  pub async fn record_delete(&self, id: &EntityId) -> Result<Overlay, StoreError> {
    let ((), overlay) = self.mutate(|overlay| overlay.record_delete(id)).await?;
    Ok(overlay)
  }

  async fn mutate<R>(&self, f: impl FnOnce(&mut Overlay) -> R) -> Result<(R, Overlay), StoreError> {
    let _guard = self.write_lock.lock().await;
    let mut overlay = self.load();
    let result = f(&mut overlay);
    self.save(&overlay)?;
    Ok((result, overlay))
  }
}

impl<S: OverlayStore> Clone for Reconciler<S> {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
      slot: self.slot.clone(),
      write_lock: Arc::clone(&self.write_lock),
    }
  }
}
