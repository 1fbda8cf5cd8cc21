//! # Persistence Collaborator
//!
//! The storage interface the command handlers operate through.
//!
//! The protocol core treats storage as an opaque synchronous dependency: it
//! may block on I/O (which is why dispatch never runs on the event-loop
//! task) and it serializes its own writes. Implementations surface failures
//! as [`StoreError`]; the pipeline forwards them verbatim to the client as
//! ERROR responses.

pub mod memory;

pub use memory::MemoryStore;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::vehicles::Vehicle;

/// Numeric identity of an authenticated account owner.
pub type UserId = i32;

/// Failures raised by a storage backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("vehicle with key {0} not found")]
    NotFound(i32),

    #[error("user {0} already exists")]
    DuplicateLogin(String),

    #[error("{0}")]
    Backend(String),
}

/// Storage operations consumed by the command handlers and the auth gate.
pub trait VehicleStore: Send + Sync {
    /// Next value of the vehicle id sequence.
    fn next_id(&self) -> Result<i32, StoreError>;

    fn insert(&self, vehicle: Vehicle) -> Result<(), StoreError>;

    /// Replace the record stored under `id`.
    fn update(&self, id: i32, vehicle: Vehicle) -> Result<(), StoreError>;

    /// Remove and return the record stored under `id`.
    fn remove_key(&self, id: i32) -> Result<Vehicle, StoreError>;

    /// Drop every vehicle record.
    fn truncate(&self) -> Result<(), StoreError>;

    /// Restart the vehicle id sequence from 1.
    fn reset_ids(&self) -> Result<(), StoreError>;

    /// Snapshot of every record.
    fn sync_all(&self) -> Result<Vec<Vehicle>, StoreError>;

    fn get(&self, id: i32) -> Result<Option<Vehicle>, StoreError>;

    fn len(&self) -> Result<usize, StoreError>;

    fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// When this store instance was initialized.
    fn init_date(&self) -> DateTime<Utc>;

    /// Human-readable backend name, reported by `info`.
    fn type_name(&self) -> &'static str;

    fn create_user(&self, login: &str, password: &str) -> Result<UserId, StoreError>;

    /// Check credentials; `Ok(None)` means the pair was rejected.
    fn verify_login(&self, login: &str, password: &str) -> Result<Option<UserId>, StoreError>;

    /// Drop every account and restart the user id sequence.
    fn reset_users(&self) -> Result<(), StoreError>;
}
