//! In-memory storage backend.
//!
//! Keeps the whole collection behind one mutex, so writes are serialized the
//! same way a single database connection would serialize them. Passwords are
//! never kept in the clear; accounts store a SHA-512 hex digest and
//! verification compares digests.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha512};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{info, warn};

use super::{StoreError, UserId, VehicleStore};
use crate::vehicles::Vehicle;

struct Inner {
    vehicles: HashMap<i32, Vehicle>,
    // login -> (id, password digest)
    users: HashMap<String, (UserId, String)>,
    next_vehicle_id: i32,
    next_user_id: UserId,
}

/// Hash-map backed [`VehicleStore`].
pub struct MemoryStore {
    inner: Mutex<Inner>,
    init_date: DateTime<Utc>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                vehicles: HashMap::new(),
                users: HashMap::new(),
                next_vehicle_id: 1,
                next_user_id: 1,
            }),
            init_date: Utc::now(),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Backend("store lock poisoned".to_string()))
    }

    fn hash_password(password: &str) -> String {
        let digest = Sha512::digest(password.as_bytes());
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VehicleStore for MemoryStore {
    fn next_id(&self) -> Result<i32, StoreError> {
        let mut inner = self.lock()?;
        let id = inner.next_vehicle_id;
        inner.next_vehicle_id += 1;
        Ok(id)
    }

    fn insert(&self, vehicle: Vehicle) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner.vehicles.insert(vehicle.id, vehicle);
        Ok(())
    }

    fn update(&self, id: i32, vehicle: Vehicle) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        if !inner.vehicles.contains_key(&id) {
            return Err(StoreError::NotFound(id));
        }
        inner.vehicles.insert(id, vehicle);
        Ok(())
    }

    fn remove_key(&self, id: i32) -> Result<Vehicle, StoreError> {
        let mut inner = self.lock()?;
        inner.vehicles.remove(&id).ok_or(StoreError::NotFound(id))
    }

    fn truncate(&self) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner.vehicles.clear();
        info!("truncated vehicle collection");
        Ok(())
    }

    fn reset_ids(&self) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner.next_vehicle_id = 1;
        Ok(())
    }

    fn sync_all(&self) -> Result<Vec<Vehicle>, StoreError> {
        let inner = self.lock()?;
        Ok(inner.vehicles.values().cloned().collect())
    }

    fn get(&self, id: i32) -> Result<Option<Vehicle>, StoreError> {
        let inner = self.lock()?;
        Ok(inner.vehicles.get(&id).cloned())
    }

    fn len(&self) -> Result<usize, StoreError> {
        let inner = self.lock()?;
        Ok(inner.vehicles.len())
    }

    fn init_date(&self) -> DateTime<Utc> {
        self.init_date
    }

    fn type_name(&self) -> &'static str {
        "memory"
    }

    fn create_user(&self, login: &str, password: &str) -> Result<UserId, StoreError> {
        let mut inner = self.lock()?;
        if inner.users.contains_key(login) {
            return Err(StoreError::DuplicateLogin(login.to_string()));
        }
        let id = inner.next_user_id;
        inner.next_user_id += 1;
        let digest = Self::hash_password(password);
        inner.users.insert(login.to_string(), (id, digest));
        info!(login, id, "created user");
        Ok(id)
    }

    fn verify_login(&self, login: &str, password: &str) -> Result<Option<UserId>, StoreError> {
        let inner = self.lock()?;
        let digest = Self::hash_password(password);
        Ok(match inner.users.get(login) {
            Some((id, stored)) if *stored == digest => Some(*id),
            _ => None,
        })
    }

    fn reset_users(&self) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner.users.clear();
        inner.next_user_id = 1;
        warn!("reset user accounts by admin command");
        Ok(())
    }
}
