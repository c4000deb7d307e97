//! In-memory store implementations
//!
//! Used by tests and by local runs without PostgreSQL. Each map entry stands
//! in for one table row; dashmap shard locks give the same single-row
//! atomicity the database provides.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::credential::{CredentialRepositoryError, CredentialStore};
use super::garage::{GarageRepositoryError, GarageStore};
use crate::core::db::models::{Car, CredentialRecord, OwnedResource, UserId};

/// Credential store backed by concurrent hash maps
#[derive(Default)]
pub struct InMemoryCredentialStore {
    records: DashMap<UserId, CredentialRecord>,
    logins: DashMap<String, UserId>,
    next_id: AtomicI64,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_login(
        &self,
        login: &str,
    ) -> Result<Option<CredentialRecord>, CredentialRepositoryError> {
        let Some(user_id) = self.logins.get(login).map(|id| *id) else {
            return Ok(None);
        };
        Ok(self.records.get(&user_id).map(|r| r.clone()))
    }

    async fn find_by_id(
        &self,
        user_id: UserId,
    ) -> Result<Option<CredentialRecord>, CredentialRepositoryError> {
        Ok(self.records.get(&user_id).map(|r| r.clone()))
    }

    async fn create(
        &self,
        login: &str,
        password_hash: &[u8],
        password_salt: &[u8],
    ) -> Result<UserId, CredentialRepositoryError> {
        match self.logins.entry(login.to_string()) {
            Entry::Occupied(_) => Err(CredentialRepositoryError::LoginAlreadyExists),
            Entry::Vacant(slot) => {
                let user_id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
                self.records.insert(
                    user_id,
                    CredentialRecord {
                        user_id,
                        login: login.to_string(),
                        password_hash: password_hash.to_vec(),
                        password_salt: password_salt.to_vec(),
                        session_epoch: None,
                        last_login_at: Some(Utc::now()),
                    },
                );
                slot.insert(user_id);
                Ok(user_id)
            }
        }
    }

    async fn reset_password(
        &self,
        user_id: UserId,
        password_hash: &[u8],
        password_salt: &[u8],
    ) -> Result<(), CredentialRepositoryError> {
        let mut record = self
            .records
            .get_mut(&user_id)
            .ok_or(CredentialRepositoryError::NotFound)?;
        record.password_hash = password_hash.to_vec();
        record.password_salt = password_salt.to_vec();
        record.session_epoch = None;
        Ok(())
    }

    async fn update_session_epoch(
        &self,
        user_id: UserId,
        session_epoch: Option<&str>,
        last_login_at: Option<DateTime<Utc>>,
    ) -> Result<(), CredentialRepositoryError> {
        let mut record = self
            .records
            .get_mut(&user_id)
            .ok_or(CredentialRepositoryError::NotFound)?;
        record.session_epoch = session_epoch.map(str::to_string);
        if last_login_at.is_some() {
            record.last_login_at = last_login_at;
        }
        Ok(())
    }

    async fn rotate_session_epoch(
        &self,
        user_id: UserId,
        current: &str,
        next: &str,
    ) -> Result<bool, CredentialRepositoryError> {
        let Some(mut record) = self.records.get_mut(&user_id) else {
            return Ok(false);
        };
        if record.session_epoch.as_deref() != Some(current) {
            return Ok(false);
        }
        record.session_epoch = Some(next.to_string());
        Ok(true)
    }
}

/// Garage store backed by concurrent hash maps
#[derive(Default)]
pub struct InMemoryGarageStore {
    cars: DashMap<i64, Car>,
    groups: DashMap<i64, UserId>,
    /// service id -> car id
    services: DashMap<i64, i64>,
}

impl InMemoryGarageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_car(&self, car: Car) {
        self.cars.insert(car.car_id, car);
    }

    pub fn add_group(&self, group_id: i64, user_id: UserId) {
        self.groups.insert(group_id, user_id);
    }

    pub fn add_service(&self, service_id: i64, car_id: i64) {
        self.services.insert(service_id, car_id);
    }
}

#[async_trait]
impl GarageStore for InMemoryGarageStore {
    async fn owner_of(
        &self,
        resource: OwnedResource,
    ) -> Result<Option<UserId>, GarageRepositoryError> {
        let owner = match resource {
            OwnedResource::Car(id) => self.cars.get(&id).map(|c| c.user_id),
            OwnedResource::Group(id) => self.groups.get(&id).map(|u| *u),
            OwnedResource::Service(id) => self
                .services
                .get(&id)
                .and_then(|car_id| self.cars.get(&*car_id).map(|c| c.user_id)),
        };
        Ok(owner)
    }

    async fn list_cars(&self, user_id: UserId) -> Result<Vec<Car>, GarageRepositoryError> {
        let mut cars: Vec<Car> = self
            .cars
            .iter()
            .filter(|c| c.user_id == user_id)
            .map(|c| c.clone())
            .collect();
        cars.sort_by_key(|c| c.car_id);
        Ok(cars)
    }

    async fn find_car(&self, car_id: i64) -> Result<Option<Car>, GarageRepositoryError> {
        Ok(self.cars.get(&car_id).map(|c| c.clone()))
    }
}
