use std::sync::Arc;

use crate::{
    error::{Error, Result, StoreError},
    model::{SavedLocation, User},
    store::UserStore,
};

pub const MAX_SAVED_LOCATIONS: usize = 5;

/// Per-user favorite locations: at most [`MAX_SAVED_LOCATIONS`], unique by id,
/// insertion ordered.
#[derive(Debug, Clone)]
pub struct SavedLocationManager {
    store: Arc<dyn UserStore>,
}

impl SavedLocationManager {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    async fn user(&self, user_id: &str) -> Result<User> {
        self.store.find_by_id(user_id).await?.ok_or(Error::UserNotFound)
    }

    async fn persist(&self, user_id: &str, locations: &[SavedLocation]) -> Result<()> {
        self.store
            .update_saved_locations(user_id, locations)
            .await
            .map_err(|e| match e {
                StoreError::UserNotFound(_) => Error::UserNotFound,
                other => Error::Storage(other),
            })
    }

    pub async fn list(&self, user_id: &str) -> Result<Vec<SavedLocation>> {
        Ok(self.user(user_id).await?.saved_locations)
    }

    /// Appends `location`. The capacity check runs before the duplicate check.
    pub async fn add(&self, user_id: &str, location: SavedLocation) -> Result<Vec<SavedLocation>> {
        let mut locations = self.user(user_id).await?.saved_locations;

        if locations.len() >= MAX_SAVED_LOCATIONS {
            return Err(Error::CapacityExceeded);
        }
        if locations.iter().any(|l| l.id == location.id) {
            return Err(Error::DuplicateLocation);
        }

        tracing::debug!(user_id, location_id = %location.id, "saving location");
        locations.push(location);
        self.persist(user_id, &locations).await?;
        Ok(locations)
    }

    /// Drops every entry with `location_id`; absent ids are not an error.
    pub async fn remove(&self, user_id: &str, location_id: &str) -> Result<Vec<SavedLocation>> {
        let mut locations = self.user(user_id).await?.saved_locations;

        locations.retain(|l| l.id != location_id);
        self.persist(user_id, &locations).await?;
        Ok(locations)
    }
}
