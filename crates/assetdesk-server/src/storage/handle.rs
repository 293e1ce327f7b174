//! Shared storage handle
//!
//! Every consumer holds one long-lived `Arc<StorageHandle>`. The backend
//! behind it is chosen at start-up and swapped in place, so callers never
//! re-fetch the handle after a swap.

use arc_swap::ArcSwap;
use assetdesk_core::ports::{
    AccessoryStore, AssetStore, ConsumableStore, LicenseStore, Storage, UserStore,
};
use assetdesk_core::{
    Accessory, Asset, BackendKind, Consumable, License, NewAccessory, NewAsset, NewConsumable,
    NewLicense, NewUser, Result, User, UserUpdate,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

pub struct StorageHandle {
    active: ArcSwap<Arc<dyn Storage>>,
}

impl StorageHandle {
    pub fn new(initial: Arc<dyn Storage>) -> Self {
        Self {
            active: ArcSwap::from_pointee(initial),
        }
    }

    /// Bind a new backend. Single atomic store; in-flight calls finish on
    /// the backend they started with.
    pub fn swap(&self, backend: Arc<dyn Storage>) {
        let previous = self.kind();
        let next = backend.kind();
        self.active.store(Arc::new(backend));
        info!("Storage backend swapped: {} -> {}", previous, next);
    }

    /// The backend currently bound
    pub fn current(&self) -> Arc<dyn Storage> {
        let guard = self.active.load();
        let backend: &Arc<dyn Storage> = &guard;
        Arc::clone(backend)
    }
}

#[async_trait]
impl UserStore for StorageHandle {
    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        self.current().get_user(id).await
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.current().get_user_by_username(username).await
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        self.current().list_users().await
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        self.current().create_user(user).await
    }

    async fn update_user(&self, id: &str, update: UserUpdate) -> Result<Option<User>> {
        self.current().update_user(id, update).await
    }

    async fn delete_user(&self, id: &str) -> Result<bool> {
        self.current().delete_user(id).await
    }
}

#[async_trait]
impl AssetStore for StorageHandle {
    async fn list_assets(&self) -> Result<Vec<Asset>> {
        self.current().list_assets().await
    }

    async fn get_asset(&self, id: &str) -> Result<Option<Asset>> {
        self.current().get_asset(id).await
    }

    async fn create_asset(&self, asset: NewAsset) -> Result<Asset> {
        self.current().create_asset(asset).await
    }

    async fn update_asset(&self, id: &str, asset: NewAsset) -> Result<Option<Asset>> {
        self.current().update_asset(id, asset).await
    }

    async fn delete_asset(&self, id: &str) -> Result<bool> {
        self.current().delete_asset(id).await
    }
}

#[async_trait]
impl LicenseStore for StorageHandle {
    async fn list_licenses(&self) -> Result<Vec<License>> {
        self.current().list_licenses().await
    }

    async fn get_license(&self, id: &str) -> Result<Option<License>> {
        self.current().get_license(id).await
    }

    async fn create_license(&self, license: NewLicense) -> Result<License> {
        self.current().create_license(license).await
    }

    async fn update_license(&self, id: &str, license: NewLicense) -> Result<Option<License>> {
        self.current().update_license(id, license).await
    }

    async fn delete_license(&self, id: &str) -> Result<bool> {
        self.current().delete_license(id).await
    }
}

#[async_trait]
impl AccessoryStore for StorageHandle {
    async fn list_accessories(&self) -> Result<Vec<Accessory>> {
        self.current().list_accessories().await
    }

    async fn get_accessory(&self, id: &str) -> Result<Option<Accessory>> {
        self.current().get_accessory(id).await
    }

    async fn create_accessory(&self, accessory: NewAccessory) -> Result<Accessory> {
        self.current().create_accessory(accessory).await
    }

    async fn update_accessory(
        &self,
        id: &str,
        accessory: NewAccessory,
    ) -> Result<Option<Accessory>> {
        self.current().update_accessory(id, accessory).await
    }

    async fn delete_accessory(&self, id: &str) -> Result<bool> {
        self.current().delete_accessory(id).await
    }
}

#[async_trait]
impl ConsumableStore for StorageHandle {
    async fn list_consumables(&self) -> Result<Vec<Consumable>> {
        self.current().list_consumables().await
    }

    async fn get_consumable(&self, id: &str) -> Result<Option<Consumable>> {
        self.current().get_consumable(id).await
    }

    async fn create_consumable(&self, consumable: NewConsumable) -> Result<Consumable> {
        self.current().create_consumable(consumable).await
    }

    async fn update_consumable(
        &self,
        id: &str,
        consumable: NewConsumable,
    ) -> Result<Option<Consumable>> {
        self.current().update_consumable(id, consumable).await
    }

    async fn delete_consumable(&self, id: &str) -> Result<bool> {
        self.current().delete_consumable(id).await
    }
}

impl Storage for StorageHandle {
    fn kind(&self) -> BackendKind {
        self.active.load().kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use assetdesk_core::Permissions;

    fn user(name: &str) -> NewUser {
        NewUser {
            username: name.to_string(),
            password_hash: "h".to_string(),
            first_name: None,
            last_name: None,
            email: None,
            department: None,
            is_admin: false,
            permissions: Permissions::default(),
        }
    }

    #[tokio::test]
    async fn test_existing_holders_see_swap() {
        let handle = Arc::new(StorageHandle::new(Arc::new(MemoryStorage::new())));
        let held_by_router = Arc::clone(&handle);

        handle.create_user(user("before")).await.unwrap();

        let replacement = Arc::new(MemoryStorage::new());
        replacement.create_user(user("after")).await.unwrap();
        handle.swap(replacement);

        // The clone taken before the swap resolves against the new backend
        assert!(held_by_router
            .get_user_by_username("after")
            .await
            .unwrap()
            .is_some());
        assert!(held_by_router
            .get_user_by_username("before")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_kind_follows_backend() {
        let handle = StorageHandle::new(Arc::new(MemoryStorage::new()));
        assert_eq!(handle.kind(), BackendKind::Memory);
    }
}
