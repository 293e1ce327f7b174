//! Storage traits for persistence

use crate::Result;
use assetdesk_types::{
    Accessory, Asset, BackendKind, Consumable, License, NewAccessory, NewAsset, NewConsumable,
    NewLicense, NewUser, User, UserUpdate,
};
use async_trait::async_trait;

/// User store
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, id: &str) -> Result<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn list_users(&self) -> Result<Vec<User>>;
    /// Fails with `Conflict` when the username is taken
    async fn create_user(&self, user: NewUser) -> Result<User>;
    async fn update_user(&self, id: &str, update: UserUpdate) -> Result<Option<User>>;
    async fn delete_user(&self, id: &str) -> Result<bool>;
}

/// Asset store
#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn list_assets(&self) -> Result<Vec<Asset>>;
    async fn get_asset(&self, id: &str) -> Result<Option<Asset>>;
    /// Fails with `Conflict` when the asset tag is taken
    async fn create_asset(&self, asset: NewAsset) -> Result<Asset>;
    async fn update_asset(&self, id: &str, asset: NewAsset) -> Result<Option<Asset>>;
    async fn delete_asset(&self, id: &str) -> Result<bool>;
}

/// License store
#[async_trait]
pub trait LicenseStore: Send + Sync {
    async fn list_licenses(&self) -> Result<Vec<License>>;
    async fn get_license(&self, id: &str) -> Result<Option<License>>;
    async fn create_license(&self, license: NewLicense) -> Result<License>;
    async fn update_license(&self, id: &str, license: NewLicense) -> Result<Option<License>>;
    async fn delete_license(&self, id: &str) -> Result<bool>;
}

/// Accessory store
#[async_trait]
pub trait AccessoryStore: Send + Sync {
    async fn list_accessories(&self) -> Result<Vec<Accessory>>;
    async fn get_accessory(&self, id: &str) -> Result<Option<Accessory>>;
    async fn create_accessory(&self, accessory: NewAccessory) -> Result<Accessory>;
    async fn update_accessory(
        &self,
        id: &str,
        accessory: NewAccessory,
    ) -> Result<Option<Accessory>>;
    async fn delete_accessory(&self, id: &str) -> Result<bool>;
}

/// Consumable store
#[async_trait]
pub trait ConsumableStore: Send + Sync {
    async fn list_consumables(&self) -> Result<Vec<Consumable>>;
    async fn get_consumable(&self, id: &str) -> Result<Option<Consumable>>;
    async fn create_consumable(&self, consumable: NewConsumable) -> Result<Consumable>;
    async fn update_consumable(
        &self,
        id: &str,
        consumable: NewConsumable,
    ) -> Result<Option<Consumable>>;
    async fn delete_consumable(&self, id: &str) -> Result<bool>;
}

/// The full operation set a backend provides
pub trait Storage: UserStore + AssetStore + LicenseStore + AccessoryStore + ConsumableStore {
    fn kind(&self) -> BackendKind;
}
