//! In-memory storage backend using DashMap
//!
//! Default backend. Nothing survives a restart.

use assetdesk_core::ports::{
    AccessoryStore, AssetStore, ConsumableStore, LicenseStore, Storage, UserStore,
};
use assetdesk_core::{
    Accessory, Asset, BackendKind, Consumable, DeskError, License, NewAccessory, NewAsset,
    NewConsumable, NewLicense, NewUser, Result, User, UserUpdate,
};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

pub struct MemoryStorage {
    users: DashMap<String, User>,
    /// username -> user id
    usernames: DashMap<String, String>,
    assets: DashMap<String, Asset>,
    /// asset tag -> asset id
    asset_tags: DashMap<String, String>,
    licenses: DashMap<String, License>,
    accessories: DashMap<String, Accessory>,
    consumables: DashMap<String, Consumable>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            usernames: DashMap::new(),
            assets: DashMap::new(),
            asset_tags: DashMap::new(),
            licenses: DashMap::new(),
            accessories: DashMap::new(),
            consumables: DashMap::new(),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot a table ordered by creation time
fn sorted<T: Clone, K: Ord>(map: &DashMap<String, T>, key: impl Fn(&T) -> K) -> Vec<T> {
    let mut items: Vec<T> = map.iter().map(|entry| entry.value().clone()).collect();
    items.sort_by_key(|item| key(item));
    items
}

#[async_trait]
impl UserStore for MemoryStorage {
    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        Ok(self.users.get(id).map(|u| u.clone()))
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let Some(id) = self.usernames.get(username).map(|id| id.clone()) else {
            return Ok(None);
        };
        self.get_user(&id).await
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        Ok(sorted(&self.users, |u| u.created_at))
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        let user = User::from_new(user);

        // Claim the username first so concurrent creates cannot both win.
        match self.usernames.entry(user.username.clone()) {
            Entry::Occupied(_) => {
                return Err(DeskError::Conflict(format!(
                    "username '{}' already exists",
                    user.username
                )))
            }
            Entry::Vacant(slot) => {
                slot.insert(user.id.clone());
            }
        }

        self.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn update_user(&self, id: &str, update: UserUpdate) -> Result<Option<User>> {
        Ok(self.users.get_mut(id).map(|mut user| {
            user.apply(update);
            user.clone()
        }))
    }

    async fn delete_user(&self, id: &str) -> Result<bool> {
        match self.users.remove(id) {
            Some((_, user)) => {
                self.usernames.remove(&user.username);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl AssetStore for MemoryStorage {
    async fn list_assets(&self) -> Result<Vec<Asset>> {
        Ok(sorted(&self.assets, |a| a.created_at))
    }

    async fn get_asset(&self, id: &str) -> Result<Option<Asset>> {
        Ok(self.assets.get(id).map(|a| a.clone()))
    }

    async fn create_asset(&self, asset: NewAsset) -> Result<Asset> {
        let asset = Asset::from_new(asset);

        match self.asset_tags.entry(asset.asset_tag.clone()) {
            Entry::Occupied(_) => {
                return Err(DeskError::Conflict(format!(
                    "asset tag '{}' already exists",
                    asset.asset_tag
                )))
            }
            Entry::Vacant(slot) => {
                slot.insert(asset.id.clone());
            }
        }

        self.assets.insert(asset.id.clone(), asset.clone());
        Ok(asset)
    }

    async fn update_asset(&self, id: &str, asset: NewAsset) -> Result<Option<Asset>> {
        let Some(mut existing) = self.assets.get_mut(id) else {
            return Ok(None);
        };

        if existing.asset_tag != asset.asset_tag {
            match self.asset_tags.entry(asset.asset_tag.clone()) {
                Entry::Occupied(_) => {
                    return Err(DeskError::Conflict(format!(
                        "asset tag '{}' already exists",
                        asset.asset_tag
                    )))
                }
                Entry::Vacant(slot) => {
                    slot.insert(id.to_string());
                }
            }
            self.asset_tags.remove(&existing.asset_tag);
        }

        existing.replace_with(asset);
        Ok(Some(existing.clone()))
    }

    async fn delete_asset(&self, id: &str) -> Result<bool> {
        match self.assets.remove(id) {
            Some((_, asset)) => {
                self.asset_tags.remove(&asset.asset_tag);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl LicenseStore for MemoryStorage {
    async fn list_licenses(&self) -> Result<Vec<License>> {
        Ok(sorted(&self.licenses, |l| l.created_at))
    }

    async fn get_license(&self, id: &str) -> Result<Option<License>> {
        Ok(self.licenses.get(id).map(|l| l.clone()))
    }

    async fn create_license(&self, license: NewLicense) -> Result<License> {
        let license = License::from_new(license);
        self.licenses.insert(license.id.clone(), license.clone());
        Ok(license)
    }

    async fn update_license(&self, id: &str, license: NewLicense) -> Result<Option<License>> {
        Ok(self.licenses.get_mut(id).map(|mut existing| {
            existing.replace_with(license);
            existing.clone()
        }))
    }

    async fn delete_license(&self, id: &str) -> Result<bool> {
        Ok(self.licenses.remove(id).is_some())
    }
}

#[async_trait]
impl AccessoryStore for MemoryStorage {
    async fn list_accessories(&self) -> Result<Vec<Accessory>> {
        Ok(sorted(&self.accessories, |a| a.created_at))
    }

    async fn get_accessory(&self, id: &str) -> Result<Option<Accessory>> {
        Ok(self.accessories.get(id).map(|a| a.clone()))
    }

    async fn create_accessory(&self, accessory: NewAccessory) -> Result<Accessory> {
        let accessory = Accessory::from_new(accessory);
        self.accessories
            .insert(accessory.id.clone(), accessory.clone());
        Ok(accessory)
    }

    async fn update_accessory(
        &self,
        id: &str,
        accessory: NewAccessory,
    ) -> Result<Option<Accessory>> {
        Ok(self.accessories.get_mut(id).map(|mut existing| {
            existing.replace_with(accessory);
            existing.clone()
        }))
    }

    async fn delete_accessory(&self, id: &str) -> Result<bool> {
        Ok(self.accessories.remove(id).is_some())
    }
}

#[async_trait]
impl ConsumableStore for MemoryStorage {
    async fn list_consumables(&self) -> Result<Vec<Consumable>> {
        Ok(sorted(&self.consumables, |c| c.created_at))
    }

    async fn get_consumable(&self, id: &str) -> Result<Option<Consumable>> {
        Ok(self.consumables.get(id).map(|c| c.clone()))
    }

    async fn create_consumable(&self, consumable: NewConsumable) -> Result<Consumable> {
        let consumable = Consumable::from_new(consumable);
        self.consumables
            .insert(consumable.id.clone(), consumable.clone());
        Ok(consumable)
    }

    async fn update_consumable(
        &self,
        id: &str,
        consumable: NewConsumable,
    ) -> Result<Option<Consumable>> {
        Ok(self.consumables.get_mut(id).map(|mut existing| {
            existing.replace_with(consumable);
            existing.clone()
        }))
    }

    async fn delete_consumable(&self, id: &str) -> Result<bool> {
        Ok(self.consumables.remove(id).is_some())
    }
}

impl Storage for MemoryStorage {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetdesk_core::{AssetStatus, Permissions};

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            password_hash: "hash".to_string(),
            first_name: None,
            last_name: None,
            email: None,
            department: None,
            is_admin: false,
            permissions: Permissions::default_user(),
        }
    }

    fn new_asset(tag: &str) -> NewAsset {
        NewAsset {
            asset_tag: tag.to_string(),
            name: "Monitor".to_string(),
            category: "display".to_string(),
            status: AssetStatus::Available,
            serial_number: None,
            model: None,
            manufacturer: None,
            location: None,
            assigned_to: None,
            purchase_date: None,
            purchase_cost: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_user_lookup_by_username() {
        let storage = MemoryStorage::new();

        let created = storage.create_user(new_user("jdoe")).await.unwrap();
        let found = storage.get_user_by_username("jdoe").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);

        assert!(storage.get_user_by_username("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let storage = MemoryStorage::new();

        storage.create_user(new_user("jdoe")).await.unwrap();
        let err = storage.create_user(new_user("jdoe")).await.unwrap_err();
        assert!(matches!(err, DeskError::Conflict(_)));
        assert_eq!(storage.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_user_frees_username() {
        let storage = MemoryStorage::new();

        let user = storage.create_user(new_user("jdoe")).await.unwrap();
        assert!(storage.delete_user(&user.id).await.unwrap());
        assert!(!storage.delete_user(&user.id).await.unwrap());
        storage.create_user(new_user("jdoe")).await.unwrap();
    }

    #[tokio::test]
    async fn test_asset_tag_change_on_update() {
        let storage = MemoryStorage::new();

        let first = storage.create_asset(new_asset("MON-1")).await.unwrap();
        storage.create_asset(new_asset("MON-2")).await.unwrap();

        // Taking another asset's tag is rejected
        let err = storage
            .update_asset(&first.id, new_asset("MON-2"))
            .await
            .unwrap_err();
        assert!(matches!(err, DeskError::Conflict(_)));

        // Moving to a free tag releases the old one
        let updated = storage
            .update_asset(&first.id, new_asset("MON-3"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.asset_tag, "MON-3");
        storage.create_asset(new_asset("MON-1")).await.unwrap();

        assert_eq!(storage.list_assets().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_update_missing_returns_none() {
        let storage = MemoryStorage::new();
        assert!(storage
            .update_asset("missing", new_asset("X"))
            .await
            .unwrap()
            .is_none());
        assert!(storage
            .update_user("missing", UserUpdate::default())
            .await
            .unwrap()
            .is_none());
    }
}
