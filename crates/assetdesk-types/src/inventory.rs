//! Inventory records: assets, licenses, accessories, consumables

use crate::ValidationError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Lifecycle state of a hardware asset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetStatus {
    #[default]
    Available,
    Deployed,
    Maintenance,
    Retired,
}

impl std::fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetStatus::Available => write!(f, "available"),
            AssetStatus::Deployed => write!(f, "deployed"),
            AssetStatus::Maintenance => write!(f, "maintenance"),
            AssetStatus::Retired => write!(f, "retired"),
        }
    }
}

impl std::str::FromStr for AssetStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(AssetStatus::Available),
            "deployed" => Ok(AssetStatus::Deployed),
            "maintenance" => Ok(AssetStatus::Maintenance),
            "retired" => Ok(AssetStatus::Retired),
            other => Err(ValidationError::new(
                "status",
                format!("unknown asset status: {}", other),
            )),
        }
    }
}

/// Hardware asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: String,
    pub asset_tag: String,
    pub name: String,
    pub category: String,
    pub status: AssetStatus,
    pub serial_number: Option<String>,
    pub model: Option<String>,
    pub manufacturer: Option<String>,
    pub location: Option<String>,
    pub assigned_to: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub purchase_cost: Option<f64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAsset {
    pub asset_tag: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub status: AssetStatus,
    pub serial_number: Option<String>,
    pub model: Option<String>,
    pub manufacturer: Option<String>,
    pub location: Option<String>,
    pub assigned_to: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub purchase_cost: Option<f64>,
    pub notes: Option<String>,
}

impl NewAsset {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.asset_tag.trim().is_empty() {
            return Err(ValidationError::new("assetTag", "asset tag is required"));
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::new("name", "name is required"));
        }
        if self.status == AssetStatus::Deployed && self.assigned_to.is_none() {
            return Err(ValidationError::new(
                "assignedTo",
                "a deployed asset must be assigned to a user",
            ));
        }
        Ok(())
    }
}

impl Asset {
    pub fn from_new(new: NewAsset) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            asset_tag: new.asset_tag,
            name: new.name,
            category: new.category,
            status: new.status,
            serial_number: new.serial_number,
            model: new.model,
            manufacturer: new.manufacturer,
            location: new.location,
            assigned_to: new.assigned_to,
            purchase_date: new.purchase_date,
            purchase_cost: new.purchase_cost,
            notes: new.notes,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace every editable field, keeping id and creation time
    pub fn replace_with(&mut self, new: NewAsset) {
        let created_at = self.created_at;
        let id = std::mem::take(&mut self.id);
        *self = Self::from_new(new);
        self.id = id;
        self.created_at = created_at;
    }
}

/// Software license
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct License {
    pub id: String,
    pub name: String,
    pub license_key: Option<String>,
    pub seats: i64,
    pub assigned_seats: i64,
    pub company: Option<String>,
    pub expiration_date: Option<NaiveDate>,
    pub purchase_cost: Option<f64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLicense {
    pub name: String,
    pub license_key: Option<String>,
    pub seats: i64,
    #[serde(default)]
    pub assigned_seats: i64,
    pub company: Option<String>,
    pub expiration_date: Option<NaiveDate>,
    pub purchase_cost: Option<f64>,
    pub notes: Option<String>,
}

impl NewLicense {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::new("name", "name is required"));
        }
        if self.seats < 0 || self.assigned_seats < 0 {
            return Err(ValidationError::new("seats", "seat counts cannot be negative"));
        }
        if self.assigned_seats > self.seats {
            return Err(ValidationError::new(
                "assignedSeats",
                format!(
                    "{} seats assigned but only {} available",
                    self.assigned_seats, self.seats
                ),
            ));
        }
        Ok(())
    }
}

impl License {
    pub fn from_new(new: NewLicense) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            name: new.name,
            license_key: new.license_key,
            seats: new.seats,
            assigned_seats: new.assigned_seats,
            company: new.company,
            expiration_date: new.expiration_date,
            purchase_cost: new.purchase_cost,
            notes: new.notes,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn replace_with(&mut self, new: NewLicense) {
        let created_at = self.created_at;
        let id = std::mem::take(&mut self.id);
        *self = Self::from_new(new);
        self.id = id;
        self.created_at = created_at;
    }

    pub fn free_seats(&self) -> i64 {
        self.seats - self.assigned_seats
    }
}

/// Accessory (keyboards, docks, cables...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessory {
    pub id: String,
    pub name: String,
    pub category: String,
    pub manufacturer: Option<String>,
    pub quantity: i64,
    pub available_quantity: i64,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccessory {
    pub name: String,
    pub category: String,
    pub manufacturer: Option<String>,
    pub quantity: i64,
    /// Defaults to `quantity` when omitted
    pub available_quantity: Option<i64>,
    pub location: Option<String>,
    pub notes: Option<String>,
}

impl NewAccessory {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::new("name", "name is required"));
        }
        if self.quantity < 0 {
            return Err(ValidationError::new("quantity", "quantity cannot be negative"));
        }
        let available = self.available_quantity.unwrap_or(self.quantity);
        if available < 0 || available > self.quantity {
            return Err(ValidationError::new(
                "availableQuantity",
                "available quantity must be between 0 and quantity",
            ));
        }
        Ok(())
    }
}

impl Accessory {
    pub fn from_new(new: NewAccessory) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            available_quantity: new.available_quantity.unwrap_or(new.quantity),
            name: new.name,
            category: new.category,
            manufacturer: new.manufacturer,
            quantity: new.quantity,
            location: new.location,
            notes: new.notes,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn replace_with(&mut self, new: NewAccessory) {
        let created_at = self.created_at;
        let id = std::mem::take(&mut self.id);
        *self = Self::from_new(new);
        self.id = id;
        self.created_at = created_at;
    }
}

/// Consumable stock (toner, paper...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Consumable {
    pub id: String,
    pub name: String,
    pub category: String,
    pub manufacturer: Option<String>,
    pub quantity: i64,
    pub min_quantity: i64,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewConsumable {
    pub name: String,
    pub category: String,
    pub manufacturer: Option<String>,
    pub quantity: i64,
    #[serde(default)]
    pub min_quantity: i64,
    pub location: Option<String>,
    pub notes: Option<String>,
}

impl NewConsumable {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::new("name", "name is required"));
        }
        if self.quantity < 0 || self.min_quantity < 0 {
            return Err(ValidationError::new("quantity", "quantities cannot be negative"));
        }
        Ok(())
    }
}

impl Consumable {
    pub fn from_new(new: NewConsumable) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            name: new.name,
            category: new.category,
            manufacturer: new.manufacturer,
            quantity: new.quantity,
            min_quantity: new.min_quantity,
            location: new.location,
            notes: new.notes,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn replace_with(&mut self, new: NewConsumable) {
        let created_at = self.created_at;
        let id = std::mem::take(&mut self.id);
        *self = Self::from_new(new);
        self.id = id;
        self.created_at = created_at;
    }

    pub fn below_minimum(&self) -> bool {
        self.quantity < self.min_quantity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn laptop() -> NewAsset {
        NewAsset {
            asset_tag: "LT-0001".to_string(),
            name: "ThinkPad T14".to_string(),
            category: "laptop".to_string(),
            status: AssetStatus::Available,
            serial_number: Some("PF3XYZ".to_string()),
            model: None,
            manufacturer: Some("Lenovo".to_string()),
            location: None,
            assigned_to: None,
            purchase_date: None,
            purchase_cost: Some(1200.0),
            notes: None,
        }
    }

    #[test]
    fn test_deployed_asset_requires_assignee() {
        let mut asset = laptop();
        asset.status = AssetStatus::Deployed;
        assert_eq!(asset.validate().unwrap_err().field, "assignedTo");

        asset.assigned_to = Some("user-1".to_string());
        assert!(asset.validate().is_ok());
    }

    #[test]
    fn test_replace_keeps_identity() {
        let mut asset = Asset::from_new(laptop());
        let id = asset.id.clone();
        let created = asset.created_at;

        let mut update = laptop();
        update.name = "ThinkPad T14 Gen 2".to_string();
        asset.replace_with(update);

        assert_eq!(asset.id, id);
        assert_eq!(asset.created_at, created);
        assert_eq!(asset.name, "ThinkPad T14 Gen 2");
    }

    #[test]
    fn test_license_seat_invariant() {
        let license = NewLicense {
            name: "Office".to_string(),
            license_key: None,
            seats: 5,
            assigned_seats: 6,
            company: None,
            expiration_date: None,
            purchase_cost: None,
            notes: None,
        };
        assert!(license.validate().is_err());
    }

    #[test]
    fn test_accessory_available_defaults_to_quantity() {
        let accessory = Accessory::from_new(NewAccessory {
            name: "USB-C Dock".to_string(),
            category: "dock".to_string(),
            manufacturer: None,
            quantity: 12,
            available_quantity: None,
            location: None,
            notes: None,
        });
        assert_eq!(accessory.available_quantity, 12);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("retired".parse::<AssetStatus>().unwrap(), AssetStatus::Retired);
        assert!("lost".parse::<AssetStatus>().is_err());
    }
}
