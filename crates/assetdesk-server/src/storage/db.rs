//! SQLite storage backend (durable)

use assetdesk_core::ports::{
    AccessoryStore, AssetStore, ConsumableStore, LicenseStore, Storage, UserStore,
};
use assetdesk_core::{
    Accessory, Asset, AssetStatus, BackendKind, Consumable, DeskError, License, NewAccessory,
    NewAsset, NewConsumable, NewLicense, NewUser, Permissions, Result, User, UserUpdate,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;

pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Wrap a migrated pool. Fails if the schema is not in place.
    pub async fn open(pool: SqlitePool) -> Result<Self> {
        sqlx::query("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .map_err(|e| DeskError::BackendInit(format!("users table unusable: {}", e)))?;

        Ok(Self { pool })
    }
}

fn map_db_error(err: sqlx::Error, what: &str) -> DeskError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return DeskError::Conflict(format!("{} already exists", what));
        }
    }
    DeskError::Database(err.to_string())
}

fn db_error(err: sqlx::Error) -> DeskError {
    DeskError::Database(err.to_string())
}

// User operations
#[async_trait]
impl UserStore for SqliteStorage {
    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, username, password_hash, first_name, last_name, email,
                   department, is_admin, permissions, created_at
            FROM users WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(|r| r.into()))
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, username, password_hash, first_name, last_name, email,
                   department, is_admin, permissions, created_at
            FROM users WHERE username = ?1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(|r| r.into()))
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as(
            r#"
            SELECT id, username, password_hash, first_name, last_name, email,
                   department, is_admin, permissions, created_at
            FROM users ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        let user = User::from_new(user);

        sqlx::query(
            r#"
            INSERT INTO users (id, username, password_hash, first_name, last_name,
                               email, department, is_admin, permissions, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.department)
        .bind(user.is_admin)
        .bind(serde_json::to_string(&user.permissions)?)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_db_error(e, &format!("username '{}'", user.username)))?;

        Ok(user)
    }

    async fn update_user(&self, id: &str, update: UserUpdate) -> Result<Option<User>> {
        let Some(mut user) = self.get_user(id).await? else {
            return Ok(None);
        };
        user.apply(update);

        sqlx::query(
            r#"
            UPDATE users SET password_hash = ?1, first_name = ?2, last_name = ?3,
                             email = ?4, department = ?5, is_admin = ?6, permissions = ?7
            WHERE id = ?8
            "#,
        )
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.department)
        .bind(user.is_admin)
        .bind(serde_json::to_string(&user.permissions)?)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(Some(user))
    }

    async fn delete_user(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(result.rows_affected() > 0)
    }
}

// Asset operations
#[async_trait]
impl AssetStore for SqliteStorage {
    async fn list_assets(&self) -> Result<Vec<Asset>> {
        let rows: Vec<AssetRow> = sqlx::query_as("SELECT * FROM assets ORDER BY created_at")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn get_asset(&self, id: &str) -> Result<Option<Asset>> {
        let row: Option<AssetRow> = sqlx::query_as("SELECT * FROM assets WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(row.map(|r| r.into()))
    }

    async fn create_asset(&self, asset: NewAsset) -> Result<Asset> {
        let asset = Asset::from_new(asset);

        sqlx::query(
            r#"
            INSERT INTO assets (id, asset_tag, name, category, status, serial_number, model,
                                manufacturer, location, assigned_to, purchase_date,
                                purchase_cost, notes, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
        )
        .bind(&asset.id)
        .bind(&asset.asset_tag)
        .bind(&asset.name)
        .bind(&asset.category)
        .bind(asset.status.to_string())
        .bind(&asset.serial_number)
        .bind(&asset.model)
        .bind(&asset.manufacturer)
        .bind(&asset.location)
        .bind(&asset.assigned_to)
        .bind(asset.purchase_date)
        .bind(asset.purchase_cost)
        .bind(&asset.notes)
        .bind(asset.created_at)
        .bind(asset.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_db_error(e, &format!("asset tag '{}'", asset.asset_tag)))?;

        Ok(asset)
    }

    async fn update_asset(&self, id: &str, asset: NewAsset) -> Result<Option<Asset>> {
        let Some(mut existing) = self.get_asset(id).await? else {
            return Ok(None);
        };
        existing.replace_with(asset);

        sqlx::query(
            r#"
            UPDATE assets SET asset_tag = ?1, name = ?2, category = ?3, status = ?4,
                              serial_number = ?5, model = ?6, manufacturer = ?7, location = ?8,
                              assigned_to = ?9, purchase_date = ?10, purchase_cost = ?11,
                              notes = ?12, updated_at = ?13
            WHERE id = ?14
            "#,
        )
        .bind(&existing.asset_tag)
        .bind(&existing.name)
        .bind(&existing.category)
        .bind(existing.status.to_string())
        .bind(&existing.serial_number)
        .bind(&existing.model)
        .bind(&existing.manufacturer)
        .bind(&existing.location)
        .bind(&existing.assigned_to)
        .bind(existing.purchase_date)
        .bind(existing.purchase_cost)
        .bind(&existing.notes)
        .bind(existing.updated_at)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_db_error(e, &format!("asset tag '{}'", existing.asset_tag)))?;

        Ok(Some(existing))
    }

    async fn delete_asset(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM assets WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(result.rows_affected() > 0)
    }
}

// License operations
#[async_trait]
impl LicenseStore for SqliteStorage {
    async fn list_licenses(&self) -> Result<Vec<License>> {
        let rows: Vec<LicenseRow> = sqlx::query_as("SELECT * FROM licenses ORDER BY created_at")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn get_license(&self, id: &str) -> Result<Option<License>> {
        let row: Option<LicenseRow> = sqlx::query_as("SELECT * FROM licenses WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(row.map(|r| r.into()))
    }

    async fn create_license(&self, license: NewLicense) -> Result<License> {
        let license = License::from_new(license);

        sqlx::query(
            r#"
            INSERT INTO licenses (id, name, license_key, seats, assigned_seats, company,
                                  expiration_date, purchase_cost, notes, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&license.id)
        .bind(&license.name)
        .bind(&license.license_key)
        .bind(license.seats)
        .bind(license.assigned_seats)
        .bind(&license.company)
        .bind(license.expiration_date)
        .bind(license.purchase_cost)
        .bind(&license.notes)
        .bind(license.created_at)
        .bind(license.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(license)
    }

    async fn update_license(&self, id: &str, license: NewLicense) -> Result<Option<License>> {
        let Some(mut existing) = self.get_license(id).await? else {
            return Ok(None);
        };
        existing.replace_with(license);

        sqlx::query(
            r#"
            UPDATE licenses SET name = ?1, license_key = ?2, seats = ?3, assigned_seats = ?4,
                                company = ?5, expiration_date = ?6, purchase_cost = ?7,
                                notes = ?8, updated_at = ?9
            WHERE id = ?10
            "#,
        )
        .bind(&existing.name)
        .bind(&existing.license_key)
        .bind(existing.seats)
        .bind(existing.assigned_seats)
        .bind(&existing.company)
        .bind(existing.expiration_date)
        .bind(existing.purchase_cost)
        .bind(&existing.notes)
        .bind(existing.updated_at)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(Some(existing))
    }

    async fn delete_license(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM licenses WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(result.rows_affected() > 0)
    }
}

// Accessory operations
#[async_trait]
impl AccessoryStore for SqliteStorage {
    async fn list_accessories(&self) -> Result<Vec<Accessory>> {
        let rows: Vec<AccessoryRow> =
            sqlx::query_as("SELECT * FROM accessories ORDER BY created_at")
                .fetch_all(&self.pool)
                .await
                .map_err(db_error)?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn get_accessory(&self, id: &str) -> Result<Option<Accessory>> {
        let row: Option<AccessoryRow> = sqlx::query_as("SELECT * FROM accessories WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(row.map(|r| r.into()))
    }

    async fn create_accessory(&self, accessory: NewAccessory) -> Result<Accessory> {
        let accessory = Accessory::from_new(accessory);

        sqlx::query(
            r#"
            INSERT INTO accessories (id, name, category, manufacturer, quantity,
                                     available_quantity, location, notes, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&accessory.id)
        .bind(&accessory.name)
        .bind(&accessory.category)
        .bind(&accessory.manufacturer)
        .bind(accessory.quantity)
        .bind(accessory.available_quantity)
        .bind(&accessory.location)
        .bind(&accessory.notes)
        .bind(accessory.created_at)
        .bind(accessory.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(accessory)
    }

    async fn update_accessory(
        &self,
        id: &str,
        accessory: NewAccessory,
    ) -> Result<Option<Accessory>> {
        let Some(mut existing) = self.get_accessory(id).await? else {
            return Ok(None);
        };
        existing.replace_with(accessory);

        sqlx::query(
            r#"
            UPDATE accessories SET name = ?1, category = ?2, manufacturer = ?3, quantity = ?4,
                                   available_quantity = ?5, location = ?6, notes = ?7,
                                   updated_at = ?8
            WHERE id = ?9
            "#,
        )
        .bind(&existing.name)
        .bind(&existing.category)
        .bind(&existing.manufacturer)
        .bind(existing.quantity)
        .bind(existing.available_quantity)
        .bind(&existing.location)
        .bind(&existing.notes)
        .bind(existing.updated_at)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(Some(existing))
    }

    async fn delete_accessory(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM accessories WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(result.rows_affected() > 0)
    }
}

// Consumable operations
#[async_trait]
impl ConsumableStore for SqliteStorage {
    async fn list_consumables(&self) -> Result<Vec<Consumable>> {
        let rows: Vec<ConsumableRow> =
            sqlx::query_as("SELECT * FROM consumables ORDER BY created_at")
                .fetch_all(&self.pool)
                .await
                .map_err(db_error)?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn get_consumable(&self, id: &str) -> Result<Option<Consumable>> {
        let row: Option<ConsumableRow> = sqlx::query_as("SELECT * FROM consumables WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(row.map(|r| r.into()))
    }

    async fn create_consumable(&self, consumable: NewConsumable) -> Result<Consumable> {
        let consumable = Consumable::from_new(consumable);

        sqlx::query(
            r#"
            INSERT INTO consumables (id, name, category, manufacturer, quantity, min_quantity,
                                     location, notes, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&consumable.id)
        .bind(&consumable.name)
        .bind(&consumable.category)
        .bind(&consumable.manufacturer)
        .bind(consumable.quantity)
        .bind(consumable.min_quantity)
        .bind(&consumable.location)
        .bind(&consumable.notes)
        .bind(consumable.created_at)
        .bind(consumable.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(consumable)
    }

    async fn update_consumable(
        &self,
        id: &str,
        consumable: NewConsumable,
    ) -> Result<Option<Consumable>> {
        let Some(mut existing) = self.get_consumable(id).await? else {
            return Ok(None);
        };
        existing.replace_with(consumable);

        sqlx::query(
            r#"
            UPDATE consumables SET name = ?1, category = ?2, manufacturer = ?3, quantity = ?4,
                                   min_quantity = ?5, location = ?6, notes = ?7, updated_at = ?8
            WHERE id = ?9
            "#,
        )
        .bind(&existing.name)
        .bind(&existing.category)
        .bind(&existing.manufacturer)
        .bind(existing.quantity)
        .bind(existing.min_quantity)
        .bind(&existing.location)
        .bind(&existing.notes)
        .bind(existing.updated_at)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(Some(existing))
    }

    async fn delete_consumable(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM consumables WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(result.rows_affected() > 0)
    }
}

impl Storage for SqliteStorage {
    fn kind(&self) -> BackendKind {
        BackendKind::Durable
    }
}

// Helper structs for sqlx query_as
#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    username: String,
    password_hash: String,
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    department: Option<String>,
    is_admin: bool,
    permissions: String,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        User {
            id: r.id,
            username: r.username,
            password_hash: r.password_hash,
            first_name: r.first_name,
            last_name: r.last_name,
            email: r.email,
            department: r.department,
            is_admin: r.is_admin,
            permissions: serde_json::from_str::<Permissions>(&r.permissions).unwrap_or_default(),
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AssetRow {
    id: String,
    asset_tag: String,
    name: String,
    category: String,
    status: String,
    serial_number: Option<String>,
    model: Option<String>,
    manufacturer: Option<String>,
    location: Option<String>,
    assigned_to: Option<String>,
    purchase_date: Option<NaiveDate>,
    purchase_cost: Option<f64>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AssetRow> for Asset {
    fn from(r: AssetRow) -> Self {
        Asset {
            id: r.id,
            asset_tag: r.asset_tag,
            name: r.name,
            category: r.category,
            status: r.status.parse::<AssetStatus>().unwrap_or_default(),
            serial_number: r.serial_number,
            model: r.model,
            manufacturer: r.manufacturer,
            location: r.location,
            assigned_to: r.assigned_to,
            purchase_date: r.purchase_date,
            purchase_cost: r.purchase_cost,
            notes: r.notes,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct LicenseRow {
    id: String,
    name: String,
    license_key: Option<String>,
    seats: i64,
    assigned_seats: i64,
    company: Option<String>,
    expiration_date: Option<NaiveDate>,
    purchase_cost: Option<f64>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<LicenseRow> for License {
    fn from(r: LicenseRow) -> Self {
        License {
            id: r.id,
            name: r.name,
            license_key: r.license_key,
            seats: r.seats,
            assigned_seats: r.assigned_seats,
            company: r.company,
            expiration_date: r.expiration_date,
            purchase_cost: r.purchase_cost,
            notes: r.notes,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AccessoryRow {
    id: String,
    name: String,
    category: String,
    manufacturer: Option<String>,
    quantity: i64,
    available_quantity: i64,
    location: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AccessoryRow> for Accessory {
    fn from(r: AccessoryRow) -> Self {
        Accessory {
            id: r.id,
            name: r.name,
            category: r.category,
            manufacturer: r.manufacturer,
            quantity: r.quantity,
            available_quantity: r.available_quantity,
            location: r.location,
            notes: r.notes,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ConsumableRow {
    id: String,
    name: String,
    category: String,
    manufacturer: Option<String>,
    quantity: i64,
    min_quantity: i64,
    location: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ConsumableRow> for Consumable {
    fn from(r: ConsumableRow) -> Self {
        Consumable {
            id: r.id,
            name: r.name,
            category: r.category,
            manufacturer: r.manufacturer,
            quantity: r.quantity,
            min_quantity: r.min_quantity,
            location: r.location,
            notes: r.notes,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Single-connection in-memory pool for tests
#[cfg(test)]
pub(crate) async fn memory_pool() -> SqlitePool {
    use sqlx::sqlite::SqlitePoolOptions;

    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap()
}
