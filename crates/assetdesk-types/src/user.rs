//! User and permission types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel username of the built-in administrator account
pub const ADMIN_USERNAME: &str = "admin";

/// Resource categories covered by the permission matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionCategory {
    Assets,
    Components,
    Accessories,
    Consumables,
    Licenses,
    Users,
    Reports,
    VmMonitoring,
    NetworkDiscovery,
    BitlockerKeys,
    Admin,
}

impl PermissionCategory {
    pub const ALL: [PermissionCategory; 11] = [
        PermissionCategory::Assets,
        PermissionCategory::Components,
        PermissionCategory::Accessories,
        PermissionCategory::Consumables,
        PermissionCategory::Licenses,
        PermissionCategory::Users,
        PermissionCategory::Reports,
        PermissionCategory::VmMonitoring,
        PermissionCategory::NetworkDiscovery,
        PermissionCategory::BitlockerKeys,
        PermissionCategory::Admin,
    ];
}

impl std::fmt::Display for PermissionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PermissionCategory::Assets => "assets",
            PermissionCategory::Components => "components",
            PermissionCategory::Accessories => "accessories",
            PermissionCategory::Consumables => "consumables",
            PermissionCategory::Licenses => "licenses",
            PermissionCategory::Users => "users",
            PermissionCategory::Reports => "reports",
            PermissionCategory::VmMonitoring => "vmMonitoring",
            PermissionCategory::NetworkDiscovery => "networkDiscovery",
            PermissionCategory::BitlockerKeys => "bitlockerKeys",
            PermissionCategory::Admin => "admin",
        };
        write!(f, "{}", name)
    }
}

/// Verb checked against a category's access triple
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionAction {
    View,
    Edit,
    Add,
}

/// View/edit/add flags for one category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Access {
    #[serde(default)]
    pub view: bool,
    #[serde(default)]
    pub edit: bool,
    #[serde(default)]
    pub add: bool,
}

impl Access {
    pub const FULL: Access = Access {
        view: true,
        edit: true,
        add: true,
    };

    pub const VIEW_ONLY: Access = Access {
        view: true,
        edit: false,
        add: false,
    };

    pub fn allows(&self, action: PermissionAction) -> bool {
        match action {
            PermissionAction::View => self.view,
            PermissionAction::Edit => self.edit,
            PermissionAction::Add => self.add,
        }
    }

    /// Every flag set in `other` is also set here
    pub fn covers(&self, other: &Access) -> bool {
        (self.view || !other.view) && (self.edit || !other.edit) && (self.add || !other.add)
    }
}

/// Permission matrix, one access triple per category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Permissions {
    pub assets: Access,
    pub components: Access,
    pub accessories: Access,
    pub consumables: Access,
    pub licenses: Access,
    pub users: Access,
    pub reports: Access,
    pub vm_monitoring: Access,
    pub network_discovery: Access,
    pub bitlocker_keys: Access,
    pub admin: Access,
}

impl Permissions {
    /// Every category fully granted (administrator matrix)
    pub fn full() -> Self {
        let mut permissions = Self::default();
        for category in PermissionCategory::ALL {
            *permissions.get_mut(category) = Access::FULL;
        }
        permissions
    }

    /// Read-only access to inventory and reports
    pub fn default_user() -> Self {
        Self {
            assets: Access::VIEW_ONLY,
            components: Access::VIEW_ONLY,
            accessories: Access::VIEW_ONLY,
            consumables: Access::VIEW_ONLY,
            licenses: Access::VIEW_ONLY,
            reports: Access::VIEW_ONLY,
            ..Self::default()
        }
    }

    /// No category grants more than `limit` does
    pub fn within(&self, limit: &Permissions) -> bool {
        PermissionCategory::ALL
            .iter()
            .all(|&category| limit.get(category).covers(&self.get(category)))
    }

    pub fn get(&self, category: PermissionCategory) -> Access {
        match category {
            PermissionCategory::Assets => self.assets,
            PermissionCategory::Components => self.components,
            PermissionCategory::Accessories => self.accessories,
            PermissionCategory::Consumables => self.consumables,
            PermissionCategory::Licenses => self.licenses,
            PermissionCategory::Users => self.users,
            PermissionCategory::Reports => self.reports,
            PermissionCategory::VmMonitoring => self.vm_monitoring,
            PermissionCategory::NetworkDiscovery => self.network_discovery,
            PermissionCategory::BitlockerKeys => self.bitlocker_keys,
            PermissionCategory::Admin => self.admin,
        }
    }

    pub fn get_mut(&mut self, category: PermissionCategory) -> &mut Access {
        match category {
            PermissionCategory::Assets => &mut self.assets,
            PermissionCategory::Components => &mut self.components,
            PermissionCategory::Accessories => &mut self.accessories,
            PermissionCategory::Consumables => &mut self.consumables,
            PermissionCategory::Licenses => &mut self.licenses,
            PermissionCategory::Users => &mut self.users,
            PermissionCategory::Reports => &mut self.reports,
            PermissionCategory::VmMonitoring => &mut self.vm_monitoring,
            PermissionCategory::NetworkDiscovery => &mut self.network_discovery,
            PermissionCategory::BitlockerKeys => &mut self.bitlocker_keys,
            PermissionCategory::Admin => &mut self.admin,
        }
    }
}

/// User account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    /// argon2 PHC string, never sent to clients
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
    pub is_admin: bool,
    pub permissions: Permissions,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Build a stored user from creation fields
    pub fn from_new(new: NewUser) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            username: new.username,
            password_hash: new.password_hash,
            first_name: new.first_name,
            last_name: new.last_name,
            email: new.email,
            department: new.department,
            is_admin: new.is_admin,
            permissions: new.permissions,
            created_at: Utc::now(),
        }
    }

    /// Whether the user may perform `action` on `category`
    pub fn can(&self, category: PermissionCategory, action: PermissionAction) -> bool {
        self.is_admin || self.permissions.get(category).allows(action)
    }

    pub fn apply(&mut self, update: UserUpdate) {
        if let Some(first_name) = update.first_name {
            self.first_name = Some(first_name);
        }
        if let Some(last_name) = update.last_name {
            self.last_name = Some(last_name);
        }
        if let Some(email) = update.email {
            self.email = Some(email);
        }
        if let Some(department) = update.department {
            self.department = Some(department);
        }
        if let Some(is_admin) = update.is_admin {
            self.is_admin = is_admin;
        }
        if let Some(permissions) = update.permissions {
            self.permissions = permissions;
        }
        if let Some(password_hash) = update.password_hash {
            self.password_hash = password_hash;
        }
    }
}

/// Fields for creating a user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
    pub is_admin: bool,
    pub permissions: Permissions,
}

/// Partial user update; `None` leaves the field unchanged
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
    pub is_admin: Option<bool>,
    pub permissions: Option<Permissions>,
    pub password_hash: Option<String>,
}

/// Authentication tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub expires_in: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_matrix_grants_everything() {
        let permissions = Permissions::full();
        for category in PermissionCategory::ALL {
            let access = permissions.get(category);
            assert!(access.view && access.edit && access.add, "{}", category);
        }
    }

    #[test]
    fn test_matrix_wire_names() {
        let json = serde_json::to_value(Permissions::full()).unwrap();
        for key in [
            "vmMonitoring",
            "networkDiscovery",
            "bitlockerKeys",
            "admin",
            "assets",
        ] {
            assert_eq!(json[key]["edit"], true, "missing {}", key);
        }
    }

    #[test]
    fn test_default_user_is_read_only() {
        let user = User::from_new(NewUser {
            username: "jdoe".to_string(),
            password_hash: "x".to_string(),
            first_name: None,
            last_name: None,
            email: None,
            department: None,
            is_admin: false,
            permissions: Permissions::default_user(),
        });

        assert!(user.can(PermissionCategory::Assets, PermissionAction::View));
        assert!(!user.can(PermissionCategory::Assets, PermissionAction::Add));
        assert!(!user.can(PermissionCategory::Users, PermissionAction::View));
    }

    #[test]
    fn test_within_compares_every_category() {
        let mut helpdesk = Permissions::default_user();
        helpdesk.users = Access::FULL;

        assert!(Permissions::default_user().within(&helpdesk));
        assert!(helpdesk.within(&helpdesk));
        assert!(!Permissions::full().within(&helpdesk));

        let mut escalated = helpdesk.clone();
        escalated.admin.view = true;
        assert!(!escalated.within(&helpdesk));
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let mut user = User::from_new(NewUser {
            username: "admin".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            first_name: None,
            last_name: None,
            email: None,
            department: None,
            is_admin: true,
            permissions: Permissions::full(),
        });
        user.apply(UserUpdate {
            department: Some("IT".to_string()),
            ..Default::default()
        });

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("\"isAdmin\":true"));
        assert_eq!(user.department.as_deref(), Some("IT"));
    }
}
