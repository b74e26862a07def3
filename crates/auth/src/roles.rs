use serde::{Deserialize, Serialize};

use crm_core::RoleId;

/// Role assigned to newly registered users.
pub const DEFAULT_ROLE_ID: RoleId = RoleId::new(1);

/// Role a user holds; menus are granted per role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub role_id: RoleId,
    pub role_name: String,
}

impl Role {
    pub fn new(role_id: RoleId, role_name: impl Into<String>) -> Self {
        Self {
            role_id,
            role_name: role_name.into(),
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.role_name)
    }
}
