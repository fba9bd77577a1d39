use kanban_core::{AuditInfo, KanbanResult};
use serde::{Deserialize, Serialize};

use crate::field_update::FieldUpdate;
use crate::identity::UserId;
use crate::validation::{optional_text, required_text, MAX_NAME_LENGTH};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub display_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(flatten)]
    pub audit: AuditInfo,
}

fn default_active() -> bool {
    true
}

audited_record!(User, UserId);

/// Self-service profile fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: FieldUpdate<String>,
}

/// Fields only a system administrator may change.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserAdminUpdate {
    #[serde(default)]
    pub is_admin: Option<bool>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl User {
    pub fn new(id: UserId, display_name: String) -> Self {
        Self {
            id,
            display_name,
            email: None,
            is_admin: false,
            is_active: true,
            audit: AuditInfo::default(),
        }
    }

    pub fn apply_profile(&mut self, updates: ProfileUpdate) -> KanbanResult<()> {
        if let Some(name) = updates.display_name {
            self.display_name = required_text("display name", &name, MAX_NAME_LENGTH)?;
        }
        match updates.email {
            FieldUpdate::Set(email) => {
                self.email = optional_text("email", Some(email), MAX_NAME_LENGTH)?;
            }
            other => other.apply_to(&mut self.email),
        }
        Ok(())
    }

    pub fn apply_admin(&mut self, updates: &UserAdminUpdate) {
        if let Some(is_admin) = updates.is_admin {
            self.is_admin = is_admin;
        }
        if let Some(is_active) = updates.is_active {
            self.is_active = is_active;
        }
    }
}
